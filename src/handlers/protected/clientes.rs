// /api/clientes - client registry

use serde_json::Value;
use sqlx::Row;
use uuid::Uuid;

use crate::api::extract::{Json, Path, Query};
use crate::api::pagination::{Page, PageQuery, Pagination};
use crate::api::validate::{check_email, optional_str, require_str};
use crate::database;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};

/// POST /api/clientes - create a client. `cnpj` (tax id) is unique.
pub async fn create(Json(body): Json<Value>) -> ApiResult<Value> {
    let nome = require_str(&body, "nome")?;
    let cnpj = require_str(&body, "cnpj")?;
    let email = optional_str(&body, "email")?;
    let telefone = optional_str(&body, "telefone")?;

    if let Some(email) = &email {
        check_email("email", email)?;
    }

    let pool = database::pool().await?;

    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM clientes WHERE cnpj = $1")
        .bind(&cnpj)
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Err(ApiError::conflict(format!(
            "cnpj {} is already registered",
            cnpj
        )));
    }

    let row = sqlx::query(
        "WITH t AS ( \
            INSERT INTO clientes (nome, cnpj, email, telefone) \
            VALUES ($1, $2, $3, $4) \
            RETURNING id, nome, cnpj, email, telefone, criado_em \
         ) SELECT row_to_json(t) AS row FROM t",
    )
    .bind(&nome)
    .bind(&cnpj)
    .bind(&email)
    .bind(&telefone)
    .fetch_one(pool)
    .await?;

    let cliente: Value = row.try_get("row")?;
    Ok(ApiResponse::created("cliente created", cliente))
}

/// GET /api/clientes - paginated listing
pub async fn list(Query(query): Query<PageQuery>) -> ApiResult<Page> {
    let pagination = Pagination::from_query(&query);
    let pool = database::pool().await?;

    let (total_rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM clientes")
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query(
        "SELECT row_to_json(t) AS row FROM ( \
            SELECT id, nome, cnpj, email, telefone, criado_em \
            FROM clientes ORDER BY nome LIMIT $1 OFFSET $2 \
         ) t",
    )
    .bind(pagination.per_page)
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    let clientes = rows
        .into_iter()
        .map(|r| r.try_get("row"))
        .collect::<Result<Vec<Value>, _>>()?;

    Ok(ApiResponse::ok(
        "clientes listed",
        Page::new(clientes, pagination, total_rows),
    ))
}

/// GET /api/clientes/:id
pub async fn get(Path(id): Path<Uuid>) -> ApiResult<Value> {
    let pool = database::pool().await?;

    let row = sqlx::query(
        "SELECT row_to_json(t) AS row FROM ( \
            SELECT id, nome, cnpj, email, telefone, criado_em \
            FROM clientes WHERE id = $1 \
         ) t",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found(format!("cliente {} not found", id)))?;

    let cliente: Value = row.try_get("row")?;
    Ok(ApiResponse::ok("cliente found", cliente))
}
