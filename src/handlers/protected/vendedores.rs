// /api/vendedores - seller management

use serde::Deserialize;
use serde_json::Value;
use sqlx::Row;
use uuid::Uuid;

use crate::api::extract::{Json, Path, Query};
use crate::api::pagination::{Page, Pagination};
use crate::api::validate::{check_email, require_str, require_uuid};
use crate::database;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct VendedorQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub filial_id: Option<Uuid>,
}

/// POST /api/vendedores - create a seller attached to a branch.
///
/// Two dependent writes (seller insert + branch headcount bump) run in one
/// transaction: a failure on either leaves neither.
pub async fn create(Json(body): Json<Value>) -> ApiResult<Value> {
    let nome = require_str(&body, "nome")?;
    let email = require_str(&body, "email")?;
    check_email("email", &email)?;
    let cpf = require_str(&body, "cpf")?;
    let filial_id = require_uuid(&body, "filial_id")?;

    let pool = database::pool().await?;

    let (filial_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM filiais WHERE id = $1 AND ativo = TRUE")
            .bind(filial_id)
            .fetch_one(pool)
            .await?;
    if filial_count == 0 {
        return Err(ApiError::not_found(format!(
            "filial {} not found",
            filial_id
        )));
    }

    let (cpf_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vendedores WHERE cpf = $1")
        .bind(&cpf)
        .fetch_one(pool)
        .await?;
    if cpf_count > 0 {
        return Err(ApiError::conflict(format!("cpf {} is already registered", cpf)));
    }

    let mut tx = pool.begin().await?;

    let row = sqlx::query(
        "WITH t AS ( \
            INSERT INTO vendedores (nome, email, cpf, filial_id) \
            VALUES ($1, $2, $3, $4) \
            RETURNING id, nome, email, cpf, filial_id, ativo, criado_em \
         ) SELECT row_to_json(t) AS row FROM t",
    )
    .bind(&nome)
    .bind(&email)
    .bind(&cpf)
    .bind(filial_id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE filiais SET qtd_vendedores = qtd_vendedores + 1 WHERE id = $1")
        .bind(filial_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let vendedor: Value = row.try_get("row")?;
    Ok(ApiResponse::created("vendedor created", vendedor))
}

/// GET /api/vendedores - paginated listing, optionally filtered by branch
pub async fn list(Query(query): Query<VendedorQuery>) -> ApiResult<Page> {
    let pagination = Pagination::from_query(&crate::api::pagination::PageQuery {
        page: query.page,
        per_page: query.per_page,
    });
    let pool = database::pool().await?;

    let (total_rows,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM vendedores WHERE ($1::uuid IS NULL OR filial_id = $1)",
    )
    .bind(query.filial_id)
    .fetch_one(pool)
    .await?;

    let rows = sqlx::query(
        "SELECT row_to_json(t) AS row FROM ( \
            SELECT v.id, v.nome, v.email, v.cpf, v.filial_id, f.nome AS filial_nome, \
                   v.ativo, v.criado_em \
            FROM vendedores v JOIN filiais f ON f.id = v.filial_id \
            WHERE ($1::uuid IS NULL OR v.filial_id = $1) \
            ORDER BY v.nome LIMIT $2 OFFSET $3 \
         ) t",
    )
    .bind(query.filial_id)
    .bind(pagination.per_page)
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    let vendedores = rows
        .into_iter()
        .map(|r| r.try_get("row"))
        .collect::<Result<Vec<Value>, _>>()?;

    Ok(ApiResponse::ok(
        "vendedores listed",
        Page::new(vendedores, pagination, total_rows),
    ))
}

/// GET /api/vendedores/:id
pub async fn get(Path(id): Path<Uuid>) -> ApiResult<Value> {
    let pool = database::pool().await?;

    let row = sqlx::query(
        "SELECT row_to_json(t) AS row FROM ( \
            SELECT v.id, v.nome, v.email, v.cpf, v.filial_id, f.nome AS filial_nome, \
                   v.ativo, v.criado_em \
            FROM vendedores v JOIN filiais f ON f.id = v.filial_id \
            WHERE v.id = $1 \
         ) t",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found(format!("vendedor {} not found", id)))?;

    let vendedor: Value = row.try_get("row")?;
    Ok(ApiResponse::ok("vendedor found", vendedor))
}

/// PUT /api/vendedores/:id/finalizar - idempotent deactivate
pub async fn finalize(Path(id): Path<Uuid>) -> ApiResult<Value> {
    let pool = database::pool().await?;

    let row = sqlx::query(
        "WITH t AS ( \
            UPDATE vendedores SET ativo = FALSE WHERE id = $1 \
            RETURNING id, nome, cpf, ativo \
         ) SELECT row_to_json(t) AS row FROM t",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found(format!("vendedor {} not found", id)))?;

    let vendedor: Value = row.try_get("row")?;
    Ok(ApiResponse::ok("vendedor finalized", vendedor))
}
