// /api/filiais - branch management

use serde_json::Value;
use sqlx::Row;
use uuid::Uuid;

use crate::api::extract::{Json, Path, Query};
use crate::api::pagination::{Page, PageQuery, Pagination};
use crate::api::validate::{optional_str, require_str};
use crate::database;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};

/// POST /api/filiais - create a branch. `codigo` is unique across branches.
pub async fn create(Json(body): Json<Value>) -> ApiResult<Value> {
    let codigo = require_str(&body, "codigo")?;
    let nome = require_str(&body, "nome")?;
    let cidade = optional_str(&body, "cidade")?;
    let uf = optional_str(&body, "uf")?;

    if let Some(uf) = &uf {
        if uf.len() != 2 {
            return Err(ApiError::validation_error("uf", "uf must be a 2-letter state code"));
        }
    }

    let pool = database::pool().await?;

    // Friendly pre-check; the unique index on codigo is the real guarantee
    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM filiais WHERE codigo = $1")
        .bind(&codigo)
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Err(ApiError::conflict(format!(
            "codigo {} is already in use",
            codigo
        )));
    }

    let row = sqlx::query(
        "WITH t AS ( \
            INSERT INTO filiais (codigo, nome, cidade, uf) \
            VALUES ($1, $2, $3, $4) \
            RETURNING id, codigo, nome, cidade, uf, qtd_vendedores, ativo, criado_em \
         ) SELECT row_to_json(t) AS row FROM t",
    )
    .bind(&codigo)
    .bind(&nome)
    .bind(&cidade)
    .bind(&uf)
    .fetch_one(pool)
    .await?;

    let filial: Value = row.try_get("row")?;
    Ok(ApiResponse::created("filial created", filial))
}

/// GET /api/filiais - paginated listing
pub async fn list(Query(query): Query<PageQuery>) -> ApiResult<Page> {
    let pagination = Pagination::from_query(&query);
    let pool = database::pool().await?;

    let (total_rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM filiais")
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query(
        "SELECT row_to_json(t) AS row FROM ( \
            SELECT id, codigo, nome, cidade, uf, qtd_vendedores, ativo, criado_em \
            FROM filiais ORDER BY codigo LIMIT $1 OFFSET $2 \
         ) t",
    )
    .bind(pagination.per_page)
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    let filiais = rows
        .into_iter()
        .map(|r| r.try_get("row"))
        .collect::<Result<Vec<Value>, _>>()?;

    Ok(ApiResponse::ok(
        "filiais listed",
        Page::new(filiais, pagination, total_rows),
    ))
}

/// GET /api/filiais/:id
pub async fn get(Path(id): Path<Uuid>) -> ApiResult<Value> {
    let pool = database::pool().await?;

    let row = sqlx::query(
        "SELECT row_to_json(t) AS row FROM ( \
            SELECT id, codigo, nome, cidade, uf, qtd_vendedores, ativo, criado_em \
            FROM filiais WHERE id = $1 \
         ) t",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found(format!("filial {} not found", id)))?;

    let filial: Value = row.try_get("row")?;
    Ok(ApiResponse::ok("filial found", filial))
}

/// PUT /api/filiais/:id - update name/city/state. `codigo` is immutable.
pub async fn update(Path(id): Path<Uuid>, Json(body): Json<Value>) -> ApiResult<Value> {
    let nome = require_str(&body, "nome")?;
    let cidade = optional_str(&body, "cidade")?;
    let uf = optional_str(&body, "uf")?;

    let pool = database::pool().await?;

    let row = sqlx::query(
        "WITH t AS ( \
            UPDATE filiais SET nome = $2, cidade = $3, uf = $4 WHERE id = $1 \
            RETURNING id, codigo, nome, cidade, uf, qtd_vendedores, ativo, criado_em \
         ) SELECT row_to_json(t) AS row FROM t",
    )
    .bind(id)
    .bind(&nome)
    .bind(&cidade)
    .bind(&uf)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found(format!("filial {} not found", id)))?;

    let filial: Value = row.try_get("row")?;
    Ok(ApiResponse::ok("filial updated", filial))
}

/// PUT /api/filiais/:id/finalizar - deactivate. Idempotent: finalizing an
/// already-inactive branch succeeds with the same resulting state.
pub async fn finalize(Path(id): Path<Uuid>) -> ApiResult<Value> {
    let pool = database::pool().await?;

    let row = sqlx::query(
        "WITH t AS ( \
            UPDATE filiais SET ativo = FALSE WHERE id = $1 \
            RETURNING id, codigo, nome, ativo \
         ) SELECT row_to_json(t) AS row FROM t",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found(format!("filial {} not found", id)))?;

    let filial: Value = row.try_get("row")?;
    Ok(ApiResponse::ok("filial finalized", filial))
}
