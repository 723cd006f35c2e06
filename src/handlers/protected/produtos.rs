// /api/produtos - product catalog

use serde_json::Value;
use sqlx::Row;

use crate::api::extract::{Json, Query};
use crate::api::pagination::{Page, PageQuery, Pagination};
use crate::api::validate::{require_f64, require_str};
use crate::database;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};

/// POST /api/produtos - create a product. `codigo` is unique.
pub async fn create(Json(body): Json<Value>) -> ApiResult<Value> {
    let codigo = require_str(&body, "codigo")?;
    let descricao = require_str(&body, "descricao")?;
    let preco = require_f64(&body, "preco")?;

    if preco <= 0.0 {
        return Err(ApiError::validation_error("preco", "preco must be greater than zero"));
    }

    let pool = database::pool().await?;

    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM produtos WHERE codigo = $1")
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
            INSERT INTO produtos (codigo, descricao, preco) \
            VALUES ($1, $2, $3) \
            RETURNING id, codigo, descricao, preco, ativo, criado_em \
         ) SELECT row_to_json(t) AS row FROM t",
    )
    .bind(&codigo)
    .bind(&descricao)
    .bind(preco)
    .fetch_one(pool)
    .await?;

    let produto: Value = row.try_get("row")?;
    Ok(ApiResponse::created("produto created", produto))
}

/// GET /api/produtos - paginated listing of active products
pub async fn list(Query(query): Query<PageQuery>) -> ApiResult<Page> {
    let pagination = Pagination::from_query(&query);
    let pool = database::pool().await?;

    let (total_rows,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM produtos WHERE ativo = TRUE")
            .fetch_one(pool)
            .await?;

    let rows = sqlx::query(
        "SELECT row_to_json(t) AS row FROM ( \
            SELECT id, codigo, descricao, preco, ativo, criado_em \
            FROM produtos WHERE ativo = TRUE ORDER BY codigo LIMIT $1 OFFSET $2 \
         ) t",
    )
    .bind(pagination.per_page)
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    let produtos = rows
        .into_iter()
        .map(|r| r.try_get("row"))
        .collect::<Result<Vec<Value>, _>>()?;

    Ok(ApiResponse::ok(
        "produtos listed",
        Page::new(produtos, pagination, total_rows),
    ))
}
