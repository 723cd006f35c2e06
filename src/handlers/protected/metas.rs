// /api/metas - monthly sales goals with per-product items.
//
// Goal creation is the canonical multi-statement write: one header row plus
// N item rows. All of it runs inside a single transaction so a failure on
// any item leaves no goal and no items behind.

use axum::Extension;
use serde_json::{json, Value};
use sqlx::Row;
use uuid::Uuid;

use crate::api::extract::{Json, Path};
use crate::api::validate::{check_month, check_range, require_array, require_f64, require_i64, require_str, require_uuid};
use crate::database;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};

/// POST /api/metas
pub async fn create(
    Extension(user): Extension<AuthUser>,
    Json(body): Json<Value>,
) -> ApiResult<Value> {
    let vendedor_id = require_uuid(&body, "vendedor_id")?;
    let mes = require_str(&body, "mes")?;
    check_month("mes", &mes)?;
    let valor_total = require_f64(&body, "valor_total")?;
    if valor_total <= 0.0 {
        return Err(ApiError::validation_error(
            "valor_total",
            "valor_total must be greater than zero",
        ));
    }

    let itens = require_array(&body, "itens")?;
    if itens.is_empty() {
        return Err(ApiError::validation_error("itens", "itens must not be empty"));
    }

    // Validate every item before touching the database
    let mut parsed_itens = Vec::with_capacity(itens.len());
    for item in itens {
        let produto_id = require_uuid(item, "produto_id")?;
        let quantidade = require_i64(item, "quantidade")?;
        check_range("quantidade", quantidade, 1, i32::MAX as i64)?;
        parsed_itens.push((produto_id, quantidade as i32));
    }

    let pool = database::pool().await?;

    let (vendedor_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM vendedores WHERE id = $1 AND ativo = TRUE")
            .bind(vendedor_id)
            .fetch_one(pool)
            .await?;
    if vendedor_count == 0 {
        return Err(ApiError::not_found(format!(
            "vendedor {} not found",
            vendedor_id
        )));
    }

    for (produto_id, _) in &parsed_itens {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM produtos WHERE id = $1 AND ativo = TRUE")
                .bind(produto_id)
                .fetch_one(pool)
                .await?;
        if count == 0 {
            return Err(ApiError::not_found(format!(
                "produto {} not found",
                produto_id
            )));
        }
    }

    // Header + items commit or roll back as a unit
    let mut tx = pool.begin().await?;

    let meta_row = sqlx::query(
        "INSERT INTO metas (vendedor_id, mes, valor_total, criado_por) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(vendedor_id)
    .bind(&mes)
    .bind(valor_total)
    .bind(user.user_id)
    .fetch_one(&mut *tx)
    .await?;
    let meta_id: Uuid = meta_row.try_get("id")?;

    for (produto_id, quantidade) in &parsed_itens {
        sqlx::query(
            "INSERT INTO meta_itens (meta_id, produto_id, quantidade) VALUES ($1, $2, $3)",
        )
        .bind(meta_id)
        .bind(produto_id)
        .bind(quantidade)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(ApiResponse::created(
        "meta created",
        json!({
            "id": meta_id,
            "vendedor_id": vendedor_id,
            "mes": mes,
            "valor_total": valor_total,
            "itens": parsed_itens.len(),
        }),
    ))
}

/// GET /api/metas/:id - goal header with its items
pub async fn get(Path(id): Path<Uuid>) -> ApiResult<Value> {
    let pool = database::pool().await?;

    let row = sqlx::query(
        "SELECT row_to_json(t) AS row FROM ( \
            SELECT m.id, m.vendedor_id, v.nome AS vendedor_nome, m.mes, \
                   m.valor_total, m.ativo, m.criado_em \
            FROM metas m JOIN vendedores v ON v.id = m.vendedor_id \
            WHERE m.id = $1 \
         ) t",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found(format!("meta {} not found", id)))?;

    let mut meta: Value = row.try_get("row")?;

    let item_rows = sqlx::query(
        "SELECT row_to_json(t) AS row FROM ( \
            SELECT i.id, i.produto_id, p.codigo AS produto_codigo, \
                   p.descricao, i.quantidade \
            FROM meta_itens i JOIN produtos p ON p.id = i.produto_id \
            WHERE i.meta_id = $1 ORDER BY p.codigo \
         ) t",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let itens = item_rows
        .into_iter()
        .map(|r| r.try_get("row"))
        .collect::<Result<Vec<Value>, sqlx::Error>>()?;

    meta["itens"] = Value::Array(itens);
    Ok(ApiResponse::ok("meta found", meta))
}

/// PUT /api/metas/:id/finalizar - idempotent deactivate
pub async fn finalize(Path(id): Path<Uuid>) -> ApiResult<Value> {
    let pool = database::pool().await?;

    let row = sqlx::query(
        "WITH t AS ( \
            UPDATE metas SET ativo = FALSE WHERE id = $1 \
            RETURNING id, vendedor_id, mes, ativo \
         ) SELECT row_to_json(t) AS row FROM t",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found(format!("meta {} not found", id)))?;

    let meta: Value = row.try_get("row")?;
    Ok(ApiResponse::ok("meta finalized", meta))
}
