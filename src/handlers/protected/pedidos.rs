// /api/pedidos - sales orders with line items.
//
// Like goal creation, an order is a header plus N items written in one
// transaction. The total is computed server-side from the items.

use axum::Extension;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::Row;
use uuid::Uuid;

use crate::api::extract::{Json, Query};
use crate::api::pagination::{Page, Pagination};
use crate::api::validate::{check_range, require_array, require_f64, require_i64, require_uuid};
use crate::database;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct PedidoQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub vendedor_id: Option<Uuid>,
}

struct ItemPedido {
    produto_id: Uuid,
    quantidade: i32,
    preco_unitario: f64,
}

/// POST /api/pedidos
pub async fn create(
    Extension(user): Extension<AuthUser>,
    Json(body): Json<Value>,
) -> ApiResult<Value> {
    let cliente_id = require_uuid(&body, "cliente_id")?;
    let vendedor_id = require_uuid(&body, "vendedor_id")?;

    let itens = require_array(&body, "itens")?;
    if itens.is_empty() {
        return Err(ApiError::validation_error("itens", "itens must not be empty"));
    }

    let mut parsed_itens = Vec::with_capacity(itens.len());
    for item in itens {
        let produto_id = require_uuid(item, "produto_id")?;
        let quantidade = require_i64(item, "quantidade")?;
        check_range("quantidade", quantidade, 1, i32::MAX as i64)?;
        let preco_unitario = require_f64(item, "preco_unitario")?;
        if preco_unitario <= 0.0 {
            return Err(ApiError::validation_error(
                "preco_unitario",
                "preco_unitario must be greater than zero",
            ));
        }
        parsed_itens.push(ItemPedido {
            produto_id,
            quantidade: quantidade as i32,
            preco_unitario,
        });
    }

    let pool = database::pool().await?;

    let (cliente_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM clientes WHERE id = $1")
        .bind(cliente_id)
        .fetch_one(pool)
        .await?;
    if cliente_count == 0 {
        return Err(ApiError::not_found(format!(
            "cliente {} not found",
            cliente_id
        )));
    }

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

    for item in &parsed_itens {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM produtos WHERE id = $1 AND ativo = TRUE")
                .bind(item.produto_id)
                .fetch_one(pool)
                .await?;
        if count == 0 {
            return Err(ApiError::not_found(format!(
                "produto {} not found",
                item.produto_id
            )));
        }
    }

    let valor_total: f64 = parsed_itens
        .iter()
        .map(|i| i.preco_unitario * i.quantidade as f64)
        .sum();

    let mut tx = pool.begin().await?;

    let pedido_row = sqlx::query(
        "INSERT INTO pedidos (cliente_id, vendedor_id, valor_total, criado_por) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(cliente_id)
    .bind(vendedor_id)
    .bind(valor_total)
    .bind(user.user_id)
    .fetch_one(&mut *tx)
    .await?;
    let pedido_id: Uuid = pedido_row.try_get("id")?;

    for item in &parsed_itens {
        sqlx::query(
            "INSERT INTO pedido_itens (pedido_id, produto_id, quantidade, preco_unitario) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(pedido_id)
        .bind(item.produto_id)
        .bind(item.quantidade)
        .bind(item.preco_unitario)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(ApiResponse::created(
        "pedido created",
        json!({
            "id": pedido_id,
            "cliente_id": cliente_id,
            "vendedor_id": vendedor_id,
            "valor_total": valor_total,
            "itens": parsed_itens.len(),
        }),
    ))
}

/// GET /api/pedidos - paginated listing, optionally filtered by seller
pub async fn list(Query(query): Query<PedidoQuery>) -> ApiResult<Page> {
    let pagination = Pagination::from_query(&crate::api::pagination::PageQuery {
        page: query.page,
        per_page: query.per_page,
    });
    let pool = database::pool().await?;

    let (total_rows,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM pedidos WHERE ($1::uuid IS NULL OR vendedor_id = $1)",
    )
    .bind(query.vendedor_id)
    .fetch_one(pool)
    .await?;

    let rows = sqlx::query(
        "SELECT row_to_json(t) AS row FROM ( \
            SELECT p.id, p.cliente_id, c.nome AS cliente_nome, \
                   p.vendedor_id, v.nome AS vendedor_nome, \
                   p.valor_total, p.criado_em \
            FROM pedidos p \
            JOIN clientes c ON c.id = p.cliente_id \
            JOIN vendedores v ON v.id = p.vendedor_id \
            WHERE ($1::uuid IS NULL OR p.vendedor_id = $1) \
            ORDER BY p.criado_em DESC LIMIT $2 OFFSET $3 \
         ) t",
    )
    .bind(query.vendedor_id)
    .bind(pagination.per_page)
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    let pedidos = rows
        .into_iter()
        .map(|r| r.try_get("row"))
        .collect::<Result<Vec<Value>, _>>()?;

    Ok(ApiResponse::ok(
        "pedidos listed",
        Page::new(pedidos, pagination, total_rows),
    ))
}
