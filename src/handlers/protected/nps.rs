// /api/nps - NPS survey responses collected from clients

use serde_json::{json, Value};
use sqlx::Row;

use crate::api::extract::Json;
use crate::api::validate::{check_range, optional_str, require_i64, require_uuid};
use crate::database;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};

/// POST /api/nps - record a survey response. Repeat responses from the same
/// client are allowed; reporting uses the most recent one.
pub async fn create(Json(body): Json<Value>) -> ApiResult<Value> {
    let cliente_id = require_uuid(&body, "cliente_id")?;
    let nota = require_i64(&body, "nota")?;
    check_range("nota", nota, 0, 10)?;
    let comentario = optional_str(&body, "comentario")?;

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

    let row = sqlx::query(
        "WITH t AS ( \
            INSERT INTO nps_respostas (cliente_id, nota, comentario) \
            VALUES ($1, $2, $3) \
            RETURNING id, cliente_id, nota, comentario, criado_em \
         ) SELECT row_to_json(t) AS row FROM t",
    )
    .bind(cliente_id)
    .bind(nota as i32)
    .bind(&comentario)
    .fetch_one(pool)
    .await?;

    let resposta: Value = row.try_get("row")?;
    Ok(ApiResponse::created("resposta recorded", resposta))
}

/// GET /api/nps/resumo - promoter/passive/detractor counts and the score.
///
/// Classification is the standard one: 9-10 promoter, 7-8 passive,
/// 0-6 detractor. Score = % promoters - % detractors, rounded toward zero.
pub async fn summary() -> ApiResult<Value> {
    let pool = database::pool().await?;

    let row = sqlx::query(
        "SELECT \
            COUNT(*) AS total, \
            COUNT(*) FILTER (WHERE nota >= 9) AS promotores, \
            COUNT(*) FILTER (WHERE nota BETWEEN 7 AND 8) AS neutros, \
            COUNT(*) FILTER (WHERE nota <= 6) AS detratores \
         FROM nps_respostas",
    )
    .fetch_one(pool)
    .await?;

    let total: i64 = row.try_get("total")?;
    let promotores: i64 = row.try_get("promotores")?;
    let neutros: i64 = row.try_get("neutros")?;
    let detratores: i64 = row.try_get("detratores")?;

    let score = if total > 0 {
        ((promotores - detratores) * 100) / total
    } else {
        0
    };

    Ok(ApiResponse::ok(
        "nps summary",
        json!({
            "total": total,
            "promotores": promotores,
            "neutros": neutros,
            "detratores": detratores,
            "score": score,
        }),
    ))
}
