// POST /auth/login - authenticate and receive a session token

use axum::http::HeaderMap;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use sqlx::Row;
use uuid::Uuid;

use crate::api::extract::Json;
use crate::api::validate::{check_email, require_str};
use crate::auth;
use crate::database;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};

/// Authenticate by email + password and issue a 7-day bearer token.
///
/// Unknown email and wrong password are separate 401s, matching the
/// original client's expectations. Token issuance has no side effects
/// beyond a best-effort audit row.
pub async fn login(headers: HeaderMap, Json(body): Json<Value>) -> ApiResult<Value> {
    let email = require_str(&body, "email")?;
    check_email("email", &email)?;
    let senha = require_str(&body, "senha")?;

    let pool = database::pool().await?;

    let row = sqlx::query(
        "SELECT id, nome, email, senha_hash FROM usuarios WHERE email = $1 AND ativo = TRUE",
    )
    .bind(&email)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::unauthorized("user not found"))?;

    let stored_hash: String = row.try_get("senha_hash")?;
    if hash_password(&senha) != stored_hash {
        return Err(ApiError::unauthorized("incorrect password"));
    }

    let user_id: Uuid = row.try_get("id")?;
    let nome: String = row.try_get("nome")?;
    let token = auth::issue(user_id)?;

    record_login_event(pool, user_id, &headers).await;

    Ok(ApiResponse::ok(
        "login successful",
        json!({
            "token": token,
            "usuario": {
                "id": user_id,
                "nome": nome,
                "email": email,
            }
        }),
    ))
}

/// SHA-256 hex digest, matching the stored `senha_hash` format
pub fn hash_password(senha: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(senha.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Best-effort device-sync audit insert. A failure here is logged and
/// swallowed; it must never abort the login itself.
async fn record_login_event(pool: &sqlx::PgPool, user_id: Uuid, headers: &HeaderMap) {
    // If the client sent a stale token along with the login, note whose
    // session it was. Unverified decode only: this is diagnostics, the
    // value never feeds an authorization decision.
    let previous_subject = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .and_then(auth::decode_unverified)
        .map(|claims| claims.sub.to_string());

    let result = sqlx::query(
        "INSERT INTO eventos_sincronizacao (usuario_id, evento, detalhe) VALUES ($1, 'login', $2)",
    )
    .bind(user_id)
    .bind(previous_subject)
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::warn!("login audit insert failed for {}: {}", user_id, e);
    }
}
