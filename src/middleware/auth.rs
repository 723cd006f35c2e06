use axum::{
    extract::Request,
    http::{HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{self, Claims};
use crate::error::ApiError;

/// Authenticated user context extracted from a validated session token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self { user_id: claims.sub }
    }
}

/// Bearer-token middleware for every protected route.
///
/// CORS preflight requests are answered before authentication, so OPTIONS
/// passes through untouched; the token check only applies to real methods.
pub async fn require_bearer(request: Request, next: Next) -> Result<Response, ApiError> {
    if request.method() == Method::OPTIONS {
        return Ok(next.run(request).await);
    }

    let token = extract_bearer(request.headers())?;
    let claims = auth::validate(&token)?;

    let mut request = request;
    request.extensions_mut().insert(AuthUser::from(claims));

    Ok(next.run(request).await)
}

/// Extract the token from an `Authorization: Bearer <token>` header
fn extract_bearer(headers: &HeaderMap) -> Result<String, ApiError> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| ApiError::unauthorized("missing Authorization header"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("invalid Authorization header"))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.to_string()),
        Some(_) => Err(ApiError::unauthorized("empty bearer token")),
        None => Err(ApiError::unauthorized(
            "Authorization header must use Bearer token format",
        )),
    }
}
