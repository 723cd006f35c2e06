//! Extractors that keep the error envelope on parse failures.
//!
//! axum's own `Json`/`Path`/`Query` rejections answer with plain-text
//! bodies. Clients of this API expect `{"success": false, "message": ...}`
//! on every failure, so these wrappers convert each rejection into an
//! `ApiError` before it leaves the router.

use async_trait::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// JSON body extractor; malformed JSON becomes a 400 in the envelope
#[derive(Debug)]
pub struct Json<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Json(value)),
            Err(rejection) => Err(ApiError::invalid_json(rejection.body_text())),
        }
    }
}

/// Path extractor; a bad path segment (e.g. a non-UUID id) becomes a 400
#[derive(Debug)]
pub struct Path<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Path::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Path(value)) => Ok(Path(value)),
            Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
        }
    }
}

/// Query-string extractor; unparseable parameters become a 400
#[derive(Debug)]
pub struct Query<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Query::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Query(value)) => Ok(Query(value)),
            Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde_json::{json, Value};

    fn parts_for(uri: &str) -> Parts {
        axum::http::Request::builder()
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[tokio::test]
    async fn malformed_json_body_keeps_the_envelope() {
        let req = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let err = Json::<Value>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_json()["success"], json!(false));
        assert!(err.to_json()["message"].is_string());
    }

    #[tokio::test]
    async fn valid_json_body_passes_through() {
        let req = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"codigo": "F001"}"#))
            .unwrap();

        let Json(body) = Json::<Value>::from_request(req, &()).await.unwrap();
        assert_eq!(body["codigo"], "F001");
    }

    #[tokio::test]
    async fn bad_path_segment_keeps_the_envelope() {
        // Without router context Path always rejects; the point is the shape
        let mut parts = parts_for("/api/filiais/not-a-uuid");
        let err = Path::<uuid::Uuid>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_json()["success"], json!(false));
    }

    #[tokio::test]
    async fn unparseable_query_keeps_the_envelope() {
        #[derive(serde::Deserialize, Debug)]
        struct Q {
            #[allow(dead_code)]
            page: i64,
        }

        let mut parts = parts_for("/api/filiais?page=abc");
        let err = Query::<Q>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_json()["success"], json!(false));
    }
}
