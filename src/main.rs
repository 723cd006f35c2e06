use axum::{middleware::from_fn, routing::get, routing::post, routing::put, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

mod api;
mod auth;
mod config;
mod database;
mod error;
mod handlers;
mod middleware;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL and JWT_SECRET
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = crate::config::config();
    tracing::info!("Starting varejo-api in {:?} mode", config.environment);

    let app = app();

    let port = std::env::var("VAREJO_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("varejo-api listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .route(
            "/auth/login",
            post(handlers::public::auth::login).fallback(method_not_allowed),
        )
        // Protected API behind the bearer-token layer. The permissive CORS
        // layer sits outside it, so OPTIONS preflight never reaches auth.
        .merge(protected_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn protected_routes() -> Router {
    use handlers::protected::{clientes, filiais, metas, nps, pedidos, produtos, vendedores};

    Router::new()
        .route(
            "/api/filiais",
            protected(get(filiais::list).post(filiais::create)),
        )
        .route(
            "/api/filiais/:id",
            protected(get(filiais::get).put(filiais::update)),
        )
        .route("/api/filiais/:id/finalizar", protected(put(filiais::finalize)))
        .route(
            "/api/vendedores",
            protected(get(vendedores::list).post(vendedores::create)),
        )
        .route("/api/vendedores/:id", protected(get(vendedores::get)))
        .route(
            "/api/vendedores/:id/finalizar",
            protected(put(vendedores::finalize)),
        )
        .route(
            "/api/clientes",
            protected(get(clientes::list).post(clientes::create)),
        )
        .route("/api/clientes/:id", protected(get(clientes::get)))
        .route(
            "/api/produtos",
            protected(get(produtos::list).post(produtos::create)),
        )
        .route("/api/metas", protected(post(metas::create)))
        .route("/api/metas/:id", protected(get(metas::get)))
        .route("/api/metas/:id/finalizar", protected(put(metas::finalize)))
        .route(
            "/api/pedidos",
            protected(get(pedidos::list).post(pedidos::create)),
        )
        .route("/api/nps", protected(post(nps::create)))
        .route("/api/nps/resumo", protected(get(nps::summary)))
}

/// Wrap a method router with the bearer-token check. `route_layer` on the
/// method router keeps the method check first: a wrong verb falls through to
/// the 405 handler without the token ever being consulted.
fn protected(routes: axum::routing::MethodRouter) -> axum::routing::MethodRouter {
    routes
        .fallback(method_not_allowed)
        .route_layer(from_fn(middleware::auth::require_bearer))
}

/// Enveloped 405 for paths whose methods don't match
async fn method_not_allowed() -> error::ApiError {
    error::ApiError::method_not_allowed("method not allowed for this endpoint")
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "varejo-api",
            "version": version,
            "description": "Retail sales-force management backend",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "login": "/auth/login (public - token acquisition)",
                "filiais": "/api/filiais (protected)",
                "vendedores": "/api/vendedores (protected)",
                "clientes": "/api/clientes (protected)",
                "produtos": "/api/produtos (protected)",
                "metas": "/api/metas (protected)",
                "pedidos": "/api/pedidos (protected)",
                "nps": "/api/nps (protected)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match crate::database::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("health check failed: {}", e);
            (
                axum::http::StatusCode::SERVICE_UNAVAILABLE,
                axum::response::Json(json!({
                    "success": false,
                    "message": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database": "error"
                    }
                })),
            )
        }
    }
}
