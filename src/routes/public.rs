use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints reachable without authentication.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check.
        .route("/health", get(|| async { "ok" }))
        // GET /eventos?page=&limit=&orderBy=&sucursalId=...
        // Paginated listing; orderBy is checked against the evento whitelist.
        .route("/eventos", get(handlers::list_eventos))
        // GET /eventos/{id}
        .route("/eventos/{id}", get(handlers::get_evento))
}
