use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Request-scoped identity and authorization.
pub mod auth;
pub mod context;
pub mod permissions;
pub mod rbac;

// Audit trail and list planning shared by every domain service.
pub mod audit;
pub mod pagination;

// Domain, persistence and HTTP surface.
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod services;

pub mod routes;
use routes::{admin, authenticated, public};

use auth::AuthUser;
use context::{REQUEST_ID_HEADER, RequestContext, context_middleware};

// --- Public Re-exports ---

pub use audit::{AuditEmitter, AuditTaxonomy};
pub use config::AppConfig;
pub use error::AppError;
pub use rbac::AuthorizationGate;
pub use repository::PostgresRepository;
pub use services::{EventoService, ReservaService};

/// AppState
///
/// Shared, cheaply clonable container for every service the handlers need.
/// Built once in `main`; nothing in it is mutated while serving requests.
#[derive(Clone)]
pub struct AppState {
    pub eventos: EventoService,
    pub reservas: ReservaService,
    pub gate: AuthorizationGate,
    pub audit: AuditEmitter,
    pub config: AppConfig,
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects with 401 when `AuthUser` cannot be extracted. On success, records
/// the principal in this request's `RequestContext`.
async fn auth_middleware(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    let ctx = request
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_else(RequestContext::detached)
        .with_principal(auth_user.id);
    request.extensions_mut().insert(ctx);

    next.run(request).await
}

/// create_router
///
/// Assembles the routing tree and its middleware. From the outside in, a
/// request passes request-id assignment, tracing, context creation,
/// authentication (protected groups), then the route's permission guard.
/// Unmatched paths and methods render the generic not-found body.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let base_router = Router::new()
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes(&state)
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        .merge(
            admin::admin_routes(&state)
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        .fallback(handlers::route_not_found)
        .method_not_allowed_fallback(handlers::route_not_found)
        .with_state(state)
        .layer(middleware::from_fn(context_middleware));

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span, tagged with the `x-request-id` that also
/// becomes the `RequestContext` trace id.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
