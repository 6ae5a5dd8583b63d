use crate::{
    AppState, handlers,
    permissions::Permission,
    rbac::{PermissionGuard, enforce_permissions},
};
use axum::{
    Router, middleware,
    routing::{post, put},
};

const EVENTOS_WRITE: &[Permission] = &[Permission::EventosWrite];

/// Authenticated Router Module
///
/// Mutating evento endpoints. The caller must be authenticated (layer applied
/// by `create_router`) and hold `eventos:write`.
pub fn authenticated_routes(state: &AppState) -> Router<AppState> {
    let write_guard = PermissionGuard::new(state.gate.clone(), EVENTOS_WRITE);

    Router::new()
        // POST /eventos
        .route(
            "/eventos",
            post(handlers::create_evento).route_layer(middleware::from_fn_with_state(
                write_guard.clone(),
                enforce_permissions,
            )),
        )
        // PUT/DELETE /eventos/{id}
        .route(
            "/eventos/{id}",
            put(handlers::update_evento)
                .delete(handlers::delete_evento)
                .route_layer(middleware::from_fn_with_state(
                    write_guard,
                    enforce_permissions,
                )),
        )
}
