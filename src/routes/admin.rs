use crate::{
    AppState, handlers,
    permissions::Permission,
    rbac::{PermissionGuard, enforce_permissions},
};
use axum::{Router, middleware, routing::get};

const SUDO: &[Permission] = &[Permission::Sudo];

/// Admin Router Module
///
/// System settings, restricted to principals holding `sudo`.
pub fn admin_routes(state: &AppState) -> Router<AppState> {
    let sudo_guard = PermissionGuard::new(state.gate.clone(), SUDO);

    Router::new()
        // GET/PUT /maximos-dias-adelante-reserva
        // Reads or replaces how many days ahead a booking may be made.
        .route(
            "/maximos-dias-adelante-reserva",
            get(handlers::get_maximos_dias)
                .put(handlers::put_maximos_dias)
                .route_layer(middleware::from_fn_with_state(sudo_guard, enforce_permissions)),
        )
}
