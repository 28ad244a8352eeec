use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::app::AppState;

pub mod auth;
pub mod handlers;
pub mod types;

use auth::require_admin_auth;
use handlers::{list_devices, logout_device, reset_devices, toggle_single_device};

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/internal/users/{user_id}/devices", get(list_devices))
        .route(
            "/internal/users/{user_id}/devices/toggle",
            post(toggle_single_device),
        )
        .route("/internal/users/{user_id}/devices/reset", post(reset_devices))
        .route(
            "/internal/users/{user_id}/devices/{device_id}/logout",
            post(logout_device),
        )
        .route_layer(middleware::from_fn_with_state(state, require_admin_auth))
}
