use axum::{
    routing::{get, post},
    Router,
};

use crate::app::AppState;

pub mod email_auth;
pub mod handlers;
pub mod jwt;
pub mod session;
pub mod types;
pub mod utils;

use email_auth::{email_login_handler, email_register_handler};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(email_register_handler))
        .route("/login", post(email_login_handler))
        .route("/logout", post(handlers::logout_handler))
        .route("/api/me", get(handlers::me_handler))
}
