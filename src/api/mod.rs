use axum::{
    routing::{get, post},
    Router,
};

use crate::app::AppState;

pub mod objections;
pub mod rfis;
pub mod suggest;
pub mod types;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/suggest-rfis", get(suggest::suggest_rfis))
        .route("/api/rfis", get(rfis::list_rfis).post(rfis::create_rfi))
        .route("/api/objections", post(objections::create_objection))
        .route("/api/objections/{objection_id}", get(objections::get_objection))
        .route(
            "/api/objections/{objection_id}/matching-rfis",
            get(objections::matching_rfis),
        )
        .route(
            "/api/objections/{objection_id}/attach-matching",
            post(objections::attach_matching),
        )
}
