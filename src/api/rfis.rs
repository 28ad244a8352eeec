use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    api::types::{CreateRfiRequest, RfiListResponse},
    app::AppState,
    auth::session::AuthenticatedUser,
    chainage::parse_location,
    model::rfi::Rfi,
};

pub async fn create_rfi(
    State(state): State<AppState>,
    _auth: AuthenticatedUser,
    Json(req): Json<CreateRfiRequest>,
) -> Result<Json<Rfi>, (StatusCode, String)> {
    let number = req.number.trim().to_string();
    if number.is_empty() {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, "RFI number is required".into()));
    }
    let location = req.location.trim().to_string();
    parse_location(&location)
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, format!("location: {e}")))?;

    let rfi = Rfi {
        id: Uuid::new_v4().to_string(),
        number,
        location,
        description: req.description,
        status: req.status.unwrap_or_default(),
        created_ts: chrono::Utc::now().timestamp(),
    };

    let inserted = state
        .db
        .insert_rfi(&rfi)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    if !inserted {
        return Err((
            StatusCode::CONFLICT,
            format!("RFI {} already exists", rfi.number),
        ));
    }

    info!(rfi = %rfi.number, location = %rfi.location, "rfi created");
    Ok(Json(rfi))
}

pub async fn list_rfis(
    State(state): State<AppState>,
    _auth: AuthenticatedUser,
) -> Result<Json<RfiListResponse>, (StatusCode, String)> {
    let rfis = state
        .db
        .list_rfis()
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(RfiListResponse {
        count: rfis.len(),
        rfis,
    }))
}
