use axum::{extract::State, http::StatusCode, Json};

use crate::{
    app::AppState,
    auth::{session::AuthenticatedUser, types::*},
};

pub async fn me_handler(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<MeResponse>, (StatusCode, String)> {
    let device = state
        .db
        .load_device(&auth.user.id, &auth.device_record_id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::UNAUTHORIZED, "Device not found".to_string()))?;

    Ok(Json(MeResponse {
        user: auth.user.summary(),
        device,
    }))
}

/// Ends the caller's session and frees the device slot.
pub async fn logout_handler(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<LogoutResponse>, (StatusCode, String)> {
    state
        .gate
        .logout_device(&auth.user.id, &auth.device_record_id, None)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(LogoutResponse {
        success: true,
        message: "Logged out".into(),
    }))
}
