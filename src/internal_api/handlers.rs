use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};

use crate::{
    app::AppState,
    internal_api::types::{DeviceAdminResponse, ReasonRequest, ToggleRequest},
    model::user::User,
};

type AdminResult = Result<Json<DeviceAdminResponse>, (StatusCode, String)>;

async fn require_user(state: &AppState, user_id: &str) -> Result<User, (StatusCode, String)> {
    state
        .db
        .load_user(user_id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, format!("user {user_id} not found")))
}

/// users.device.list
pub async fn list_devices(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> AdminResult {
    let user = require_user(&state, &user_id).await?;
    let devices = state
        .db
        .list_devices_for_user(&user_id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let active = devices.iter().filter(|d| d.is_active).count();

    Ok(Json(DeviceAdminResponse {
        success: true,
        user: user.summary(),
        message: format!("{} device(s), {active} active", devices.len()),
        devices: Some(devices),
        device: None,
    }))
}

/// users.device.toggle
pub async fn toggle_single_device(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<ToggleRequest>,
) -> AdminResult {
    require_user(&state, &user_id).await?;
    let user = state
        .gate
        .set_single_device_login(&user_id, req.enabled)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let message = if user.single_device_login_enabled {
        "Single device login enabled"
    } else {
        "Single device login disabled"
    };
    Ok(Json(DeviceAdminResponse {
        success: true,
        user: user.summary(),
        message: message.into(),
        devices: None,
        device: None,
    }))
}

/// users.device.reset
pub async fn reset_devices(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<ReasonRequest>,
) -> AdminResult {
    require_user(&state, &user_id).await?;
    let (user, count) = state
        .gate
        .reset_devices(&user_id, req.reason.as_deref())
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(DeviceAdminResponse {
        success: true,
        user: user.summary(),
        message: format!("{count} device(s) reset"),
        devices: None,
        device: None,
    }))
}

/// users.device.logout
pub async fn logout_device(
    Path((user_id, device_id)): Path<(String, String)>,
    State(state): State<AppState>,
    Json(req): Json<ReasonRequest>,
) -> AdminResult {
    let user = require_user(&state, &user_id).await?;
    let device = state
        .gate
        .logout_device(&user_id, &device_id, req.reason.as_deref())
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, format!("device {device_id} not found")))?;

    Ok(Json(DeviceAdminResponse {
        success: true,
        user: user.summary(),
        message: format!("{} logged out", device.device_name),
        devices: None,
        device: Some(device),
    }))
}
