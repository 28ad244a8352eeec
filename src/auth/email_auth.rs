use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    Form, Json,
};
use tracing::{info, warn};

use crate::auth::jwt::create_session_jwt;
use crate::auth::types::*;
use crate::auth::utils::*;
use crate::{
    app::AppState,
    device::{client_ip, LoginDecision, RequestFingerprint},
    model::{device::Device, user::User},
};

const HOME_REDIRECT: &str = "/dashboard";

pub async fn email_register_handler(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, (StatusCode, String)> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, "A valid email is required".into()));
    }
    if req.password.len() < 8 {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "Password must be at least 8 characters".into(),
        ));
    }

    let hash = hash_password(&req.password)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let name = req.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    let user = User::new(&email, name, hash);

    let inserted = state
        .db
        .insert_user(&user)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    if !inserted {
        return Err((StatusCode::CONFLICT, "Email already registered".into()));
    }

    info!(user_id = %user.id, "user registered");
    Ok(Json(RegisterResponse {
        user: user.summary(),
    }))
}

pub fn blocked_message(active: &Device) -> String {
    format!(
        "Your account is already active on another device ({}). \
         Log out from that device or ask an administrator to reset your devices.",
        active.device_name
    )
}

/// Password login gated by the user's active device. A device block is a
/// normal 200 response with `deviceBlocked` set.
pub async fn email_login_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Form(req): Form<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    let email = req.email.trim().to_lowercase();

    let user = state
        .db
        .find_user_by_email(&email)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()))?;

    let hash = user
        .password_hash
        .clone()
        .ok_or((StatusCode::UNAUTHORIZED, "Account has no password".to_string()))?;

    let valid = verify_password(&hash, &req.password)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    if !valid {
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    let ip = client_ip(&headers, Some(peer.ip()), state.config.trust_forwarded_for);
    let fp = RequestFingerprint::from_headers(&headers, ip, state.gate.policy().ip_scope);

    let decision = state
        .gate
        .check_login(&user, &fp)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let device = match &decision {
        LoginDecision::Blocked { active } => {
            warn!(user_id = %user.id, "login refused: device limit");
            return Ok(Json(LoginResponse {
                success: false,
                device_blocked: true,
                device_message: Some(blocked_message(active)),
                blocked_device_info: Some(active.blocked_info()),
                ..Default::default()
            }));
        }
        LoginDecision::Registered { device }
        | LoginDecision::SameDevice { device }
        | LoginDecision::Tracked { device, .. } => device,
    };

    let session_id = device.session_id.clone().unwrap_or_default();
    let ttl = if req.remember() {
        state.config.remember_ttl_secs
    } else {
        state.config.session_ttl_secs
    };
    let jwt = create_session_jwt(&state.config.jwt_secret, &user.id, &device.id, &session_id, ttl)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(LoginResponse {
        success: true,
        device_blocked: false,
        jwt: Some(jwt),
        user_id: Some(user.id.clone()),
        redirect: Some(HOME_REDIRECT.to_string()),
        new_device: decision.is_new_device(),
        track_only: decision.track_only(),
        ..Default::default()
    }))
}
