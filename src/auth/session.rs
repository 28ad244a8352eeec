use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use tracing::debug;

use super::jwt::decode_session_jwt;
use crate::{app::AppState, model::user::User};

/// A request carrying a valid token whose device session is still current.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub device_record_id: String,
    pub session_id: String,
}

pub async fn authenticate(
    state: &AppState,
    token: &str,
) -> Result<AuthenticatedUser, (StatusCode, &'static str)> {
    let claims = decode_session_jwt(&state.config.jwt_secret, token)
        .map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid or expired token"))?;

    let current = state
        .gate
        .session_is_current(&claims.sub, &claims.did, &claims.sid)
        .await
        .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Session lookup failed"))?;
    if !current {
        debug!(user_id = %claims.sub, device = %claims.did, "stale session rejected");
        return Err((StatusCode::UNAUTHORIZED, "Session ended on this device"));
    }

    let user = state
        .db
        .load_user(&claims.sub)
        .await
        .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "User lookup failed"))?
        .ok_or((StatusCode::UNAUTHORIZED, "Unknown user"))?;

    Ok(AuthenticatedUser {
        user,
        device_record_id: claims.did,
        session_id: claims.sid,
    })
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| (StatusCode::UNAUTHORIZED, "Missing Authorization header"))?;

        authenticate(state, bearer.token()).await
    }
}
