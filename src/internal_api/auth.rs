use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{error, warn};

use crate::{app::AppState, config::AdminCredentials};

/// HTTP Basic auth against the configured admin credentials.
pub async fn require_admin_auth(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(admin) = state.config.admin.as_ref() else {
        error!("admin credentials are missing; set ADMIN_USERNAME and ADMIN_PASSWORD");
        return Ok(internal_error_response());
    };

    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());
    if !basic_auth_matches(header, admin) {
        warn!(path = %req.uri().path(), "admin request rejected");
        return Ok(unauthorized_response());
    }

    Ok(next.run(req).await)
}

fn basic_auth_matches(header: Option<&str>, admin: &AdminCredentials) -> bool {
    let Some(encoded) = header.and_then(|h| h.strip_prefix("Basic ")) else {
        return false;
    };
    let Ok(decoded) = BASE64.decode(encoded.trim()) else {
        return false;
    };
    let Ok(decoded_str) = String::from_utf8(decoded) else {
        return false;
    };

    let mut parts = decoded_str.splitn(2, ':');
    let username = parts.next().unwrap_or("");
    let password = parts.next().unwrap_or("");

    username == admin.username && password == admin.password
}

fn unauthorized_response() -> Response {
    let mut res = Response::new(Body::from("unauthorized"));
    *res.status_mut() = StatusCode::UNAUTHORIZED;
    res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"Admin\""),
    );
    res
}

fn internal_error_response() -> Response {
    let mut res = Response::new(Body::from("admin auth not configured"));
    *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> AdminCredentials {
        AdminCredentials {
            username: "ops".into(),
            password: "pa:ss".into(),
        }
    }

    #[test]
    fn accepts_matching_credentials_with_colon_in_password() {
        let header = format!("Basic {}", BASE64.encode("ops:pa:ss"));
        assert!(basic_auth_matches(Some(&header), &admin()));
    }

    #[test]
    fn rejects_wrong_or_malformed_headers() {
        let wrong = format!("Basic {}", BASE64.encode("ops:nope"));
        assert!(!basic_auth_matches(Some(&wrong), &admin()));
        assert!(!basic_auth_matches(Some("Bearer abc"), &admin()));
        assert!(!basic_auth_matches(Some("Basic !!!"), &admin()));
        assert!(!basic_auth_matches(None, &admin()));
    }
}
