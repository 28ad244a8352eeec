use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::{config::AppConfig, db::DBLayer, device::DeviceGate};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DBLayer>,
    pub gate: DeviceGate,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: Arc<DBLayer>, config: AppConfig) -> Self {
        let gate = DeviceGate::new(db.clone(), config.device_policy);
        Self {
            db,
            gate,
            config: Arc::new(config),
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Login, registration, session
        .merge(crate::auth::router())
        // RFIs, objections, chainage suggestions
        .merge(crate::api::router())
        // Admin device management (basic auth)
        .merge(crate::internal_api::router(state.clone()))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}


#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::{
        body::{to_bytes, Body},
        extract::ConnectInfo,
        http::{header, Request, StatusCode},
    };
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use tower::ServiceExt;

    use super::test_support::*;
    use super::*;
    use crate::config::AdminCredentials;
    use crate::device::user_agent::samples::{CHROME_ANDROID, CHROME_WINDOWS};

    fn with_admin() -> TestApp {
        let mut config = AppConfig::for_secret(TEST_SECRET);
        config.admin = Some(AdminCredentials {
            username: "ops".into(),
            password: "s3cret".into(),
        });
        test_app_with(config)
    }

    fn basic(user: &str, pass: &str) -> String {
        format!("Basic {}", BASE64.encode(format!("{user}:{pass}")))
    }

    async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, Value) {
        let res = build_router(app.state.clone()).oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn devices_request(user_id: &str, auth: Option<&str>) -> Request<Body> {
        let mut req = Request::get(format!("/internal/users/{user_id}/devices"));
        if let Some(auth) = auth {
            req = req.header(header::AUTHORIZATION, auth);
        }
        req.body(Body::empty()).unwrap()
    }

    fn login_request(email: &str, ua: &str) -> Request<Body> {
        let form = format!(
            "email={}&password={}",
            email.replace('@', "%40"),
            TEST_PASSWORD.replace(' ', "+")
        );
        let mut req = Request::post("/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::USER_AGENT, ua)
            .header(header::ACCEPT_LANGUAGE, "en-US")
            .body(Body::from(form))
            .unwrap();
        let peer: SocketAddr = "10.0.0.5:50000".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(peer));
        req
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = test_app();
        let req = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn admin_routes_require_basic_auth() {
        let app = with_admin();
        let user = app.user("crew@example.com").await;

        let res = build_router(app.state.clone())
            .oneshot(devices_request(&user.id, None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(res.headers().contains_key(header::WWW_AUTHENTICATE));

        let (status, _) = send(&app, devices_request(&user.id, Some(&basic("ops", "wrong")))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let toggle = Request::post(format!("/internal/users/{}/devices/toggle", user.id))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, _) = send(&app, toggle).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(app.state.db.load_user(&user.id).await.unwrap().unwrap().single_device_login_enabled);
    }

    #[tokio::test]
    async fn admin_routes_fail_closed_without_configured_credentials() {
        let app = test_app();
        let user = app.user("crew@example.com").await;
        let (status, _) = send(&app, devices_request(&user.id, Some(&basic("ops", "s3cret")))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn admin_routes_answer_with_valid_credentials() {
        let app = with_admin();
        let user = app.user("crew@example.com").await;
        let auth = basic("ops", "s3cret");

        let (status, body) = send(&app, devices_request(&user.id, Some(&auth))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["id"], user.id.as_str());
        assert!(body["message"].is_string());

        let toggle = Request::post(format!("/internal/users/{}/devices/toggle", user.id))
            .header(header::AUTHORIZATION, &auth)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"enabled":false}"#))
            .unwrap();
        let (status, body) = send(&app, toggle).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["single_device_login_enabled"], false);

        let (status, _) = send(&app, devices_request("missing", Some(&auth))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn login_form_through_router_binds_session_and_blocks_second_device() {
        let app = test_app();
        let user = app.user("crew@example.com").await;

        let (status, body) = send(&app, login_request("crew@example.com", CHROME_WINDOWS)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["newDevice"], true);
        let jwt = body["jwt"].as_str().unwrap().to_string();

        let me = Request::get("/api/me")
            .header(header::AUTHORIZATION, format!("Bearer {jwt}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, me).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["id"], user.id.as_str());
        assert_eq!(body["device"]["ip_address"], "10.0.0.5");

        let (status, body) = send(&app, login_request("crew@example.com", CHROME_ANDROID)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["deviceBlocked"], true);
        assert_eq!(body["blockedDeviceInfo"]["platform"], "Windows");
        assert!(body.get("jwt").is_none());
    }
}
