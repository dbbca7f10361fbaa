// ==============================
// tests/integration/router_tests.rs
// ==============================
//! HTTP routes driven with `tower::ServiceExt::oneshot`.
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::connect_info::MockConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use slax_backend_lib::auth::Credentials;
use slax_backend_lib::{router::create_router, AppState, Framework, Settings};
use slax_common::{ErrorBody, Health, LoginResponse, UserView};
use tower::ServiceExt;

fn app() -> (Router, AppState) {
    let mut settings = Settings::default();
    settings.auth.hasher = "whirlpool".to_string();
    settings.auth.throttling.attempt_limit = Some(2);
    let state = Framework::new(settings).boot().unwrap();
    state
        .coordinator
        .register(&Credentials::new("lifter@example.com", "SecureP@ssw0rd"), true)
        .unwrap();

    let router = create_router(Arc::new(state.clone()))
        .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));
    (router, state)
}

fn login_request(password: &str, remember: bool) -> Request<Body> {
    let body = serde_json::json!({
        "login": "lifter@example.com",
        "password": password,
        "remember": remember,
    });
    Request::post("/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_reports_selected_strategies() {
    let (app, _) = app();
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let health: Health = json(response).await;
    assert_eq!(health.hasher, "whirlpool");
    assert!(health.throttling);
}

#[tokio::test]
async fn test_login_me_logout() {
    let (app, state) = app();

    let response = app
        .clone()
        .oneshot(login_request("SecureP@ssw0rd", true))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let login: LoginResponse = json(response).await;
    assert_eq!(login.user.login, "lifter@example.com");
    assert!(login.persist_code.is_some());

    let session = state.coordinator.session(&login.token).unwrap();
    assert_eq!(session.ip_address, Some("127.0.0.1".parse().unwrap()));

    let bearer = format!("Bearer {}", login.token);
    let response = app
        .clone()
        .oneshot(
            Request::get("/me")
                .header(header::AUTHORIZATION, &bearer)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let me: UserView = json(response).await;
    assert_eq!(me.id, login.user.id);

    let response = app
        .clone()
        .oneshot(
            Request::post("/logout")
                .header(header::AUTHORIZATION, &bearer)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(
            Request::get("/me")
                .header(header::AUTHORIZATION, &bearer)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_password_then_throttled() {
    let (app, _) = app();

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(login_request("wrong", false))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: ErrorBody = json(response).await;
        assert_eq!(body.error.code, "AUTH_004");
    }

    let response = app
        .oneshot(login_request("SecureP@ssw0rd", false))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: ErrorBody = json(response).await;
    assert_eq!(body.error.code, "THROTTLE_001");
}
