// ============================
// slax-backend-lib/src/router.rs
// ============================
//! HTTP routes over the authentication coordinator.
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use slax_common::{Health, LoginRequest, LoginResponse, UserView};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::Credentials;
use crate::error::AuthError;
use crate::AppState;

/// Create the router. Serve it with connect info so handlers see client addresses.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        hasher: state.coordinator.hasher_kind().to_string(),
        throttling: state.coordinator.throttle().is_enabled(),
    })
}

async fn login(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    let auth = state.coordinator.with_ip_address(addr.ip());
    let remember = req.remember;
    let credentials = Credentials::from(req);

    let (session, persist_code) = if remember {
        let remembered = auth.login_and_remember(&credentials)?;
        (remembered.session, Some(remembered.persist_code))
    } else {
        (auth.login(&credentials)?, None)
    };

    let user = auth.users().find_by_id(session.user_id)?;
    Ok(Json(LoginResponse {
        token: session.token,
        user: auth.view(&user),
        expires_in: session.expires_in().as_secs(),
        persist_code,
    }))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, AuthError> {
    let token = bearer_token(&headers)?;
    let session = state
        .coordinator
        .session(&token)
        .ok_or(AuthError::NotLoggedIn)?;
    state.coordinator.logout(&session);
    Ok(StatusCode::NO_CONTENT)
}

async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<UserView>, AuthError> {
    let token = bearer_token(&headers)?;
    let user = state
        .coordinator
        .check(&token)
        .ok_or(AuthError::NotLoggedIn)?;
    Ok(Json(state.coordinator.view(&user)))
}

fn bearer_token(headers: &HeaderMap) -> Result<Uuid, AuthError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|token| Uuid::parse_str(token.trim()).ok())
        .ok_or(AuthError::NotLoggedIn)
}
