// ============================================================================
// SSO API - Router
// File: crates/sso-api/src/routes.rs
// ============================================================================

use std::time::Duration;

use axum::{
    http::StatusCode,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::handlers::{auth, health, profile, tenant, users};
use crate::state::AppState;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .route("/reset-password/validate", get(auth::validate_reset_token));

    let tenant_routes = Router::new()
        .route("/", get(tenant::current).patch(tenant::update))
        .route("/stats", get(tenant::stats));

    let user_routes = Router::new()
        .route("/", get(users::list).post(users::create))
        .route("/stats", get(users::stats))
        .route("/{id}", patch(users::update).delete(users::delete));

    let profile_routes = Router::new()
        .route("/", get(profile::show).patch(profile::update))
        .route("/password", post(profile::change_password));

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/tenant", tenant_routes)
        .nest("/users", user_routes)
        .nest("/profile", profile_routes);

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
