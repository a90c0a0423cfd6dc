pub mod account_handlers;
pub mod auth_handlers;
pub mod verification_handlers;

use crate::auth::authenticate_request;
use crate::error::{AppError, Result};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

pub use account_handlers::{accept_terms_handler, me_handler};
pub use auth_handlers::{login_handler, logout_handler, refresh_handler, register_handler};
pub use verification_handlers::{confirm_verification_handler, request_verification_handler};

/// Unwrap a JSON body, turning any rejection into a 400.
pub(crate) fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::validation("body", rejection.body_text()))
}

pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}

/// API routes with the per-request authentication filter applied.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/refresh", post(refresh_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/auth/verification", post(request_verification_handler))
        .route(
            "/auth/verification/confirm",
            post(confirm_verification_handler),
        )
        .route("/accounts/me", get(me_handler))
        .route("/accounts/me/terms", post(accept_terms_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            authenticate_request,
        ))
        .with_state(state)
}
