use crate::error::Result;
use crate::handlers::json_body;
use crate::services::{Confirmation, CurrentAccount};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct ConfirmVerificationBody {
    #[serde(default)]
    token: String,
}

#[derive(Serialize)]
pub struct ConfirmVerificationResponse {
    status: Confirmation,
}

/// Mail a fresh verification link to the caller. The token never appears in
/// the response.
pub async fn request_verification_handler(
    State(state): State<AppState>,
    current: CurrentAccount,
) -> Result<StatusCode> {
    let account = state.account_service.get_account(current.account_id).await?;
    state
        .verification_service
        .request_verification(&account)
        .await?;

    Ok(StatusCode::ACCEPTED)
}

pub async fn confirm_verification_handler(
    State(state): State<AppState>,
    current: CurrentAccount,
    payload: std::result::Result<Json<ConfirmVerificationBody>, JsonRejection>,
) -> Result<Json<ConfirmVerificationResponse>> {
    let body = json_body(payload)?;
    let account = state.account_service.get_account(current.account_id).await?;

    let status = state
        .verification_service
        .confirm_verification(body.token.trim(), &account)
        .await?;

    Ok(Json(ConfirmVerificationResponse { status }))
}
