use crate::error::Result;
use crate::models::{AccountSummary, Profile};
use crate::services::CurrentAccount;
use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    #[serde(flatten)]
    account: AccountSummary,
    profiles: Vec<Profile>,
    authorities: Vec<String>,
}

pub async fn me_handler(
    State(state): State<AppState>,
    current: CurrentAccount,
) -> Result<Json<MeResponse>> {
    let account = state.account_service.get_account(current.account_id).await?;
    let profiles = state
        .account_service
        .active_profiles(current.account_id)
        .await?;

    Ok(Json(MeResponse {
        account: AccountSummary::from(&account),
        profiles,
        authorities: current.authorities,
    }))
}

/// Record acceptance of the terms of service. Repeat calls keep the first
/// acceptance time.
pub async fn accept_terms_handler(
    State(state): State<AppState>,
    current: CurrentAccount,
) -> Result<Json<AccountSummary>> {
    let account = state.account_service.accept_terms(current.account_id).await?;
    Ok(Json(AccountSummary::from(&account)))
}
