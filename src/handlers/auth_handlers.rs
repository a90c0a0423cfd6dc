use crate::auth::{access_cookie, extract, refresh_cookie, removal_cookie, ClientKind};
use crate::error::{AppError, ErrorKind, Result};
use crate::handlers::json_body;
use crate::models::{AccountSummary, Profile};
use crate::services::account_service::{normalize_email, validate_email};
use crate::services::{LoginRequest, RegisterRequest};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    password_confirm: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    #[serde(flatten)]
    account: AccountSummary,
    profiles: Vec<Profile>,
}

#[derive(Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    access_token: String,
    refresh_token: String,
    profiles: Vec<Profile>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    access_token: String,
    refresh_token: String,
}

pub async fn register_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RegisterBody>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let body = json_body(payload)?;

    let (account, profiles) = state
        .account_service
        .register(RegisterRequest {
            email: body.email,
            password: body.password,
            password_confirm: body.password_confirm,
            is_verified: false,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            account: AccountSummary::from(&account),
            profiles,
        }),
    ))
}

pub async fn login_handler(
    State(state): State<AppState>,
    client: ClientKind,
    jar: CookieJar,
    payload: std::result::Result<Json<LoginBody>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let body = json_body(payload)?;

    validate_email(&normalize_email(&body.email))?;
    if body.password.is_empty() {
        return Err(AppError::validation("password", "Password is required"));
    }

    let authenticated = state
        .auth_service
        .authenticate(LoginRequest {
            email: body.email,
            password: body.password,
        })
        .await?;

    let email = &authenticated.account.email;
    let access_token = state
        .token_service
        .issue_access_token(email, &authenticated.authorities())?;
    let refresh_token = state.token_service.issue_refresh_token(email)?;

    let jar = if client.uses_cookies() {
        jar.add(access_cookie(
            &state.cookies,
            &access_token,
            state.token_service.access_ttl(),
        ))
        .add(refresh_cookie(
            &state.cookies,
            &refresh_token,
            state.token_service.refresh_ttl(),
        ))
    } else {
        jar
    };

    tracing::info!("Account {} logged in", authenticated.account.id);

    Ok((
        jar,
        Json(LoginResponse {
            access_token,
            refresh_token,
            profiles: authenticated.profiles,
        }),
    ))
}

/// Mint a new access token from a refresh token. The refresh token itself
/// is echoed back unchanged.
pub async fn refresh_handler(
    State(state): State<AppState>,
    client: ClientKind,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse> {
    let refresh_token =
        extract::refresh_token(&headers, &jar, &state.cookies).ok_or_else(AppError::unauthenticated)?;

    let validated = state
        .token_service
        .validate_refresh(&refresh_token)
        .ok_or_else(|| {
            AppError::new(
                ErrorKind::Authentication,
                Some("token"),
                "Invalid or expired refresh token",
            )
        })?;

    let authenticated = state.auth_service.refresh(&validated.subject).await?;
    let access_token = state
        .token_service
        .issue_access_token(&authenticated.account.email, &authenticated.authorities())?;

    let jar = if client.uses_cookies() {
        jar.add(access_cookie(
            &state.cookies,
            &access_token,
            state.token_service.access_ttl(),
        ))
    } else {
        jar
    };

    Ok((
        jar,
        Json(RefreshResponse {
            access_token,
            refresh_token,
        }),
    ))
}

pub async fn logout_handler(
    State(state): State<AppState>,
    client: ClientKind,
    jar: CookieJar,
) -> impl IntoResponse {
    let jar = if client.uses_cookies() {
        jar.add(removal_cookie(&state.cookies, &state.cookies.access_cookie_name))
            .add(removal_cookie(&state.cookies, &state.cookies.refresh_cookie_name))
    } else {
        jar
    };

    (StatusCode::NO_CONTENT, jar)
}
