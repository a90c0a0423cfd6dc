//! Client classification from the `Origin` header and the token cookies
//! handed to browser clients.

use crate::config::{CookieConfig, OriginPolicy};
use crate::error::{AppError, ErrorKind};
use crate::AppState;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::{Cookie, SameSite};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    /// Listed web origin; tokens also go out as HttpOnly cookies
    Browser,
    /// Listed native origin or no Origin header; tokens in the body only
    Native,
}

impl ClientKind {
    pub fn detect(headers: &HeaderMap, policy: &OriginPolicy) -> Result<Self, AppError> {
        let Some(origin) = headers.get(header::ORIGIN) else {
            return Ok(ClientKind::Native);
        };

        let origin = origin.to_str().map_err(|_| unknown_origin())?;

        if policy.is_web_origin(origin) {
            Ok(ClientKind::Browser)
        } else if policy.is_native_origin(origin) {
            Ok(ClientKind::Native)
        } else {
            tracing::warn!("Rejected request from unrecognized origin {}", origin);
            Err(unknown_origin())
        }
    }

    pub fn uses_cookies(self) -> bool {
        self == ClientKind::Browser
    }
}

fn unknown_origin() -> AppError {
    AppError::new(ErrorKind::Forbidden, Some("origin"), "Origin not allowed")
}

impl FromRequestParts<AppState> for ClientKind {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        ClientKind::detect(&parts.headers, &state.origins)
    }
}

fn token_cookie(
    name: &str,
    value: &str,
    max_age: chrono::Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name.to_string(), value.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(max_age.num_seconds()))
        .build()
}

pub fn access_cookie(config: &CookieConfig, token: &str, max_age: chrono::Duration) -> Cookie<'static> {
    token_cookie(&config.access_cookie_name, token, max_age, config.secure)
}

pub fn refresh_cookie(config: &CookieConfig, token: &str, max_age: chrono::Duration) -> Cookie<'static> {
    token_cookie(&config.refresh_cookie_name, token, max_age, config.secure)
}

/// Expired, empty cookie that makes the browser drop `name`.
pub fn removal_cookie(config: &CookieConfig, name: &str) -> Cookie<'static> {
    let mut cookie = token_cookie(name, "", chrono::Duration::zero(), config.secure);
    cookie.make_removal();
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_origin(origin: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_str(origin).unwrap());
        headers
    }

    #[test]
    fn test_detect_client_kind() {
        let policy = OriginPolicy::new(&["https://app.petadopt.example"], &["capacitor://localhost"]);

        assert_eq!(
            ClientKind::detect(&with_origin("https://app.petadopt.example"), &policy).unwrap(),
            ClientKind::Browser
        );
        assert_eq!(
            ClientKind::detect(&with_origin("capacitor://localhost"), &policy).unwrap(),
            ClientKind::Native
        );
        assert_eq!(
            ClientKind::detect(&HeaderMap::new(), &policy).unwrap(),
            ClientKind::Native
        );

        let err = ClientKind::detect(&with_origin("https://evil.example"), &policy).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
        assert_eq!(err.field.as_deref(), Some("origin"));
    }

    #[test]
    fn test_token_cookie_attributes() {
        let config = CookieConfig::default();
        let cookie = access_cookie(&config, "abc", chrono::Duration::seconds(900));
        let rendered = cookie.to_string();

        assert!(rendered.starts_with("access_token=abc"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Max-Age=900"));
    }

    #[test]
    fn test_removal_cookie_expires_immediately() {
        let config = CookieConfig {
            secure: false,
            ..CookieConfig::default()
        };
        let rendered = removal_cookie(&config, "refresh_token").to_string();

        assert!(rendered.starts_with("refresh_token=;"));
        assert!(rendered.contains("Max-Age=0"));
        assert!(!rendered.contains("Secure"));
    }
}
