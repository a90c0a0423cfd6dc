use crate::config::CookieConfig;
use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::CookieJar;

/// Extract Bearer token from Authorization header
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth_header.strip_prefix("Bearer ")?.trim();

    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn cookie_value(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Access token: the Authorization header wins over the cookie.
pub fn access_token(headers: &HeaderMap, jar: &CookieJar, cookies: &CookieConfig) -> Option<String> {
    bearer_token(headers).or_else(|| cookie_value(jar, &cookies.access_cookie_name))
}

/// Refresh token: the cookie wins over the Authorization header.
pub fn refresh_token(headers: &HeaderMap, jar: &CookieJar, cookies: &CookieConfig) -> Option<String> {
    cookie_value(jar, &cookies.refresh_cookie_name).or_else(|| bearer_token(headers))
}
