use crate::auth::extract;
use crate::error::AppError;
use crate::services::CurrentAccount;
use crate::AppState;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

/// Bind the caller's identity to the request when it carries a usable
/// access token.
///
/// Never rejects: a missing, invalid or expired token, an unknown subject
/// or an unavailable account all leave the request unauthenticated.
/// Handlers that require an identity take [`CurrentAccount`] as an
/// extractor, which answers 401 when nothing was bound.
pub async fn authenticate_request(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.extensions().get::<CurrentAccount>().is_some() {
        return next.run(request).await;
    }

    let jar = CookieJar::from_headers(request.headers());
    let Some(token) = extract::access_token(request.headers(), &jar, &state.cookies) else {
        return next.run(request).await;
    };

    let Some(validated) = state.token_service.validate_access(&token) else {
        tracing::debug!("Ignoring invalid access token on {}", request.uri().path());
        return next.run(request).await;
    };

    match state.auth_service.load_principal(&validated.subject).await {
        Ok(current) => {
            request.extensions_mut().insert(current);
        }
        Err(e) => {
            tracing::warn!(
                "Access token for {} not bound to a live account: {}",
                validated.subject,
                e
            );
        }
    }

    next.run(request).await
}

impl<S> FromRequestParts<S> for CurrentAccount
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentAccount>()
            .cloned()
            .ok_or_else(AppError::unauthenticated)
    }
}
