//! Stateless access/refresh token issuance and validation.
//!
//! Tokens are HS256 JWTs. The subject is the account email. Nothing is
//! stored server-side; a token is valid while its signature checks out and
//! `exp` lies in the future.

use crate::config::AuthConfig;
use crate::error::{AppError, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub token_type: TokenType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authorities: Vec<String>,
}

/// Result of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedToken {
    pub subject: String,
    pub authorities: Vec<String>,
    pub token_type: TokenType,
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: chrono::Duration,
    refresh_ttl: chrono::Duration,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(&config.jwt_secret),
            decoding_key: DecodingKey::from_secret(&config.jwt_secret),
            validation,
            access_ttl: to_chrono(config.access_token_ttl),
            refresh_ttl: to_chrono(config.refresh_token_ttl),
        }
    }

    /// Lifetimes may be negative; tests use that to mint already-expired tokens.
    pub fn with_lifetimes(
        secret: &[u8],
        access_ttl: chrono::Duration,
        refresh_ttl: chrono::Duration,
    ) -> Self {
        let mut service = Self::new(&AuthConfig {
            jwt_secret: secret.to_vec(),
            access_token_ttl: Duration::ZERO,
            refresh_token_ttl: Duration::ZERO,
        });
        service.access_ttl = access_ttl;
        service.refresh_ttl = refresh_ttl;
        service
    }

    pub fn access_ttl(&self) -> chrono::Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> chrono::Duration {
        self.refresh_ttl
    }

    pub fn issue_access_token(&self, email: &str, authorities: &[String]) -> Result<String> {
        self.issue(email, TokenType::Access, authorities.to_vec(), self.access_ttl)
    }

    pub fn issue_refresh_token(&self, email: &str) -> Result<String> {
        self.issue(email, TokenType::Refresh, Vec::new(), self.refresh_ttl)
    }

    fn issue(
        &self,
        email: &str,
        token_type: TokenType,
        authorities: Vec<String>,
        ttl: chrono::Duration,
    ) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: email.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            token_type,
            authorities,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("JWT encoding error: {}", e)))
    }

    /// Verify signature and expiry. Fails closed: anything wrong yields `None`.
    pub fn validate(&self, token: &str) -> Option<ValidatedToken> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) if !data.claims.sub.is_empty() => Some(ValidatedToken {
                subject: data.claims.sub,
                authorities: data.claims.authorities,
                token_type: data.claims.token_type,
            }),
            Ok(_) => {
                tracing::debug!("Rejected token with empty subject");
                None
            }
            Err(e) => {
                tracing::debug!("Rejected token: {}", e);
                None
            }
        }
    }

    pub fn validate_access(&self, token: &str) -> Option<ValidatedToken> {
        self.validate(token)
            .filter(|validated| validated.token_type == TokenType::Access)
    }

    pub fn validate_refresh(&self, token: &str) -> Option<ValidatedToken> {
        self.validate(token)
            .filter(|validated| validated.token_type == TokenType::Refresh)
    }

    pub fn subject_from_token(&self, token: &str) -> Option<String> {
        self.validate(token).map(|validated| validated.subject)
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"unit-test-secret-that-is-long-enough-0123456789";

    fn service() -> TokenService {
        TokenService::with_lifetimes(
            SECRET,
            chrono::Duration::minutes(15),
            chrono::Duration::hours(24),
        )
    }

    #[test]
    fn test_access_token_round_trip() {
        let service = service();
        let authorities = vec!["USER".to_string(), "SHELTER".to_string()];
        let token = service
            .issue_access_token("user@x.com", &authorities)
            .unwrap();

        let validated = service.validate(&token).unwrap();
        assert_eq!(validated.subject, "user@x.com");
        assert_eq!(validated.authorities, authorities);
        assert_eq!(validated.token_type, TokenType::Access);
        assert_eq!(
            service.subject_from_token(&token).as_deref(),
            Some("user@x.com")
        );
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let service = service();
        let refresh = service.issue_refresh_token("user@x.com").unwrap();

        assert!(service.validate_refresh(&refresh).is_some());
        assert!(service.validate_access(&refresh).is_none());

        let access = service.issue_access_token("user@x.com", &[]).unwrap();
        assert!(service.validate_refresh(&access).is_none());
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let service = TokenService::with_lifetimes(
            SECRET,
            chrono::Duration::seconds(-30),
            chrono::Duration::seconds(-30),
        );
        let token = service.issue_access_token("user@x.com", &[]).unwrap();
        assert!(service.validate(&token).is_none());
    }

    #[test]
    fn test_tampered_signature_is_invalid() {
        let service = service();
        let token = service.issue_access_token("user@x.com", &[]).unwrap();

        let (unsigned, signature) = token.rsplit_once('.').unwrap();
        let mut chars: Vec<char> = signature.chars().collect();
        chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
        let tampered = format!("{}.{}", unsigned, chars.into_iter().collect::<String>());

        assert!(service.validate(&tampered).is_none());
    }

    #[test]
    fn test_token_signed_with_other_secret_is_invalid() {
        let other = TokenService::with_lifetimes(
            b"a-completely-different-secret-key-for-signing",
            chrono::Duration::minutes(15),
            chrono::Duration::hours(24),
        );
        let token = other.issue_access_token("user@x.com", &[]).unwrap();
        assert!(service().validate(&token).is_none());
    }

    #[test]
    fn test_garbage_is_invalid() {
        let service = service();
        assert!(service.validate("").is_none());
        assert!(service.validate("not.a.jwt").is_none());
        assert!(service.validate("Bearer abc").is_none());
    }
}
