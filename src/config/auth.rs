use std::env;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use std::time::Duration;
use tracing::warn;

use super::{current_environment, env_duration_secs, env_flag};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

const MIN_SECRET_BYTES: usize = 32;

/// JWT signing material and token lifetimes.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: Vec<u8>,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .finish()
    }
}

impl AuthConfig {
    pub fn from_env() -> Self {
        Self {
            jwt_secret: load_jwt_secret(),
            access_token_ttl: env_duration_secs("ACCESS_TOKEN_TTL_SECS", 900),
            refresh_token_ttl: env_duration_secs("REFRESH_TOKEN_TTL_SECS", 86_400),
        }
    }
}

/// Attributes for the access/refresh cookies handed to browser clients.
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub secure: bool,
    pub access_cookie_name: String,
    pub refresh_cookie_name: String,
}

impl CookieConfig {
    pub fn from_env() -> Self {
        Self {
            secure: env_flag("COOKIE_SECURE", true),
            access_cookie_name: ACCESS_TOKEN_COOKIE.to_string(),
            refresh_cookie_name: REFRESH_TOKEN_COOKIE.to_string(),
        }
    }
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            secure: true,
            access_cookie_name: ACCESS_TOKEN_COOKIE.to_string(),
            refresh_cookie_name: REFRESH_TOKEN_COOKIE.to_string(),
        }
    }
}

/// Refuse to boot a production deployment with a weak signing secret.
pub fn validate_production_config() {
    if current_environment() != "production" {
        return;
    }

    let secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set in production");
    let decoded_secret = decode_secret_bytes(&secret);

    if decoded_secret.len() < MIN_SECRET_BYTES {
        panic!(
            "FATAL: JWT_SECRET must be at least {} bytes in production",
            MIN_SECRET_BYTES
        );
    }

    let lowered = secret.to_ascii_lowercase();
    if lowered.contains("example") || lowered.contains("changeme") || lowered.contains("default") {
        panic!("FATAL: JWT_SECRET appears to be a default value. Generate a secure secret!");
    }

    if !env_flag("COOKIE_SECURE", true) {
        panic!("FATAL: COOKIE_SECURE cannot be disabled in production");
    }
}

fn load_jwt_secret() -> Vec<u8> {
    match env::var("JWT_SECRET") {
        Ok(secret) if !secret.is_empty() => decode_secret_bytes(&secret),
        _ => {
            warn!("JWT_SECRET not set; generating ephemeral key (development only)");
            let mut key = vec![0u8; 64];
            rand::thread_rng().fill_bytes(&mut key);
            key
        }
    }
}

fn decode_secret_bytes(secret: &str) -> Vec<u8> {
    STANDARD
        .decode(secret.as_bytes())
        .unwrap_or_else(|_| secret.as_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_secret_accepts_base64_and_raw() {
        assert_eq!(decode_secret_bytes("aGVsbG8="), b"hello".to_vec());
        assert_eq!(decode_secret_bytes("not base64!"), b"not base64!".to_vec());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = AuthConfig {
            jwt_secret: b"super-secret".to_vec(),
            access_token_ttl: Duration::from_secs(900),
            refresh_token_ttl: Duration::from_secs(86_400),
        };
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("super-secret"));
    }
}
