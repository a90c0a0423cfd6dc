use std::env;
use std::time::Duration;

use super::env_duration_secs;

#[derive(Debug, Clone)]
pub struct VerificationConfig {
    /// Lifetime of an emailed verification token
    pub token_ttl: Duration,
    /// Window over which verification requests are counted per email
    pub rate_window: Duration,
    pub max_attempts: i64,
    /// Front-end base URL the verification link points to
    pub frontend_url: String,
}

impl VerificationConfig {
    pub fn from_env() -> Self {
        let max_attempts = env::var("VERIFICATION_MAX_ATTEMPTS")
            .ok()
            .and_then(|value| value.parse::<i64>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(3);

        Self {
            token_ttl: env_duration_secs("VERIFICATION_TOKEN_TTL_SECS", 900),
            rate_window: env_duration_secs("VERIFICATION_RATE_WINDOW_SECS", 60),
            max_attempts,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
        }
    }

    pub fn verification_url(&self, token: &str) -> String {
        format!(
            "{}/verify-email?token={}",
            self.frontend_url.trim_end_matches('/'),
            urlencoding::encode(token)
        )
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            token_ttl: Duration::from_secs(900),
            rate_window: Duration::from_secs(60),
            max_attempts: 3,
            frontend_url: "http://localhost:5173".to_string(),
        }
    }
}
