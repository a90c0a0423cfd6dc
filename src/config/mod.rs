pub mod auth;
pub mod origins;
pub mod verification;

use std::env;
use std::time::Duration;
use tracing::{info, warn};

pub use auth::{validate_production_config, AuthConfig, CookieConfig};
pub use origins::OriginPolicy;
pub use verification::VerificationConfig;

/// Everything the server reads from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub auth: AuthConfig,
    pub cookies: CookieConfig,
    pub origins: OriginPolicy,
    pub verification: VerificationConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://data/petadopt.db".to_string());
        let redis_url = env::var("REDIS_URL").ok().filter(|url| !url.is_empty());
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        Ok(Self {
            database_url,
            redis_url,
            host,
            port,
            auth: AuthConfig::from_env(),
            cookies: CookieConfig::from_env(),
            origins: OriginPolicy::from_env(),
            verification: VerificationConfig::from_env(),
        })
    }
}

pub(crate) fn current_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string())
}

pub(crate) fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.as_str(), "1" | "true" | "TRUE" | "True"),
        Err(_) => default,
    }
}

pub(crate) fn env_duration_secs(key: &str, default: u64) -> Duration {
    let secs = match env::var(key) {
        Ok(raw) => raw.parse::<u64>().unwrap_or_else(|e| {
            warn!("Invalid {key} value '{raw}': {e}; using default {default}");
            default
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            default
        }
    };
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_env_duration_falls_back_on_garbage() {
        env::set_var("PETADOPT_TEST_DURATION", "soon");
        assert_eq!(
            env_duration_secs("PETADOPT_TEST_DURATION", 42),
            Duration::from_secs(42)
        );
        env::set_var("PETADOPT_TEST_DURATION", "7");
        assert_eq!(
            env_duration_secs("PETADOPT_TEST_DURATION", 42),
            Duration::from_secs(7)
        );
        env::remove_var("PETADOPT_TEST_DURATION");
    }

    #[test]
    #[serial]
    fn test_env_flag_default_applies_only_when_unset() {
        env::remove_var("PETADOPT_TEST_FLAG");
        assert!(env_flag("PETADOPT_TEST_FLAG", true));
        env::set_var("PETADOPT_TEST_FLAG", "false");
        assert!(!env_flag("PETADOPT_TEST_FLAG", true));
        env::remove_var("PETADOPT_TEST_FLAG");
    }
}
