pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod services;

// Make test_utils available for both unit tests and integration tests
pub mod test_utils;

use cache::KeyValueStore;
use config::{AuthConfig, CookieConfig, OriginPolicy, VerificationConfig};
use repositories::{AccountRepository, SqliteAccountRepository};
use services::{AccountService, AuthService, EmailService, TokenService, VerificationService};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub account_service: Arc<AccountService>,
    pub auth_service: Arc<AuthService>,
    pub token_service: Arc<TokenService>,
    pub verification_service: Arc<VerificationService>,
    pub cookies: Arc<CookieConfig>,
    pub origins: Arc<OriginPolicy>,
    pub pool: sqlx::SqlitePool,
}

/// Settings the request-handling services are built from.
#[derive(Debug, Clone)]
pub struct StateConfig {
    pub auth: AuthConfig,
    pub cookies: CookieConfig,
    pub origins: OriginPolicy,
    pub verification: VerificationConfig,
}

impl From<&config::AppConfig> for StateConfig {
    fn from(config: &config::AppConfig) -> Self {
        Self {
            auth: config.auth.clone(),
            cookies: config.cookies.clone(),
            origins: config.origins.clone(),
            verification: config.verification.clone(),
        }
    }
}

impl AppState {
    pub fn new(
        pool: sqlx::SqlitePool,
        store: Arc<dyn KeyValueStore>,
        email_service: Arc<dyn EmailService>,
        config: StateConfig,
    ) -> Self {
        let account_repository: Arc<dyn AccountRepository> =
            Arc::new(SqliteAccountRepository::new(pool.clone()));

        Self {
            account_service: Arc::new(AccountService::new(account_repository.clone())),
            auth_service: Arc::new(AuthService::new(account_repository.clone())),
            token_service: Arc::new(TokenService::new(&config.auth)),
            verification_service: Arc::new(VerificationService::new(
                account_repository,
                store,
                email_service,
                config.verification,
            )),
            cookies: Arc::new(config.cookies),
            origins: Arc::new(config.origins),
            pool,
        }
    }
}
