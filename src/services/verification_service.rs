//! Email verification workflow.
//!
//! A verification request mints an opaque token, caches `token -> email`
//! for a limited time and mails a link to the account owner in the
//! background. Confirming the token flips the account's verified flag.
//! Requests are rate limited per email address, and only the most recently
//! issued token of an account stays valid.

use crate::cache::KeyValueStore;
use crate::config::VerificationConfig;
use crate::error::{AppError, ErrorKind, Result};
use crate::models::Account;
use crate::repositories::AccountRepository;
use crate::services::email_service::{EmailService, VerificationEmailTemplate};
use crate::services::rate_limiter::RateLimiter;
use rand::{rngs::OsRng, RngCore};
use serde::Serialize;
use std::sync::Arc;

const TOKEN_KEY_PREFIX: &str = "verification:token";
const LATEST_KEY_PREFIX: &str = "verification:latest";
const ATTEMPTS_KEY_PREFIX: &str = "verification:attempts";
const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    Verified,
    AlreadyVerified,
}

pub struct VerificationService {
    account_repository: Arc<dyn AccountRepository>,
    store: Arc<dyn KeyValueStore>,
    email_service: Arc<dyn EmailService>,
    rate_limiter: RateLimiter,
    config: VerificationConfig,
}

impl VerificationService {
    pub fn new(
        account_repository: Arc<dyn AccountRepository>,
        store: Arc<dyn KeyValueStore>,
        email_service: Arc<dyn EmailService>,
        config: VerificationConfig,
    ) -> Self {
        let rate_limiter = RateLimiter::new(
            store.clone(),
            ATTEMPTS_KEY_PREFIX,
            config.rate_window,
            config.max_attempts,
        );

        Self {
            account_repository,
            store,
            email_service,
            rate_limiter,
            config,
        }
    }

    /// Issue a fresh token for `account` and mail it.
    ///
    /// Returns once the token is cached; delivery happens on a spawned task
    /// and its failure is only logged.
    pub async fn request_verification(&self, account: &Account) -> Result<String> {
        if account.is_verified {
            return Err(AppError::new(
                ErrorKind::AlreadyVerified,
                Some("email"),
                "Email address is already verified",
            ));
        }

        self.rate_limiter.check(&account.email).await?;

        let token = generate_token();
        let latest_key = latest_key(&account.email);

        if let Some(previous) = self.store.get(&latest_key).await? {
            self.store.evict(&token_key(&previous)).await?;
        }

        self.store
            .set_with_ttl(&token_key(&token), &account.email, self.config.token_ttl)
            .await?;
        self.store
            .set_with_ttl(&latest_key, &token, self.config.token_ttl)
            .await?;

        let verification_url = self.config.verification_url(&token);
        let email = VerificationEmailTemplate {
            email: &account.email,
            verification_url: &verification_url,
            expires_in_minutes: self.config.token_ttl.as_secs().div_ceil(60),
        }
        .to_email()
        .map_err(|e| AppError::internal(e.to_string()))?;

        let email_service = self.email_service.clone();
        tokio::spawn(async move {
            match email_service.send(&email).await {
                Ok(()) => tracing::info!("Verification email sent to {}", email.to),
                Err(e) => tracing::error!(
                    "Failed to send verification email to {}: {}",
                    email.to,
                    e
                ),
            }
        });

        Ok(token)
    }

    /// Consume `token` on behalf of `account`.
    ///
    /// Confirming an already verified account is a no-op that still burns
    /// the token, so repeating a successful confirmation answers
    /// `AlreadyVerified` even though the token is gone by then. A cached
    /// token bound to another address is refused in every case.
    pub async fn confirm_verification(
        &self,
        token: &str,
        account: &Account,
    ) -> Result<Confirmation> {
        if !is_well_formed(token) {
            return Err(AppError::validation("token", "Malformed verification token"));
        }

        let key = token_key(token);
        let Some(email) = self.store.get(&key).await? else {
            return missing_token(account);
        };

        if email != account.email {
            tracing::warn!(
                "Verification token for another address presented by account {}",
                account.id
            );
            return Err(AppError::new(
                ErrorKind::Authentication,
                Some("token"),
                "Verification token does not belong to this account",
            ));
        }

        if account.is_verified {
            self.store.evict(&key).await?;
            return Ok(Confirmation::AlreadyVerified);
        }

        // Whoever removes the token owns the state change
        if !self.store.evict(&key).await? {
            tracing::debug!("Verification token for account {} consumed concurrently", account.id);
            return missing_token(account);
        }

        self.account_repository.mark_verified(account.id).await?;
        self.store.evict(&latest_key(&account.email)).await?;

        tracing::info!("Account {} verified its email address", account.id);
        Ok(Confirmation::Verified)
    }
}

fn missing_token(account: &Account) -> Result<Confirmation> {
    if account.is_verified {
        return Ok(Confirmation::AlreadyVerified);
    }
    Err(AppError::not_found(
        "token",
        "Verification token is invalid or has expired",
    ))
}

fn token_key(token: &str) -> String {
    format!("{}:{}", TOKEN_KEY_PREFIX, token)
}

fn latest_key(email: &str) -> String {
    format!("{}:{}", LATEST_KEY_PREFIX, email)
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_BYTES * 2 && token.bytes().all(|b| b.is_ascii_hexdigit())
}
