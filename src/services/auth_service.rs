use crate::error::{AppError, Result};
use crate::models::{Account, Profile, ProfileType};
use crate::repositories::AccountRepository;
use crate::services::account_service::normalize_email;
use argon2::{password_hash::PasswordHash, Argon2, PasswordVerifier};
use std::sync::Arc;

pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Outcome of a successful credential check.
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount {
    pub account: Account,
    /// Non-deleted profiles, ADMIN excluded
    pub profiles: Vec<Profile>,
}

impl AuthenticatedAccount {
    pub fn authorities(&self) -> Vec<String> {
        self.profiles.iter().map(Profile::authority).collect()
    }
}

/// Identity bound to a request once its access token checks out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentAccount {
    pub account_id: i64,
    pub email: String,
    pub authorities: Vec<String>,
}

pub struct AuthService {
    account_repository: Arc<dyn AccountRepository>,
}

impl AuthService {
    pub fn new(account_repository: Arc<dyn AccountRepository>) -> Self {
        Self { account_repository }
    }

    /// Check email/password. Unknown email, wrong password, blocked and
    /// deleted accounts all fail with the same generic error.
    pub async fn authenticate(&self, request: LoginRequest) -> Result<AuthenticatedAccount> {
        let account = self
            .account_repository
            .find_by_email(&normalize_email(&request.email))
            .await?
            .ok_or_else(AppError::authentication)?;

        if !self.verify_password(&request.password, &account.password_hash) {
            return Err(AppError::authentication());
        }

        if !account.is_available() {
            tracing::info!("Login refused for unavailable account {}", account.id);
            return Err(AppError::authentication());
        }

        let profiles = self.grantable_profiles(account.id).await?;
        self.account_repository
            .update_last_login(account.id)
            .await?;

        Ok(AuthenticatedAccount { account, profiles })
    }

    /// Re-resolve a refresh token subject to a live account.
    ///
    /// Unlike login, an unavailable account is reported as such (403).
    pub async fn refresh(&self, subject: &str) -> Result<AuthenticatedAccount> {
        let account = self
            .account_repository
            .find_by_email(subject)
            .await?
            .ok_or_else(AppError::unauthenticated)?;

        if !account.is_available() {
            return Err(AppError::account_unavailable());
        }

        let profiles = self.grantable_profiles(account.id).await?;
        Ok(AuthenticatedAccount { account, profiles })
    }

    /// Identity lookup used by the per-request authentication filter.
    ///
    /// Authorities come from the account's current profiles, not from the
    /// token, so grants and deletions apply to tokens already issued.
    pub async fn load_principal(&self, subject: &str) -> Result<CurrentAccount> {
        let account = self
            .account_repository
            .find_by_email(subject)
            .await?
            .ok_or_else(AppError::unauthenticated)?;

        if account.email != subject {
            return Err(AppError::unauthenticated());
        }

        if !account.is_available() {
            return Err(AppError::account_unavailable());
        }

        let authorities = self
            .grantable_profiles(account.id)
            .await?
            .iter()
            .map(Profile::authority)
            .collect();

        Ok(CurrentAccount {
            account_id: account.id,
            email: account.email,
            authorities,
        })
    }

    pub async fn get_account(&self, account_id: i64) -> Result<Account> {
        self.account_repository
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| AppError::not_found("account", "Account not found"))
    }

    async fn grantable_profiles(&self, account_id: i64) -> Result<Vec<Profile>> {
        let profiles = self
            .account_repository
            .find_active_profiles(account_id)
            .await?;

        Ok(profiles
            .into_iter()
            .filter(|profile| !profile.is_deleted && profile.profile_type != ProfileType::Admin)
            .collect())
    }

    fn verify_password(&self, password: &str, password_hash: &str) -> bool {
        if let Ok(parsed_hash) = PasswordHash::new(password_hash) {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok()
        } else {
            false
        }
    }
}
