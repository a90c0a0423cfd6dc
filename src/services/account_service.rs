use crate::error::{AppError, ErrorKind, Result};
use crate::models::{Account, Profile, ProfileType};
use crate::repositories::{AccountRepository, RepositoryError};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap_or_else(|e| panic!("bad email regex: {}", e))
});

const MIN_PASSWORD_LEN: usize = 8;
const MAX_EMAIL_LEN: usize = 255;

pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub password_confirm: Option<String>,
    pub is_verified: bool,
}

pub struct AccountService {
    repository: Arc<dyn AccountRepository>,
}

impl AccountService {
    pub fn new(repository: Arc<dyn AccountRepository>) -> Self {
        Self { repository }
    }

    /// Create an account with a default USER profile.
    pub async fn register(&self, request: RegisterRequest) -> Result<(Account, Vec<Profile>)> {
        let email = normalize_email(&request.email);
        validate_email(&email)?;

        if let Some(ref confirm) = request.password_confirm {
            if request.password != *confirm {
                return Err(AppError::validation(
                    "passwordConfirm",
                    "Passwords do not match",
                ));
            }
        }

        validate_password(&request.password)?;
        let password_hash = hash_password(&request.password)?;

        let (account, profile) = self
            .repository
            .create_account(&email, &password_hash, request.is_verified, ProfileType::User)
            .await?;

        tracing::info!("Registered account {}", account.id);
        Ok((account, vec![profile]))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self.repository.find_by_email(&normalize_email(email)).await?)
    }

    pub async fn get_account(&self, account_id: i64) -> Result<Account> {
        self.repository
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| AppError::not_found("account", "Account not found"))
    }

    pub async fn list_accounts(&self, limit: Option<i64>, offset: Option<i64>) -> Result<Vec<Account>> {
        Ok(self.repository.list_accounts(limit, offset).await?)
    }

    pub async fn active_profiles(&self, account_id: i64) -> Result<Vec<Profile>> {
        Ok(self.repository.find_active_profiles(account_id).await?)
    }

    pub async fn grant_profile(
        &self,
        account_id: i64,
        name: &str,
        profile_type: ProfileType,
    ) -> Result<Profile> {
        if name.trim().is_empty() {
            return Err(AppError::validation("name", "Profile name is required"));
        }

        match self
            .repository
            .add_profile(account_id, name.trim(), profile_type)
            .await
        {
            Ok(profile) => Ok(profile),
            Err(RepositoryError::NotFound) => {
                Err(AppError::not_found("account", "Account not found"))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Record terms-of-service acceptance. Re-accepting keeps the first timestamp.
    pub async fn accept_terms(&self, account_id: i64) -> Result<Account> {
        self.repository.accept_terms(account_id).await?;
        self.get_account(account_id).await
    }

    pub async fn set_blocked(&self, account_id: i64, blocked: bool) -> Result<()> {
        Ok(self.repository.set_blocked(account_id, blocked).await?)
    }

    pub async fn soft_delete(&self, account_id: i64) -> Result<()> {
        Ok(self.repository.soft_delete(account_id).await?)
    }

    pub async fn mark_verified(&self, account_id: i64) -> Result<()> {
        Ok(self.repository.mark_verified(account_id).await?)
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

pub fn validate_email(email: &str) -> Result<()> {
    if email.is_empty() {
        return Err(AppError::validation("email", "Email is required"));
    }
    if email.len() > MAX_EMAIL_LEN || !EMAIL_PATTERN.is_match(email) {
        return Err(AppError::validation("email", "Invalid email address"));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<()> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(
            "password",
            format!("Password too weak (minimum {} characters)", MIN_PASSWORD_LEN),
        ));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::new(ErrorKind::Internal, None, format!("Password hashing failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::account_repository::MockAccountRepository;
    use chrono::Utc;
    use mockall::predicate::*;

    fn stored_account(email: &str) -> Account {
        Account {
            id: 1,
            email: email.to_string(),
            password_hash: "hash".to_string(),
            is_verified: false,
            is_blocked: false,
            is_deleted: false,
            last_login_at: None,
            terms_accepted_at: None,
            created_at: Utc::now().naive_utc(),
        }
    }

    #[tokio::test]
    async fn test_register_success_creates_user_profile() {
        let mut mock_repo = MockAccountRepository::new();

        let account = stored_account("test@example.com");
        mock_repo
            .expect_create_account()
            .with(
                eq("test@example.com"),
                always(),
                eq(false),
                eq(ProfileType::User),
            )
            .times(1)
            .returning(move |_, _, _, profile_type| {
                let account = account.clone();
                let profile = Profile {
                    id: 10,
                    account_id: account.id,
                    name: account.email.clone(),
                    profile_type,
                    is_deleted: false,
                    created_at: Utc::now().naive_utc(),
                };
                Box::pin(async move { Ok((account, profile)) })
            });
        mock_repo.expect_add_profile().times(0);

        let service = AccountService::new(Arc::new(mock_repo));

        let request = RegisterRequest {
            email: "  Test@Example.com ".to_string(),
            password: "password123".to_string(),
            password_confirm: None,
            is_verified: false,
        };

        let (account, profiles) = service.register(request).await.expect("Expected Ok result");
        assert_eq!(account.email, "test@example.com");
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].profile_type, ProfileType::User);
    }

    #[tokio::test]
    async fn test_register_weak_password() {
        let mock_repo = MockAccountRepository::new();
        let service = AccountService::new(Arc::new(mock_repo));

        let request = RegisterRequest {
            email: "test@example.com".to_string(),
            password: "short".to_string(),
            password_confirm: None,
            is_verified: false,
        };

        let err = service.register(request).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.field.as_deref(), Some("password"));
    }

    #[tokio::test]
    async fn test_register_invalid_email() {
        let mock_repo = MockAccountRepository::new();
        let service = AccountService::new(Arc::new(mock_repo));

        let request = RegisterRequest {
            email: "invalid-email".to_string(),
            password: "password123".to_string(),
            password_confirm: None,
            is_verified: false,
        };

        let err = service.register(request).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.field.as_deref(), Some("email"));
    }

    #[tokio::test]
    async fn test_register_password_mismatch() {
        let mock_repo = MockAccountRepository::new();
        let service = AccountService::new(Arc::new(mock_repo));

        let request = RegisterRequest {
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
            password_confirm: Some("password124".to_string()),
            is_verified: false,
        };

        let err = service.register(request).await.unwrap_err();
        assert_eq!(err.field.as_deref(), Some("passwordConfirm"));
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("two@@signs.com").is_err());
        assert!(validate_email(&format!("{}@x.com", "a".repeat(260))).is_err());
    }
}
