pub mod test_helpers {
    use crate::cache::InMemoryStore;
    use crate::config::{AuthConfig, CookieConfig, OriginPolicy, VerificationConfig};
    use crate::models::ProfileType;
    use crate::services::email_service::{EmailError, EmailService, OutgoingEmail};
    use crate::{AppState, StateConfig};
    use async_trait::async_trait;
    use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    pub const TEST_WEB_ORIGIN: &str = "https://app.petadopt.test";
    pub const TEST_NATIVE_ORIGIN: &str = "capacitor://localhost";
    pub const TEST_JWT_SECRET: &[u8] = b"test-secret-that-is-long-enough-for-hs256-signing";

    /// Create a new in-memory SQLite database for testing
    pub async fn create_test_db() -> Result<SqlitePool, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await?;

        // Run migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(pool)
    }

    /// Insert a test account with hashed password and a USER profile
    pub async fn insert_test_account(
        pool: &SqlitePool,
        email: &str,
        password: &str,
        verified: bool,
    ) -> Result<i64, sqlx::Error> {
        use argon2::{
            password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
            Argon2,
        };

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                sqlx::Error::Configuration(format!("Password hashing failed: {}", e).into())
            })?
            .to_string();

        let result =
            sqlx::query("INSERT INTO accounts (email, password_hash, is_verified) VALUES (?, ?, ?)")
                .bind(email)
                .bind(password_hash)
                .bind(verified)
                .execute(pool)
                .await?;
        let account_id = result.last_insert_rowid();

        insert_test_profile(pool, account_id, email, ProfileType::User).await?;

        Ok(account_id)
    }

    pub async fn insert_test_profile(
        pool: &SqlitePool,
        account_id: i64,
        name: &str,
        profile_type: ProfileType,
    ) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO profiles (account_id, name, profile_type) VALUES (?, ?, ?)")
                .bind(account_id)
                .bind(name)
                .bind(profile_type)
                .execute(pool)
                .await?;

        Ok(result.last_insert_rowid())
    }

    /// Email service that keeps every message instead of sending it.
    #[derive(Default)]
    pub struct RecordingEmailService {
        sent: Mutex<Vec<OutgoingEmail>>,
        fail: bool,
    }

    impl RecordingEmailService {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every send fails; nothing is recorded.
        pub fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn sent(&self) -> Vec<OutgoingEmail> {
            self.sent
                .lock()
                .map(|sent| sent.clone())
                .unwrap_or_default()
        }

        /// Poll until `count` messages were recorded or a second passes.
        pub async fn wait_for(&self, count: usize) -> Vec<OutgoingEmail> {
            for _ in 0..100 {
                let sent = self.sent();
                if sent.len() >= count {
                    return sent;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            self.sent()
        }
    }

    #[async_trait]
    impl EmailService for RecordingEmailService {
        async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
            if self.fail {
                return Err(EmailError::SendFailed("recording service set to fail".into()));
            }
            if let Ok(mut sent) = self.sent.lock() {
                sent.push(email.clone());
            }
            Ok(())
        }
    }

    pub fn test_state_config() -> StateConfig {
        StateConfig {
            auth: AuthConfig {
                jwt_secret: TEST_JWT_SECRET.to_vec(),
                access_token_ttl: Duration::from_secs(900),
                refresh_token_ttl: Duration::from_secs(86_400),
            },
            cookies: CookieConfig::default(),
            origins: OriginPolicy::new(&[TEST_WEB_ORIGIN], &[TEST_NATIVE_ORIGIN]),
            verification: VerificationConfig {
                frontend_url: "https://app.petadopt.test".to_string(),
                ..VerificationConfig::default()
            },
        }
    }

    /// App state over an in-memory database and store.
    pub async fn create_test_state(
        email_service: Arc<dyn EmailService>,
    ) -> Result<(AppState, Arc<InMemoryStore>), sqlx::Error> {
        let pool = create_test_db().await?;
        let store = Arc::new(InMemoryStore::new());
        let state = AppState::new(pool, store.clone(), email_service, test_state_config());
        Ok((state, store))
    }
}
