use crate::models::{Account, Profile, ProfileType};
use async_trait::async_trait;
use sqlx::SqlitePool;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Account not found")]
    NotFound,
    #[error("Account already exists")]
    AlreadyExists,
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, is_verified, is_blocked, is_deleted, \
     last_login_at, terms_accepted_at, created_at";

const PROFILE_COLUMNS: &str = "id, account_id, name, profile_type, is_deleted, created_at";

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait AccountRepository: Send + Sync {
    /// Insert the account and its first profile in one transaction.
    async fn create_account(
        &self,
        email: &str,
        password_hash: &str,
        is_verified: bool,
        profile_type: ProfileType,
    ) -> RepositoryResult<(Account, Profile)>;
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Account>>;
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Account>>;
    async fn list_accounts(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> RepositoryResult<Vec<Account>>;
    async fn update_last_login(&self, id: i64) -> RepositoryResult<()>;
    async fn mark_verified(&self, id: i64) -> RepositoryResult<()>;
    async fn accept_terms(&self, id: i64) -> RepositoryResult<()>;
    async fn set_blocked(&self, id: i64, blocked: bool) -> RepositoryResult<()>;
    async fn soft_delete(&self, id: i64) -> RepositoryResult<()>;
    /// Non-deleted profiles of the account, oldest first.
    async fn find_active_profiles(&self, account_id: i64) -> RepositoryResult<Vec<Profile>>;
    async fn add_profile(
        &self,
        account_id: i64,
        name: &str,
        profile_type: ProfileType,
    ) -> RepositoryResult<Profile>;
}

pub struct SqliteAccountRepository {
    pool: SqlitePool,
}

impl SqliteAccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn execute_update(&self, sql: &str, id: i64) -> RepositoryResult<()> {
        let result = sqlx::query(sql).bind(id).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}

#[async_trait]
impl AccountRepository for SqliteAccountRepository {
    async fn create_account(
        &self,
        email: &str,
        password_hash: &str,
        is_verified: bool,
        profile_type: ProfileType,
    ) -> RepositoryResult<(Account, Profile)> {
        let mut tx = self.pool.begin().await?;

        let account_sql = format!(
            "INSERT INTO accounts (email, password_hash, is_verified) VALUES (?, ?, ?) RETURNING {}",
            ACCOUNT_COLUMNS
        );
        let account = sqlx::query_as::<_, Account>(&account_sql)
            .bind(email)
            .bind(password_hash)
            .bind(is_verified)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if e.to_string().contains("UNIQUE") {
                    RepositoryError::AlreadyExists
                } else {
                    RepositoryError::Database(e)
                }
            })?;

        let profile_sql = format!(
            "INSERT INTO profiles (account_id, name, profile_type) VALUES (?, ?, ?) RETURNING {}",
            PROFILE_COLUMNS
        );
        let profile = sqlx::query_as::<_, Profile>(&profile_sql)
            .bind(account.id)
            .bind(email)
            .bind(profile_type)
            .fetch_one(&mut *tx)
            .await?;

        // Dropping the transaction on any error above rolls back the account row
        tx.commit().await?;

        Ok((account, profile))
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Account>> {
        let sql = format!("SELECT {} FROM accounts WHERE email = ?", ACCOUNT_COLUMNS);
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Account>> {
        let sql = format!("SELECT {} FROM accounts WHERE id = ?", ACCOUNT_COLUMNS);
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    async fn list_accounts(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> RepositoryResult<Vec<Account>> {
        let limit = limit.unwrap_or(100);
        let offset = offset.unwrap_or(0);

        let sql = format!(
            "SELECT {} FROM accounts ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            ACCOUNT_COLUMNS
        );
        let accounts = sqlx::query_as::<_, Account>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(accounts)
    }

    async fn update_last_login(&self, id: i64) -> RepositoryResult<()> {
        self.execute_update(
            "UPDATE accounts SET last_login_at = CURRENT_TIMESTAMP WHERE id = ?",
            id,
        )
        .await
    }

    async fn mark_verified(&self, id: i64) -> RepositoryResult<()> {
        self.execute_update("UPDATE accounts SET is_verified = TRUE WHERE id = ?", id)
            .await
    }

    async fn accept_terms(&self, id: i64) -> RepositoryResult<()> {
        // First acceptance wins
        self.execute_update(
            "UPDATE accounts SET terms_accepted_at = COALESCE(terms_accepted_at, CURRENT_TIMESTAMP) WHERE id = ?",
            id,
        )
        .await
    }

    async fn set_blocked(&self, id: i64, blocked: bool) -> RepositoryResult<()> {
        let result = sqlx::query("UPDATE accounts SET is_blocked = ? WHERE id = ?")
            .bind(blocked)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn soft_delete(&self, id: i64) -> RepositoryResult<()> {
        self.execute_update("UPDATE accounts SET is_deleted = TRUE WHERE id = ?", id)
            .await
    }

    async fn find_active_profiles(&self, account_id: i64) -> RepositoryResult<Vec<Profile>> {
        let sql = format!(
            "SELECT {} FROM profiles WHERE account_id = ? AND is_deleted = FALSE ORDER BY id",
            PROFILE_COLUMNS
        );
        let profiles = sqlx::query_as::<_, Profile>(&sql)
            .bind(account_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(profiles)
    }

    async fn add_profile(
        &self,
        account_id: i64,
        name: &str,
        profile_type: ProfileType,
    ) -> RepositoryResult<Profile> {
        let sql = format!(
            "INSERT INTO profiles (account_id, name, profile_type) VALUES (?, ?, ?) RETURNING {}",
            PROFILE_COLUMNS
        );
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(account_id)
            .bind(name)
            .bind(profile_type)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if e.to_string().contains("FOREIGN KEY") {
                    RepositoryError::NotFound
                } else {
                    RepositoryError::Database(e)
                }
            })?;

        Ok(profile)
    }
}
