use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_verified: bool,
    pub is_blocked: bool,
    pub is_deleted: bool,
    pub last_login_at: Option<NaiveDateTime>,
    pub terms_accepted_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl Account {
    /// Blocked and soft-deleted accounts must never authenticate.
    pub fn is_available(&self) -> bool {
        !self.is_blocked && !self.is_deleted
    }
}

/// Account shape returned to API clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: i64,
    pub email: String,
    pub is_verified: bool,
    pub terms_accepted_at: Option<NaiveDateTime>,
    pub last_login_at: Option<NaiveDateTime>,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            is_verified: account.is_verified,
            terms_accepted_at: account.terms_accepted_at,
            last_login_at: account.last_login_at,
        }
    }
}
