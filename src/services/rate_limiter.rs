use crate::cache::KeyValueStore;
use crate::error::{AppError, ErrorKind, Result};
use std::sync::Arc;
use std::time::Duration;

/// Fixed-window attempt counter keyed by subject.
///
/// The counter is incremented before the limit is compared, and the
/// increment is kept even when the attempt is refused.
pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    prefix: &'static str,
    window: Duration,
    max_attempts: i64,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        prefix: &'static str,
        window: Duration,
        max_attempts: i64,
    ) -> Self {
        Self {
            store,
            prefix,
            window,
            max_attempts,
        }
    }

    fn key(&self, subject: &str) -> String {
        format!("{}:{}", self.prefix, subject)
    }

    pub async fn check(&self, subject: &str) -> Result<()> {
        let key = self.key(subject);
        let attempts = self.store.increment(&key).await?;

        if attempts == 1 {
            self.store.expire(&key, self.window).await?;
        }

        if attempts > self.max_attempts {
            tracing::warn!(
                "Rate limit exceeded for {} ({} attempts in window)",
                key,
                attempts
            );
            return Err(AppError::new(
                ErrorKind::TooManyRequests,
                Some("email"),
                "Too many requests. Please wait before trying again.",
            ));
        }

        Ok(())
    }
}
