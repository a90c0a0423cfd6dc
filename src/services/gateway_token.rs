//! Cached bearer token for the transactional email gateway.
//!
//! The gateway hands out short-lived access tokens through a
//! client-credentials exchange. The token is kept in the shared key-value
//! store until shortly before it expires. Population is single-flight:
//! concurrent callers that miss the cache queue on one async mutex, and all
//! but the first find the token already cached when they get the lock.

use crate::cache::{CacheError, KeyValueStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const GATEWAY_TOKEN_KEY: &str = "email-gateway:access-token";
/// Refresh this long before the gateway-reported expiry
const EXPIRY_SKEW: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Gateway rejected credentials: HTTP {0}")]
    Rejected(u16),
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayToken {
    pub access_token: String,
    /// Lifetime in seconds as reported by the gateway
    pub expires_in: u64,
}

#[async_trait]
pub trait GatewayAuthenticator: Send + Sync {
    async fn authenticate(&self) -> Result<GatewayToken, GatewayError>;
}

/// Client-credentials exchange against `{base_url}/oauth/token`.
pub struct HttpGatewayAuthenticator {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

impl HttpGatewayAuthenticator {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

#[async_trait]
impl GatewayAuthenticator for HttpGatewayAuthenticator {
    async fn authenticate(&self) -> Result<GatewayToken, GatewayError> {
        let response = self
            .client
            .post(format!("{}/oauth/token", self.base_url))
            .json(&TokenRequest {
                grant_type: "client_credentials",
                client_id: &self.client_id,
                client_secret: &self.client_secret,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Rejected(response.status().as_u16()));
        }

        Ok(response.json::<GatewayToken>().await?)
    }
}

pub struct GatewayTokenProvider {
    store: Arc<dyn KeyValueStore>,
    authenticator: Arc<dyn GatewayAuthenticator>,
    populate_lock: Mutex<()>,
}

impl GatewayTokenProvider {
    pub fn new(store: Arc<dyn KeyValueStore>, authenticator: Arc<dyn GatewayAuthenticator>) -> Self {
        Self {
            store,
            authenticator,
            populate_lock: Mutex::new(()),
        }
    }

    pub async fn access_token(&self) -> Result<String, GatewayError> {
        if let Some(token) = self.store.get(GATEWAY_TOKEN_KEY).await? {
            return Ok(token);
        }

        let _guard = self.populate_lock.lock().await;

        // Another caller may have populated the cache while we waited
        if let Some(token) = self.store.get(GATEWAY_TOKEN_KEY).await? {
            return Ok(token);
        }

        tracing::debug!("Email gateway token missing from cache; authenticating");
        let token = self.authenticator.authenticate().await?;

        let ttl = Duration::from_secs(token.expires_in)
            .checked_sub(EXPIRY_SKEW)
            .filter(|ttl| !ttl.is_zero())
            .unwrap_or(Duration::from_secs(1));
        self.store
            .set_with_ttl(GATEWAY_TOKEN_KEY, &token.access_token, ttl)
            .await?;

        Ok(token.access_token)
    }

    /// Drop the cached token, e.g. after the gateway answered 401.
    pub async fn invalidate(&self) -> Result<(), GatewayError> {
        self.store.evict(GATEWAY_TOKEN_KEY).await?;
        Ok(())
    }
}
