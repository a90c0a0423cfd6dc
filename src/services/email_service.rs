use crate::cache::KeyValueStore;
use crate::services::gateway_token::{GatewayError, GatewayTokenProvider, HttpGatewayAuthenticator};
use askama::Template;
use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};
use serde::Serialize;
use std::env;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Failed to build email message: {0}")]
    MessageBuild(String),
    #[error("Failed to render email template: {0}")]
    Template(#[from] askama::Error),
    #[error("Failed to send email: {0}")]
    SendFailed(String),
    #[error("Email gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// A fully rendered message ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[derive(Template)]
#[template(path = "email/verify_email.html")]
pub struct VerificationEmailTemplate<'a> {
    pub email: &'a str,
    pub verification_url: &'a str,
    pub expires_in_minutes: u64,
}

impl VerificationEmailTemplate<'_> {
    pub fn to_email(&self) -> Result<OutgoingEmail, EmailError> {
        Ok(OutgoingEmail {
            to: self.email.to_string(),
            subject: "Confirm your PetAdopt email address".to_string(),
            html_body: self.render()?,
        })
    }
}

#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError>;
}

/// Logs messages instead of sending them.
pub struct MockEmailService;

impl MockEmailService {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockEmailService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmailService for MockEmailService {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        tracing::info!("📧 [MOCK EMAIL] To: {}", email.to);
        tracing::info!("   Subject: {}", email.subject);
        tracing::debug!("   Body: {}", email.html_body);
        tracing::info!("   ---");
        Ok(())
    }
}

pub struct SmtpEmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_email: String,
    from_name: String,
}

impl SmtpEmailService {
    pub fn new() -> Result<Self, EmailError> {
        let smtp_host = env::var("SMTP_HOST")
            .map_err(|_| EmailError::ConfigError("SMTP_HOST not set".to_string()))?;
        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()
            .map_err(|_| EmailError::ConfigError("Invalid SMTP_PORT".to_string()))?;
        let smtp_username = env::var("SMTP_USERNAME")
            .map_err(|_| EmailError::ConfigError("SMTP_USERNAME not set".to_string()))?;
        let smtp_password = env::var("SMTP_PASSWORD")
            .map_err(|_| EmailError::ConfigError("SMTP_PASSWORD not set".to_string()))?;
        let (from_email, from_name) = sender_from_env()?;

        let encryption = env::var("SMTP_ENCRYPTION").unwrap_or_else(|_| "starttls".to_string());

        let credentials = Credentials::new(smtp_username, smtp_password);

        let mailer = match encryption.to_lowercase().as_str() {
            "tls" => AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp_host)
                .map_err(|e| EmailError::ConfigError(format!("SMTP relay error: {}", e)))?
                .port(smtp_port)
                .credentials(credentials)
                .build(),
            "starttls" => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp_host)
                .map_err(|e| EmailError::ConfigError(format!("SMTP starttls error: {}", e)))?
                .port(smtp_port)
                .credentials(credentials)
                .build(),
            "none" => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp_host)
                .port(smtp_port)
                .credentials(credentials)
                .build(),
            _ => {
                return Err(EmailError::ConfigError(format!(
                    "Invalid SMTP_ENCRYPTION value: {}. Use 'tls', 'starttls', or 'none'",
                    encryption
                )))
            }
        };

        Ok(Self {
            mailer,
            from_email,
            from_name,
        })
    }
}

#[async_trait]
impl EmailService for SmtpEmailService {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(
                format!("{} <{}>", self.from_name, self.from_email)
                    .parse()
                    .map_err(|e| {
                        EmailError::MessageBuild(format!("Invalid from address: {}", e))
                    })?,
            )
            .to(email
                .to
                .parse()
                .map_err(|e| EmailError::MessageBuild(format!("Invalid to address: {}", e)))?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(email.html_body.clone())
            .map_err(|e| EmailError::MessageBuild(e.to_string()))?;

        self.mailer
            .send(message)
            .await
            .map_err(|e| EmailError::SendFailed(e.to_string()))?;

        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GatewaySendRequest<'a> {
    from: GatewayAddress<'a>,
    to: [GatewayAddress<'a>; 1],
    subject: &'a str,
    html_content: &'a str,
}

#[derive(Serialize)]
struct GatewayAddress<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

/// Sends through an HTTP notification gateway authenticated with a cached
/// bearer token.
pub struct GatewayEmailService {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<GatewayTokenProvider>,
    from_email: String,
    from_name: String,
}

impl GatewayEmailService {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        tokens: Arc<GatewayTokenProvider>,
        from_email: impl Into<String>,
        from_name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
            from_email: from_email.into(),
            from_name: from_name.into(),
        }
    }

    pub fn from_env(store: Arc<dyn KeyValueStore>) -> Result<Self, EmailError> {
        let base_url = env::var("EMAIL_GATEWAY_URL")
            .map_err(|_| EmailError::ConfigError("EMAIL_GATEWAY_URL not set".to_string()))?;
        let client_id = env::var("EMAIL_GATEWAY_CLIENT_ID").map_err(|_| {
            EmailError::ConfigError("EMAIL_GATEWAY_CLIENT_ID not set".to_string())
        })?;
        let client_secret = env::var("EMAIL_GATEWAY_CLIENT_SECRET").map_err(|_| {
            EmailError::ConfigError("EMAIL_GATEWAY_CLIENT_SECRET not set".to_string())
        })?;
        let (from_email, from_name) = sender_from_env()?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| EmailError::ConfigError(format!("HTTP client error: {}", e)))?;

        let authenticator = Arc::new(HttpGatewayAuthenticator::new(
            client.clone(),
            base_url.clone(),
            client_id,
            client_secret,
        ));
        let tokens = Arc::new(GatewayTokenProvider::new(store, authenticator));

        Ok(Self::new(client, base_url, tokens, from_email, from_name))
    }

    async fn post(&self, email: &OutgoingEmail, bearer: &str) -> Result<reqwest::Response, EmailError> {
        let body = GatewaySendRequest {
            from: GatewayAddress {
                email: &self.from_email,
                name: Some(&self.from_name),
            },
            to: [GatewayAddress {
                email: &email.to,
                name: None,
            }],
            subject: &email.subject,
            html_content: &email.html_body,
        };

        self.client
            .post(format!("{}/v1/emails", self.base_url))
            .bearer_auth(bearer)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(e.to_string()))
    }
}

#[async_trait]
impl EmailService for GatewayEmailService {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        let token = self.tokens.access_token().await?;
        let mut response = self.post(email, &token).await?;

        // Cached token revoked early: drop it and retry once with a fresh one
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await?;
            let token = self.tokens.access_token().await?;
            response = self.post(email, &token).await?;
        }

        if !response.status().is_success() {
            return Err(EmailError::SendFailed(format!(
                "gateway answered HTTP {}",
                response.status()
            )));
        }

        Ok(())
    }
}

fn sender_from_env() -> Result<(String, String), EmailError> {
    let from_email = env::var("EMAIL_FROM_ADDRESS")
        .or_else(|_| env::var("SMTP_FROM_EMAIL"))
        .map_err(|_| EmailError::ConfigError("EMAIL_FROM_ADDRESS not set".to_string()))?;
    let from_name = env::var("EMAIL_FROM_NAME").unwrap_or_else(|_| "PetAdopt".to_string());
    Ok((from_email, from_name))
}

/// Gateway if configured, then SMTP, then the logging mock.
pub fn create_email_service(store: Arc<dyn KeyValueStore>) -> Arc<dyn EmailService> {
    if env::var("EMAIL_GATEWAY_URL").is_ok() {
        match GatewayEmailService::from_env(store) {
            Ok(service) => {
                tracing::info!("Using email gateway service");
                return Arc::new(service);
            }
            Err(e) => {
                tracing::warn!("Failed to initialize email gateway: {}. Trying SMTP", e);
            }
        }
    }

    if env::var("SMTP_HOST").is_ok() {
        match SmtpEmailService::new() {
            Ok(service) => {
                tracing::info!("Using SMTP email service");
                return Arc::new(service);
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to initialize SMTP email service: {}. Falling back to mock service",
                    e
                );
            }
        }
    } else {
        tracing::info!(
            "Email delivery not configured. Using mock email service (emails will be logged to console)"
        );
    }

    Arc::new(MockEmailService::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_template_embeds_url() {
        let template = VerificationEmailTemplate {
            email: "user@x.com",
            verification_url: "https://petadopt.example/verify-email?token=abc",
            expires_in_minutes: 15,
        };

        let email = template.to_email().unwrap();
        assert_eq!(email.to, "user@x.com");
        assert!(email
            .html_body
            .contains("https://petadopt.example/verify-email?token=abc"));
        assert!(email.html_body.contains("15 minutes"));
    }

    #[tokio::test]
    async fn test_mock_email_service_always_succeeds() {
        let service = MockEmailService::new();
        let email = OutgoingEmail {
            to: "user@x.com".to_string(),
            subject: "Hello".to_string(),
            html_body: "<p>Hi</p>".to_string(),
        };
        assert!(service.send(&email).await.is_ok());
    }
}
