pub mod account_service;
pub mod auth_service;
pub mod email_service;
pub mod gateway_token;
pub mod rate_limiter;
pub mod token_service;
pub mod verification_service;

pub use account_service::{AccountService, RegisterRequest};
pub use auth_service::{AuthService, AuthenticatedAccount, CurrentAccount, LoginRequest};
pub use email_service::{
    create_email_service, EmailError, EmailService, GatewayEmailService, MockEmailService,
    OutgoingEmail, SmtpEmailService,
};
pub use gateway_token::{
    GatewayAuthenticator, GatewayError, GatewayToken, GatewayTokenProvider,
    HttpGatewayAuthenticator,
};
pub use rate_limiter::RateLimiter;
pub use token_service::{TokenService, TokenType, ValidatedToken};
pub use verification_service::{Confirmation, VerificationService};
