//! Port for the managed authentication service.
//!
//! Credentials are stored and verified by the service. The domain only
//! validates input shape before calling it.

use async_trait::async_trait;

use crate::domain::{
    AuthUser, EmailAddress, LoginCredentials, Password, RegisteredAccount, Registration, SignedIn,
    UserId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by auth gateway adapters.
    pub enum AuthGatewayError {
        /// The email already belongs to an account.
        AlreadyRegistered => "user already registered",
        /// Email and password do not match an account.
        InvalidCredentials => "invalid login credentials",
        /// The account exists but its email was never confirmed.
        EmailNotConfirmed => "email not confirmed",
        /// The access token is expired, malformed or revoked.
        InvalidToken => "access token rejected",
        /// The service refused the request; `message` is safe to show users.
        Rejected { message: String } => "auth service rejected request: {message}",
        /// The service could not be reached.
        Connection { message: String } => "auth service connection failed: {message}",
        /// The service did not answer within the configured timeout.
        Timeout { message: String } => "auth service timed out: {message}",
        /// The service answered with something unexpected.
        Unexpected { message: String } => "auth service returned an unexpected response: {message}",
    }
}

/// Port for account management in the auth service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Create an account; profile fields travel as user metadata.
    async fn sign_up(
        &self,
        registration: &Registration,
    ) -> Result<RegisteredAccount, AuthGatewayError>;

    /// Exchange credentials for a session.
    async fn sign_in(&self, credentials: &LoginCredentials) -> Result<SignedIn, AuthGatewayError>;

    /// Ask the service to email a recovery link.
    async fn request_password_reset(&self, email: &EmailAddress) -> Result<(), AuthGatewayError>;

    /// Resolve the user owning an access token.
    async fn verify_token(&self, access_token: &str) -> Result<AuthUser, AuthGatewayError>;

    /// Replace the password of `user`.
    async fn update_password(
        &self,
        user: &UserId,
        password: &Password,
    ) -> Result<(), AuthGatewayError>;
}
