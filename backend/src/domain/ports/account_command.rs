//! Driving port for account use-cases.
//!
//! Inbound adapters hand over already-validated inputs; implementations talk
//! to the auth service and translate its failures into [`Error`].

use async_trait::async_trait;

use crate::domain::{
    EmailAddress, Error, LoginCredentials, PasswordUpdate, RegisteredAccount, Registration,
    SignedIn,
};

/// Message returned by every password reset request.
///
/// The response must not reveal whether an account exists.
pub const PASSWORD_RESET_MESSAGE: &str =
    "If an account exists for this email, a recovery link has been sent.";

/// Domain use-case port for registration, login and password management.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountCommand: Send + Sync {
    /// Create an account.
    async fn register(&self, registration: Registration) -> Result<RegisteredAccount, Error>;

    /// Authenticate credentials.
    async fn login(&self, credentials: LoginCredentials) -> Result<SignedIn, Error>;

    /// Request a recovery email. Succeeds whether or not the account exists.
    async fn request_password_reset(&self, email: &EmailAddress) -> Result<(), Error>;

    /// Set a new password for the owner of a recovery token.
    async fn update_password(&self, update: PasswordUpdate) -> Result<(), Error>;
}
