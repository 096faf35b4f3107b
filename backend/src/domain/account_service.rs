//! Account use-cases backed by the managed auth service.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::ports::{AccountCommand, AuthGateway, AuthGatewayError};
use crate::domain::{
    EmailAddress, Error, LoginCredentials, PasswordUpdate, RegisteredAccount, Registration,
    SignedIn,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password.";
const EMAIL_NOT_CONFIRMED: &str = "Please confirm your email address before logging in.";
const ALREADY_REGISTERED: &str = "An account with this email already exists.";
const INVALID_TOKEN: &str = "The recovery link is invalid or has expired.";

/// Account service implementing [`AccountCommand`].
#[derive(Clone)]
pub struct AccountService<A> {
    auth: Arc<A>,
}

impl<A> AccountService<A> {
    /// Create a service over the auth gateway.
    pub fn new(auth: Arc<A>) -> Self {
        Self { auth }
    }
}

/// Collaborator failures shared by every use-case.
fn map_unavailable(error: AuthGatewayError) -> Error {
    Error::internal(format!("auth service failure: {error}"))
}

fn map_registration_error(error: AuthGatewayError) -> Error {
    match error {
        AuthGatewayError::AlreadyRegistered => Error::invalid_request(ALREADY_REGISTERED),
        AuthGatewayError::Rejected { message } => Error::invalid_request(message),
        other => map_unavailable(other),
    }
}

fn map_login_error(error: AuthGatewayError) -> Error {
    match error {
        AuthGatewayError::InvalidCredentials | AuthGatewayError::Rejected { .. } => {
            Error::unauthorized(INVALID_CREDENTIALS)
        }
        AuthGatewayError::EmailNotConfirmed => Error::unauthorized(EMAIL_NOT_CONFIRMED),
        other => map_unavailable(other),
    }
}

fn map_password_update_error(error: AuthGatewayError) -> Error {
    match error {
        AuthGatewayError::InvalidToken => Error::unauthorized(INVALID_TOKEN),
        AuthGatewayError::Rejected { message } => Error::invalid_request(message),
        other => map_unavailable(other),
    }
}

#[async_trait]
impl<A> AccountCommand for AccountService<A>
where
    A: AuthGateway,
{
    async fn register(&self, registration: Registration) -> Result<RegisteredAccount, Error> {
        let account = self
            .auth
            .sign_up(&registration)
            .await
            .map_err(map_registration_error)?;
        info!(user_id = %account.id, "account registered");
        Ok(account)
    }

    async fn login(&self, credentials: LoginCredentials) -> Result<SignedIn, Error> {
        let signed_in = self
            .auth
            .sign_in(&credentials)
            .await
            .map_err(map_login_error)?;
        info!(user_id = %signed_in.user.id, "user signed in");
        Ok(signed_in)
    }

    async fn request_password_reset(&self, email: &EmailAddress) -> Result<(), Error> {
        // The outcome is never reported back: callers must not learn whether
        // the account exists.
        if let Err(error) = self.auth.request_password_reset(email).await {
            warn!(%error, "password reset request failed");
        }
        Ok(())
    }

    async fn update_password(&self, update: PasswordUpdate) -> Result<(), Error> {
        let user = self
            .auth
            .verify_token(update.access_token())
            .await
            .map_err(map_password_update_error)?;
        self.auth
            .update_password(&user.id, update.password())
            .await
            .map_err(map_password_update_error)?;
        info!(user_id = %user.id, "password updated");
        Ok(())
    }
}
