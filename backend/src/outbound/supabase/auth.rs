//! GoTrue-backed auth gateway.
//!
//! Sign-up, sign-in and recovery use the public endpoints with the service
//! key as `apikey`. Password changes go through the admin API after the
//! recovery token has been resolved to a user.

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use tracing::warn;

use super::client::{Reply, SupabaseClient, execute};
use super::dto::{
    CredentialsDto, GoTrueErrorDto, PasswordChangeDto, ProfileMetadataDto, RecoverRequestDto,
    SessionDto, SignUpRequestDto, SignUpResponseDto, UserDto,
};
use super::errors::{
    TransportFailure, body_preview, classify_transport, is_timeout_status, status_message,
};
use crate::domain::ports::{AuthGateway, AuthGatewayError};
use crate::domain::{
    AuthUser, EmailAddress, LoginCredentials, Password, RegisteredAccount, Registration, SignedIn,
    UserId,
};

/// Auth gateway speaking to `/auth/v1`.
#[derive(Debug, Clone)]
pub struct SupabaseAuthGateway {
    client: SupabaseClient,
    password_reset_redirect: Option<Url>,
}

impl SupabaseAuthGateway {
    /// Build the gateway; recovery emails link to `password_reset_redirect`
    /// when set, else to the project's site URL.
    pub fn new(client: SupabaseClient, password_reset_redirect: Option<Url>) -> Self {
        Self {
            client,
            password_reset_redirect,
        }
    }

    fn auth_url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        self.client.endpoint(["auth", "v1"].into_iter().chain(segments))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Reply, AuthGatewayError> {
        execute(request)
            .await
            .map_err(|error| map_transport_error(&error))
    }
}

#[async_trait]
impl AuthGateway for SupabaseAuthGateway {
    async fn sign_up(
        &self,
        registration: &Registration,
    ) -> Result<RegisteredAccount, AuthGatewayError> {
        let body = SignUpRequestDto {
            email: registration.email().as_ref(),
            password: registration.password().expose(),
            data: ProfileMetadataDto {
                display_name: registration.display_name(),
                birthdate: registration.birthdate(),
            },
        };
        let request = self
            .client
            .request(Method::POST, self.auth_url(["signup"]))
            .json(&body);
        let reply = self.send(request).await?;
        if !reply.status.is_success() {
            return Err(map_sign_up_error(reply.status, &reply.body));
        }

        let user = decode::<SignUpResponseDto>(&reply.body)?.into_user();
        if user.is_obfuscated_duplicate() {
            return Err(AuthGatewayError::already_registered());
        }
        let display_name = user
            .display_name()
            .unwrap_or_else(|| registration.display_name().to_owned());
        Ok(RegisteredAccount {
            id: UserId::from_uuid(user.id),
            email: registration.email().clone(),
            display_name,
        })
    }

    async fn sign_in(&self, credentials: &LoginCredentials) -> Result<SignedIn, AuthGatewayError> {
        let body = CredentialsDto {
            email: credentials.email().as_ref(),
            password: credentials.password(),
        };
        let request = self
            .client
            .request(Method::POST, self.auth_url(["token"]))
            .query(&[("grant_type", "password")])
            .json(&body);
        let reply = self.send(request).await?;
        if !reply.status.is_success() {
            return Err(map_sign_in_error(reply.status, &reply.body));
        }

        let (user, session) = decode::<SessionDto>(&reply.body)?.into_parts();
        let user = user.into_auth_user().map_err(AuthGatewayError::unexpected)?;
        Ok(SignedIn { user, session })
    }

    async fn request_password_reset(&self, email: &EmailAddress) -> Result<(), AuthGatewayError> {
        let mut request = self
            .client
            .request(Method::POST, self.auth_url(["recover"]))
            .json(&RecoverRequestDto {
                email: email.as_ref(),
            });
        if let Some(redirect) = &self.password_reset_redirect {
            request = request.query(&[("redirect_to", redirect.as_str())]);
        }
        let reply = self.send(request).await?;
        if reply.status.is_success() {
            Ok(())
        } else {
            Err(map_generic_error(reply.status, &reply.body))
        }
    }

    async fn verify_token(&self, access_token: &str) -> Result<AuthUser, AuthGatewayError> {
        let request = self
            .client
            .request_as(Method::GET, self.auth_url(["user"]), access_token);
        let reply = self.send(request).await?;
        if !reply.status.is_success() {
            return Err(map_token_error(reply.status, &reply.body));
        }
        decode::<UserDto>(&reply.body)?
            .into_auth_user()
            .map_err(AuthGatewayError::unexpected)
    }

    async fn update_password(
        &self,
        user: &UserId,
        password: &Password,
    ) -> Result<(), AuthGatewayError> {
        let user_id = user.to_string();
        let request = self
            .client
            .request(
                Method::PUT,
                self.auth_url(["admin", "users", user_id.as_str()]),
            )
            .json(&PasswordChangeDto {
                password: password.expose(),
            });
        let reply = self.send(request).await?;
        if reply.status.is_success() {
            Ok(())
        } else {
            Err(map_generic_error(reply.status, &reply.body))
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, AuthGatewayError> {
    serde_json::from_slice(body).map_err(|error| {
        AuthGatewayError::unexpected(format!(
            "undecodable auth payload ({error}): {}",
            body_preview(body)
        ))
    })
}

fn map_transport_error(error: &reqwest::Error) -> AuthGatewayError {
    match classify_transport(error) {
        (TransportFailure::Timeout, message) => AuthGatewayError::timeout(message),
        (TransportFailure::Connection, message) => AuthGatewayError::connection(message),
    }
}

/// Statuses every endpoint treats alike. Only client errors GoTrue tags with
/// a user-facing code become [`AuthGatewayError::Rejected`]; the message is
/// ours, never the upstream body.
fn map_generic_error(status: StatusCode, body: &[u8]) -> AuthGatewayError {
    if is_timeout_status(status) {
        return AuthGatewayError::timeout(status_message(status, body));
    }
    if status.is_client_error() {
        let error = GoTrueErrorDto::parse(body);
        if let Some(message) = user_facing_rejection(status, error.code()) {
            return AuthGatewayError::rejected(message);
        }
    }
    warn!(status = status.as_u16(), "auth service refused the request");
    AuthGatewayError::unexpected(status_message(status, body))
}

fn user_facing_rejection(status: StatusCode, code: Option<&str>) -> Option<&'static str> {
    match code {
        Some("weak_password") => Some("Password is too weak. Choose a longer, less common one."),
        Some("same_password") => Some("The new password must differ from the current one."),
        Some("validation_failed" | "email_address_invalid") => {
            Some("The email address or password was not accepted.")
        }
        Some("signup_disabled") => Some("Registration is currently closed."),
        Some("over_request_rate_limit" | "over_email_send_rate_limit") => Some(RATE_LIMITED),
        _ if status == StatusCode::TOO_MANY_REQUESTS => Some(RATE_LIMITED),
        _ => None,
    }
}

const RATE_LIMITED: &str = "Too many attempts. Please try again later.";

fn map_sign_up_error(status: StatusCode, body: &[u8]) -> AuthGatewayError {
    let error = GoTrueErrorDto::parse(body);
    if status.is_client_error()
        && (error.mentions("already registered") || error.mentions("user_already_exists"))
    {
        return AuthGatewayError::already_registered();
    }
    map_generic_error(status, body)
}

fn map_sign_in_error(status: StatusCode, body: &[u8]) -> AuthGatewayError {
    if !status.is_client_error() || is_timeout_status(status) {
        return map_generic_error(status, body);
    }
    let error = GoTrueErrorDto::parse(body);
    if error.mentions("email_not_confirmed") || error.mentions("email not confirmed") {
        AuthGatewayError::email_not_confirmed()
    } else if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
        AuthGatewayError::invalid_credentials()
    } else {
        map_generic_error(status, body)
    }
}

fn map_token_error(status: StatusCode, body: &[u8]) -> AuthGatewayError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
            AuthGatewayError::invalid_token()
        }
        _ => map_generic_error(status, body),
    }
}
