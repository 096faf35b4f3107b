//! Account primitives exchanged with the managed auth service.
//!
//! Keep inbound payload parsing outside the domain by exposing constructors
//! that validate string inputs before a handler talks to a port.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroizing;

use super::validation::{
    EmailAddress, InvalidInput, InvalidReason, Password, validate_date, validate_display_name,
    validate_email, validate_password,
};

/// Identifier issued by the auth service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Wrap an auth-service identifier.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    /// Auth service user id.
    pub id: UserId,
    /// Normalised account email.
    pub email: EmailAddress,
    /// Profile display name, when set.
    pub display_name: Option<String>,
}

/// Tokens issued by the auth service on sign-in.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSession {
    /// Bearer token for the auth service.
    pub access_token: Zeroizing<String>,
    /// Token used to renew `access_token`.
    pub refresh_token: Zeroizing<String>,
    /// Lifetime of `access_token` in seconds.
    pub expires_in: u64,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Result of a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedIn {
    /// The authenticated user.
    pub user: AuthUser,
    /// Tokens issued for this sign-in; never sent to clients.
    pub session: AuthSession,
}

/// Validated registration request.
///
/// ## Invariants
/// - `email` is trimmed, lowercased and well formed.
/// - `password` meets the minimum length policy.
/// - `display_name` is 2–50 characters, or the email local part.
/// - `birthdate` was given as `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    email: EmailAddress,
    password: Password,
    display_name: String,
    birthdate: NaiveDate,
}

impl Registration {
    /// Validate raw registration fields in a fixed order: email, password,
    /// display name, birthdate.
    pub fn try_from_parts(
        email: Option<&str>,
        password: Option<&str>,
        display_name: Option<&str>,
        birthdate: Option<&str>,
    ) -> Result<Self, InvalidInput> {
        let email = validate_email(email.unwrap_or_default())?;
        let password = validate_password(password.unwrap_or_default())?;
        let display_name = validate_display_name(display_name, &email)?;
        let birthdate = validate_date(birthdate.unwrap_or_default(), "birthdate")?;
        Ok(Self {
            email,
            password,
            display_name,
            birthdate,
        })
    }

    /// Normalised email.
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Password to forward to the auth service.
    pub fn password(&self) -> &Password {
        &self.password
    }

    /// Display name stored as profile metadata.
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Birthdate stored as profile metadata.
    pub fn birthdate(&self) -> NaiveDate {
        self.birthdate
    }
}

/// Account created by a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredAccount {
    /// New user id.
    pub id: UserId,
    /// Email the account was created with.
    pub email: EmailAddress,
    /// Display name stored in the profile metadata.
    pub display_name: String,
}

/// Validated login credentials.
///
/// The password is only checked for presence: accounts created under the
/// older six-character policy must still be able to sign in.
///
/// # Examples
/// ```
/// use canopy::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts(Some(" Ana@Example.com "), Some("secret")).unwrap();
/// assert_eq!(creds.email().as_ref(), "ana@example.com");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    email: EmailAddress,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw email/password inputs.
    pub fn try_from_parts(
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self, InvalidInput> {
        let email = validate_email(email.unwrap_or_default())?;
        let password = password.unwrap_or_default();
        if password.trim().is_empty() {
            return Err(InvalidInput::new(
                "password",
                InvalidReason::Missing,
                "password is required",
            ));
        }
        Ok(Self {
            email,
            password: Zeroizing::new(password.trim().to_owned()),
        })
    }

    /// Normalised email.
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Password provided by the caller.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Validated password change backed by a recovery access token.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordUpdate {
    access_token: Zeroizing<String>,
    password: Password,
}

impl PasswordUpdate {
    /// Validate the token presence and the new password.
    pub fn try_from_parts(
        access_token: Option<&str>,
        new_password: Option<&str>,
    ) -> Result<Self, InvalidInput> {
        let access_token = access_token.map(str::trim).unwrap_or_default();
        if access_token.is_empty() {
            return Err(InvalidInput::new(
                "accessToken",
                InvalidReason::Missing,
                "accessToken is required",
            ));
        }
        let password = validate_password(new_password.unwrap_or_default())?;
        Ok(Self {
            access_token: Zeroizing::new(access_token.to_owned()),
            password,
        })
    }

    /// Recovery token issued by the auth service.
    pub fn access_token(&self) -> &str {
        self.access_token.as_str()
    }

    /// New password.
    pub fn password(&self) -> &Password {
        &self.password
    }
}

impl fmt::Debug for PasswordUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordUpdate(<redacted>)")
    }
}
