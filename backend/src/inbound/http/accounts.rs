//! Account API handlers.
//!
//! ```text
//! POST /api/v1/register {"email":"ana@example.com","password":"longenough1","birthdate":"1990-04-01"}
//! POST /api/v1/login {"email":"ana@example.com","password":"longenough1"}
//! POST /api/v1/logout
//! GET  /api/v1/me
//! POST /api/v1/password/forgot {"email":"ana@example.com"}
//! POST /api/v1/password/update {"accessToken":"...","newPassword":"longenough2"}
//! ```
//!
//! Credentials live with the managed auth service. A successful login stores
//! only the user's identity in the encrypted session cookie.

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::ports::PASSWORD_RESET_MESSAGE;
use crate::domain::validation::validate_email;
use crate::domain::{
    AuthUser, Error, LoginCredentials, PasswordUpdate, RegisteredAccount, Registration,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Confirmation returned after a password change.
pub const PASSWORD_UPDATED_MESSAGE: &str = "Password updated.";

/// Confirmation returned after logout.
pub const LOGGED_OUT_MESSAGE: &str = "Logged out.";

/// Request body for `POST /api/v1/register`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Account email; trimmed and lowercased.
    #[schema(example = "ana@example.com")]
    pub email: Option<String>,
    /// At least 8 characters.
    #[schema(example = "longenough1")]
    pub password: Option<String>,
    /// Defaults to the part of the email before `@`.
    #[serde(alias = "display_name")]
    #[schema(example = "Ana")]
    pub display_name: Option<String>,
    /// `YYYY-MM-DD`.
    #[schema(example = "1990-04-01")]
    pub birthdate: Option<String>,
}

/// Request body for `POST /api/v1/login`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct LoginRequest {
    /// Account email.
    #[schema(example = "ana@example.com")]
    pub email: Option<String>,
    /// Account password.
    pub password: Option<String>,
}

/// Request body for `POST /api/v1/password/forgot`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ForgotPasswordRequest {
    /// Where to send the recovery link.
    #[schema(example = "ana@example.com")]
    pub email: Option<String>,
}

/// Request body for `POST /api/v1/password/update`.
///
/// `accessToken` is the recovery token delivered in the reset link.
#[derive(Debug, Clone, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    /// Recovery token; `access_token` is accepted too.
    #[serde(alias = "access_token")]
    pub access_token: Option<String>,
    /// At least 8 characters; `new_password` is accepted too.
    #[serde(alias = "new_password")]
    pub new_password: Option<String>,
}

/// Account created by a registration.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    /// Auth service user id.
    pub id: Uuid,
    /// Normalised email.
    #[schema(example = "ana@example.com")]
    pub email: String,
    /// Stored display name.
    #[schema(example = "Ana")]
    pub display_name: String,
}

impl From<RegisteredAccount> for AccountResponse {
    fn from(account: RegisteredAccount) -> Self {
        Self {
            id: *account.id.as_uuid(),
            email: account.email.to_string(),
            display_name: account.display_name,
        }
    }
}

/// Signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// Auth service user id.
    pub id: Uuid,
    /// Account email.
    #[schema(example = "ana@example.com")]
    pub email: String,
    /// Display name from the profile metadata.
    pub display_name: Option<String>,
}

impl From<AuthUser> for UserResponse {
    fn from(user: AuthUser) -> Self {
        Self {
            id: *user.id.as_uuid(),
            email: user.email.to_string(),
            display_name: user.display_name,
        }
    }
}

/// Plain confirmation message.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MessageResponse {
    /// Text for the user.
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> web::Json<Self> {
        web::Json(Self {
            message: message.to_owned(),
        })
    }
}

/// Create an account with the managed auth service.
#[utoipa::path(
    post,
    path = "/api/v1/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AccountResponse),
        (status = 400, description = "Invalid or already registered", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["accounts"],
    operation_id = "register",
    security([])
)]
pub async fn register(
    state: web::Data<HttpState>,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let request = payload.into_inner();
    let registration = Registration::try_from_parts(
        request.email.as_deref(),
        request.password.as_deref(),
        request.display_name.as_deref(),
        request.birthdate.as_deref(),
    )?;
    let account = state.accounts.register(registration).await?;
    Ok(HttpResponse::Created().json(AccountResponse::from(account)))
}

/// Authenticate and establish a session.
#[utoipa::path(
    post,
    path = "/api/v1/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", body = UserResponse,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Invalid credentials or unconfirmed email", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["accounts"],
    operation_id = "login",
    security([])
)]
pub async fn login(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<LoginRequest>,
) -> ApiResult<web::Json<UserResponse>> {
    let request = payload.into_inner();
    let credentials =
        LoginCredentials::try_from_parts(request.email.as_deref(), request.password.as_deref())?;
    let signed_in = state.accounts.login(credentials).await?;
    session.persist_user(&signed_in.user)?;
    Ok(web::Json(signed_in.user.into()))
}

/// End the session. Succeeds whether or not one exists.
#[utoipa::path(
    post,
    path = "/api/v1/logout",
    responses((status = 200, description = "Session cleared", body = MessageResponse)),
    tags = ["accounts"],
    operation_id = "logout",
    security([])
)]
pub async fn logout(session: SessionContext) -> web::Json<MessageResponse> {
    session.clear();
    MessageResponse::new(LOGGED_OUT_MESSAGE)
}

/// Return the signed-in user.
#[utoipa::path(
    get,
    path = "/api/v1/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["accounts"],
    operation_id = "currentUser"
)]
pub async fn current_user(session: SessionContext) -> ApiResult<web::Json<UserResponse>> {
    let user = session.require_user()?;
    Ok(web::Json(user.into()))
}

/// Ask the auth service to email a recovery link.
///
/// The answer is identical whether or not the account exists.
#[utoipa::path(
    post,
    path = "/api/v1/password/forgot",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Request accepted", body = MessageResponse),
        (status = 400, description = "Invalid email", body = Error)
    ),
    tags = ["accounts"],
    operation_id = "forgotPassword",
    security([])
)]
pub async fn forgot_password(
    state: web::Data<HttpState>,
    payload: web::Json<ForgotPasswordRequest>,
) -> ApiResult<web::Json<MessageResponse>> {
    let email = validate_email(payload.email.as_deref().unwrap_or_default())?;
    state.accounts.request_password_reset(&email).await?;
    Ok(MessageResponse::new(PASSWORD_RESET_MESSAGE))
}

/// Set a new password using a recovery token.
#[utoipa::path(
    post,
    path = "/api/v1/password/update",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Invalid or expired token", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["accounts"],
    operation_id = "updatePassword",
    security([])
)]
pub async fn update_password(
    state: web::Data<HttpState>,
    payload: web::Json<UpdatePasswordRequest>,
) -> ApiResult<web::Json<MessageResponse>> {
    let request = payload.into_inner();
    let update = PasswordUpdate::try_from_parts(
        request.access_token.as_deref(),
        request.new_password.as_deref(),
    )?;
    state.accounts.update_password(update).await?;
    Ok(MessageResponse::new(PASSWORD_UPDATED_MESSAGE))
}

#[cfg(test)]
#[path = "accounts_tests.rs"]
mod tests;
