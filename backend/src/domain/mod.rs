//! Domain primitives, validators and use-case services.
//!
//! Purpose: validate untrusted input, shape tree and account data on its way
//! to the external collaborators, and derive chart statistics. Nothing here
//! performs I/O directly; adapters reach the outside world through
//! [`ports`].
//!
//! Public surface:
//! - Error / ErrorCode — transport-agnostic failure payload.
//! - validation — field validators failing with `InvalidInput`.
//! - trees / accounts — validated inputs and records.
//! - stats — monthly counts, species ranking and the hours estimate.
//! - TreeService / AccountService — implementations of the driving ports.

pub mod account_service;
pub mod accounts;
pub mod error;
pub mod ports;
pub mod stats;
pub mod trace_id;
pub mod tree_service;
pub mod trees;
pub mod validation;

pub use self::account_service::AccountService;
pub use self::accounts::{
    AuthSession, AuthUser, LoginCredentials, PasswordUpdate, RegisteredAccount, Registration,
    SignedIn, UserId,
};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::tree_service::TreeService;
pub use self::trees::{
    NewTreeRecord, PhotoPath, PhotoUpload, PhotoUrlChange, PlantedTree, TreeChanges, TreeDraft,
    TreeId, TreeListQuery, TreeOrder,
};
pub use self::validation::{EmailAddress, InvalidInput, InvalidReason, Password};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use canopy::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::unauthorized("login required"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
