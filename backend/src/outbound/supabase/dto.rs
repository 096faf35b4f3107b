//! Wire shapes exchanged with PostgREST and GoTrue.
//!
//! Adapters decode into these DTOs first, then map into domain records in
//! one pass.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::domain::stats::TreeObservation;
use crate::domain::{
    AuthSession, AuthUser, EmailAddress, NewTreeRecord, PhotoUrlChange, PlantedTree, TreeChanges,
    TreeId, UserId,
};

/// Column list requested for full tree rows.
pub(super) const TREE_COLUMNS: &str = "id,species,latitude,longitude,planted_at,photo_url,planted_by_email";

#[derive(Debug, Deserialize)]
pub(super) struct TreeRowDto {
    pub(super) id: i64,
    pub(super) species: String,
    pub(super) latitude: f64,
    pub(super) longitude: f64,
    pub(super) planted_at: DateTime<Utc>,
    #[serde(default)]
    pub(super) photo_url: Option<String>,
    #[serde(default)]
    pub(super) planted_by_email: Option<String>,
}

impl From<TreeRowDto> for PlantedTree {
    fn from(row: TreeRowDto) -> Self {
        Self {
            id: TreeId::new(row.id),
            species: row.species,
            latitude: row.latitude,
            longitude: row.longitude,
            planted_at: row.planted_at,
            photo_url: row.photo_url,
            planted_by_email: row.planted_by_email.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct NewTreeRowDto<'a> {
    species: &'a str,
    latitude: f64,
    longitude: f64,
    planted_at: String,
    planted_by_email: &'a str,
}

impl<'a> From<&'a NewTreeRecord> for NewTreeRowDto<'a> {
    fn from(record: &'a NewTreeRecord) -> Self {
        Self {
            species: record.species.as_str(),
            latitude: record.latitude,
            longitude: record.longitude,
            planted_at: record
                .planted_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            planted_by_email: record.planted_by_email.as_str(),
        }
    }
}

/// PATCH body for `changes`: absent keys are left untouched by PostgREST.
pub(super) fn tree_patch(changes: &TreeChanges) -> Map<String, Value> {
    let mut body = Map::new();
    if let Some(species) = changes.species() {
        body.insert("species".to_owned(), Value::String(species.to_owned()));
    }
    match changes.photo_url() {
        PhotoUrlChange::Keep => {}
        PhotoUrlChange::Clear => {
            body.insert("photo_url".to_owned(), Value::Null);
        }
        PhotoUrlChange::Set(url) => {
            body.insert("photo_url".to_owned(), Value::String(url.clone()));
        }
    }
    body
}

/// Loosely typed row for statistics; either column may be missing or null.
#[derive(Debug, Deserialize)]
pub(super) struct ObservationRowDto {
    #[serde(default)]
    species: Option<Value>,
    #[serde(default)]
    planted_at: Option<Value>,
}

impl From<ObservationRowDto> for TreeObservation {
    fn from(row: ObservationRowDto) -> Self {
        Self {
            species: row.species.and_then(text_value),
            planted_at: row.planted_at.and_then(text_value),
        }
    }
}

fn text_value(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        _ => None,
    }
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`.
pub(super) fn parse_content_range_total(header: &str) -> Option<u64> {
    let (_, total) = header.rsplit_once('/')?;
    total.trim().parse().ok()
}

/// Last row index of a `Content-Range` such as `1000-1999/4312`; `None` for
/// empty ranges (`*/0`).
pub(super) fn parse_content_range_end(header: &str) -> Option<u64> {
    let (range, _) = header.split_once('/')?;
    let (_, last) = range.split_once('-')?;
    last.trim().parse().ok()
}

#[derive(Debug, Serialize)]
pub(super) struct CredentialsDto<'a> {
    pub(super) email: &'a str,
    pub(super) password: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct SignUpRequestDto<'a> {
    pub(super) email: &'a str,
    pub(super) password: &'a str,
    pub(super) data: ProfileMetadataDto<'a>,
}

#[derive(Debug, Serialize)]
pub(super) struct ProfileMetadataDto<'a> {
    pub(super) display_name: &'a str,
    pub(super) birthdate: NaiveDate,
}

#[derive(Debug, Serialize)]
pub(super) struct RecoverRequestDto<'a> {
    pub(super) email: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct PasswordChangeDto<'a> {
    pub(super) password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct UserDto {
    pub(super) id: Uuid,
    #[serde(default)]
    pub(super) email: Option<String>,
    #[serde(default)]
    pub(super) user_metadata: Map<String, Value>,
    /// Present but empty when GoTrue obfuscates a sign-up for an existing
    /// confirmed address.
    #[serde(default)]
    pub(super) identities: Option<Vec<Value>>,
}

impl UserDto {
    pub(super) fn display_name(&self) -> Option<String> {
        self.user_metadata
            .get("display_name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
    }

    pub(super) fn is_obfuscated_duplicate(&self) -> bool {
        self.identities.as_ref().is_some_and(Vec::is_empty)
    }

    pub(super) fn into_auth_user(self) -> Result<AuthUser, String> {
        let display_name = self.display_name();
        let email = self
            .email
            .ok_or_else(|| format!("user {} has no email", self.id))
            .and_then(|raw| {
                EmailAddress::try_from(raw)
                    .map_err(|err| format!("user {} has an invalid email: {err}", self.id))
            })?;
        Ok(AuthUser {
            id: UserId::from_uuid(self.id),
            email,
            display_name,
        })
    }
}

/// Sign-up answers with a session when auto-confirm is on, else a bare user.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum SignUpResponseDto {
    WithSession { user: UserDto },
    User(UserDto),
}

impl SignUpResponseDto {
    pub(super) fn into_user(self) -> UserDto {
        match self {
            Self::WithSession { user } | Self::User(user) => user,
        }
    }
}

#[derive(Deserialize)]
pub(super) struct SessionDto {
    pub(super) access_token: String,
    #[serde(default)]
    pub(super) refresh_token: String,
    #[serde(default)]
    pub(super) expires_in: u64,
    pub(super) user: UserDto,
}

impl SessionDto {
    pub(super) fn into_parts(self) -> (UserDto, AuthSession) {
        let session = AuthSession {
            access_token: Zeroizing::new(self.access_token),
            refresh_token: Zeroizing::new(self.refresh_token),
            expires_in: self.expires_in,
        };
        (self.user, session)
    }
}

/// Error body; GoTrue versions disagree on field names.
#[derive(Debug, Default, Deserialize)]
pub(super) struct GoTrueErrorDto {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl GoTrueErrorDto {
    pub(super) fn parse(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    /// Machine-readable code, if any.
    pub(super) fn code(&self) -> Option<&str> {
        self.error_code.as_deref().or(self.error.as_deref())
    }

    /// Human-readable explanation, if any.
    pub(super) fn text(&self) -> Option<&str> {
        self.msg
            .as_deref()
            .or(self.error_description.as_deref())
            .or(self.message.as_deref())
    }

    /// Whether code or text mentions `needle`, ignoring case.
    pub(super) fn mentions(&self, needle: &str) -> bool {
        [self.code(), self.text()]
            .into_iter()
            .flatten()
            .any(|value| value.to_ascii_lowercase().contains(needle))
    }
}
