//! Planted tree records and the validated inputs that create or change them.
//!
//! Records are owned by the external record store; the types here only shape
//! data on its way in and out.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use super::validation::{
    Coordinates, InvalidInput, InvalidReason, LengthBounds, NumericInput, PhotoExtension,
    sanitize_string, validate_coordinates,
};

/// Decimal places kept for stored coordinates.
pub const COORDINATE_PRECISION: i32 = 6;

/// Identifier assigned by the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeId(i64);

impl TreeId {
    /// Wrap a raw store identifier.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw store identifier.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tree as stored by the record store.
#[derive(Debug, Clone, PartialEq)]
pub struct PlantedTree {
    /// Store-assigned identifier.
    pub id: TreeId,
    /// Species name, 2 to 100 characters.
    pub species: String,
    /// Degrees north, rounded to 6 decimals on insert.
    pub latitude: f64,
    /// Degrees east, rounded to 6 decimals on insert.
    pub longitude: f64,
    /// Server-side creation time.
    pub planted_at: DateTime<Utc>,
    /// Public URL of the attached photo, if any.
    pub photo_url: Option<String>,
    /// Email of the user who recorded the tree; empty for legacy rows.
    pub planted_by_email: String,
}

/// Validated input for planting a tree.
///
/// # Examples
/// ```
/// use canopy::domain::TreeDraft;
/// use canopy::domain::validation::NumericInput;
///
/// let draft = TreeDraft::try_from_parts(
///     Some(" Guayacán "),
///     Some(&NumericInput::from(6.25)),
///     Some(&NumericInput::from(-75.56)),
/// )
/// .unwrap();
/// assert_eq!(draft.species(), "Guayacán");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TreeDraft {
    species: String,
    coordinates: Coordinates,
}

impl TreeDraft {
    /// Validate raw request fields.
    pub fn try_from_parts(
        species: Option<&str>,
        latitude: Option<&NumericInput>,
        longitude: Option<&NumericInput>,
    ) -> Result<Self, InvalidInput> {
        let species = sanitize_string(species, LengthBounds::DEFAULT, "species")?;
        let coordinates = validate_coordinates(latitude, longitude)?;
        Ok(Self {
            species,
            coordinates,
        })
    }

    /// Trimmed species name.
    pub fn species(&self) -> &str {
        self.species.as_str()
    }

    /// Unrounded coordinates.
    pub fn coordinates(&self) -> Coordinates {
        self.coordinates
    }
}

/// Row sent to the record store when planting a tree.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTreeRecord {
    /// Trimmed species name.
    pub species: String,
    /// Rounded latitude.
    pub latitude: f64,
    /// Rounded longitude.
    pub longitude: f64,
    /// Taken from the service clock.
    pub planted_at: DateTime<Utc>,
    /// Session user's email.
    pub planted_by_email: String,
}

/// Requested change to the photo URL column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoUrlChange {
    /// Leave the column untouched.
    Keep,
    /// Clear the column.
    Clear,
    /// Store a new absolute URL.
    Set(String),
}

/// Validated partial update of a tree record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeChanges {
    species: Option<String>,
    photo_url: PhotoUrlChange,
}

impl TreeChanges {
    /// Validate raw update fields. At least one field must change.
    ///
    /// `photo_url` follows JSON merge semantics: absent keeps the current
    /// value, `null` clears it.
    pub fn try_from_parts(
        species: Option<&str>,
        photo_url: Option<Option<&str>>,
    ) -> Result<Self, InvalidInput> {
        let species = species
            .map(|value| sanitize_string(Some(value), LengthBounds::DEFAULT, "species"))
            .transpose()?;
        let photo_url = match photo_url {
            None => PhotoUrlChange::Keep,
            Some(None) => PhotoUrlChange::Clear,
            Some(Some(raw)) => PhotoUrlChange::Set(validate_photo_url(raw)?),
        };
        if species.is_none() && photo_url == PhotoUrlChange::Keep {
            return Err(InvalidInput::new(
                "body",
                InvalidReason::Missing,
                "at least one of species or photoUrl must be provided",
            ));
        }
        Ok(Self { species, photo_url })
    }

    /// Change that only points the record at a freshly uploaded photo.
    pub fn photo(url: impl Into<String>) -> Self {
        Self {
            species: None,
            photo_url: PhotoUrlChange::Set(url.into()),
        }
    }

    /// New species, when changing.
    pub fn species(&self) -> Option<&str> {
        self.species.as_deref()
    }

    /// Photo URL change.
    pub fn photo_url(&self) -> &PhotoUrlChange {
        &self.photo_url
    }
}

fn validate_photo_url(raw: &str) -> Result<String, InvalidInput> {
    let trimmed = raw.trim();
    let invalid = || {
        InvalidInput::new(
            "photoUrl",
            InvalidReason::InvalidFormat,
            "photoUrl must be an absolute http(s) URL",
        )
    };
    let url = Url::parse(trimmed).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }
    Ok(url.into())
}

/// Ordering applied to tree listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeOrder {
    /// Most recently planted first.
    #[default]
    Newest,
    /// Oldest first.
    Oldest,
}

impl FromStr for TreeOrder {
    type Err = InvalidInput;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            _ => Err(InvalidInput::new(
                "order",
                InvalidReason::InvalidFormat,
                "order must be newest or oldest",
            )),
        }
    }
}

/// Default page size for tree listings.
pub const DEFAULT_LIST_LIMIT: u32 = 100;
/// Largest page size accepted for tree listings.
pub const MAX_LIST_LIMIT: u32 = 500;

/// Validated filter and paging options for listing trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeListQuery {
    /// Page size, `1..=MAX_LIST_LIMIT`.
    pub limit: u32,
    /// Rows to skip.
    pub offset: u32,
    /// Sort direction on `planted_at`.
    pub order: TreeOrder,
    /// Exact species filter.
    pub species: Option<String>,
}

impl Default for TreeListQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
            order: TreeOrder::default(),
            species: None,
        }
    }
}

impl TreeListQuery {
    /// Validate raw query-string values.
    pub fn try_from_parts(
        limit: Option<u32>,
        offset: Option<u32>,
        order: Option<&str>,
        species: Option<&str>,
    ) -> Result<Self, InvalidInput> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        if !(1..=MAX_LIST_LIMIT).contains(&limit) {
            return Err(InvalidInput::new(
                "limit",
                InvalidReason::OutOfRange,
                format!("limit must be between 1 and {MAX_LIST_LIMIT}"),
            ));
        }
        let order = order
            .map(str::parse::<TreeOrder>)
            .transpose()?
            .unwrap_or_default();
        let species = species
            .map(|value| sanitize_string(Some(value), LengthBounds::DEFAULT, "species"))
            .transpose()?;
        Ok(Self {
            limit,
            offset: offset.unwrap_or(0),
            order,
            species,
        })
    }
}

/// Object-store key of a tree photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoPath(String);

impl PhotoPath {
    /// Wrap an existing object key.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Fresh key for a photo of `tree`: `trees/{id}/{uuid}.{ext}`.
    pub fn for_tree(tree: TreeId, extension: PhotoExtension) -> Self {
        Self(format!(
            "trees/{tree}/{}.{}",
            Uuid::new_v4(),
            extension.as_str()
        ))
    }
}

impl AsRef<str> for PhotoPath {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for PhotoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Largest accepted photo upload in bytes.
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

/// Validated photo upload.
#[derive(Clone, PartialEq, Eq)]
pub struct PhotoUpload {
    extension: PhotoExtension,
    bytes: Vec<u8>,
}

impl PhotoUpload {
    /// Check the payload size; the extension is validated by the caller.
    pub fn try_new(extension: PhotoExtension, bytes: Vec<u8>) -> Result<Self, InvalidInput> {
        if bytes.is_empty() {
            return Err(InvalidInput::new(
                "photo",
                InvalidReason::Missing,
                "photo must not be empty",
            ));
        }
        if bytes.len() > MAX_PHOTO_BYTES {
            return Err(InvalidInput::new(
                "photo",
                InvalidReason::TooLong,
                "photo must be at most 5 MB",
            ));
        }
        Ok(Self { extension, bytes })
    }

    /// Detected image format.
    pub fn extension(&self) -> PhotoExtension {
        self.extension
    }

    /// Consume the upload, yielding the raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl fmt::Debug for PhotoUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhotoUpload")
            .field("extension", &self.extension)
            .field("len", &self.bytes.len())
            .finish()
    }
}
