//! Field validators applied to untrusted input before any external call.
//!
//! Every validator fails with [`InvalidInput`], which names the offending field
//! and carries a message safe to show to end users.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::Zeroizing;

/// Machine-readable reason attached to an [`InvalidInput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// The field was absent, null or blank.
    Missing,
    /// The field was expected to hold a number.
    NotNumeric,
    /// The numeric value lies outside the accepted range.
    OutOfRange,
    /// The text is shorter than the lower bound.
    TooShort,
    /// The text is longer than the upper bound.
    TooLong,
    /// The value does not follow the expected shape.
    InvalidFormat,
}

impl InvalidReason {
    /// Stable code exposed in error details.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Missing => "missing_field",
            Self::NotNumeric => "not_numeric",
            Self::OutOfRange => "out_of_range",
            Self::TooShort => "too_short",
            Self::TooLong => "too_long",
            Self::InvalidFormat => "invalid_format",
        }
    }
}

/// Validation failure for a single input field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct InvalidInput {
    field: String,
    reason: InvalidReason,
    message: String,
}

impl InvalidInput {
    /// Build a failure for `field`.
    pub fn new(field: impl Into<String>, reason: InvalidReason, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason,
            message: message.into(),
        }
    }

    fn missing(field: &str) -> Self {
        Self::new(field, InvalidReason::Missing, format!("{field} is required"))
    }

    /// Name of the offending field.
    pub fn field(&self) -> &str {
        self.field.as_str()
    }

    /// Why the field was rejected.
    pub fn reason(&self) -> InvalidReason {
        self.reason
    }

    /// Human-readable explanation.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Inclusive character-count bounds for free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthBounds {
    min: usize,
    max: usize,
}

impl LengthBounds {
    /// Bounds used when a caller does not override them.
    pub const DEFAULT: Self = Self::new(2, 100);

    /// Create bounds accepting `min..=max` characters.
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

impl Default for LengthBounds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Trim `text` and check its length against `bounds`.
///
/// `None` models an absent or non-textual value.
///
/// # Examples
/// ```
/// use canopy::domain::validation::{sanitize_string, LengthBounds};
///
/// let species = sanitize_string(Some("  Quercus robur "), LengthBounds::DEFAULT, "species").unwrap();
/// assert_eq!(species, "Quercus robur");
/// ```
pub fn sanitize_string(
    text: Option<&str>,
    bounds: LengthBounds,
    field: &str,
) -> Result<String, InvalidInput> {
    let Some(text) = text else {
        return Err(InvalidInput::missing(field));
    };
    let trimmed = text.trim();
    let length = trimmed.chars().count();
    if length < bounds.min {
        return Err(InvalidInput::new(
            field,
            InvalidReason::TooShort,
            format!("{field} must be at least {} characters", bounds.min),
        ));
    }
    if length > bounds.max {
        return Err(InvalidInput::new(
            field,
            InvalidReason::TooLong,
            format!("{field} must be at most {} characters", bounds.max),
        ));
    }
    Ok(trimmed.to_owned())
}

/// Raw numeric field as received over JSON: a number, numeric text, or
/// anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    /// A JSON number.
    Number(f64),
    /// Text that may hold a number.
    Text(String),
    /// Any other JSON value; always rejected.
    Other(Value),
}

impl From<f64> for NumericInput {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for NumericInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// Validated latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    /// Latitude in `[-90, 90]`.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in `[-180, 180]`.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Copy rounded to `places` decimal places, as stored by the record store.
    #[must_use]
    pub fn rounded(&self, places: i32) -> Self {
        let factor = 10_f64.powi(places);
        Self {
            latitude: (self.latitude * factor).round() / factor,
            longitude: (self.longitude * factor).round() / factor,
        }
    }
}

fn parse_numeric(value: Option<&NumericInput>, field: &str) -> Result<f64, InvalidInput> {
    let not_numeric = || {
        InvalidInput::new(
            field,
            InvalidReason::NotNumeric,
            format!("{field} must be a number"),
        )
    };
    let parsed = match value {
        None | Some(NumericInput::Other(Value::Null)) => return Err(InvalidInput::missing(field)),
        Some(NumericInput::Number(number)) => *number,
        Some(NumericInput::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Err(InvalidInput::missing(field));
            }
            trimmed.parse::<f64>().map_err(|_| not_numeric())?
        }
        Some(NumericInput::Other(_)) => return Err(not_numeric()),
    };
    if parsed.is_finite() {
        Ok(parsed)
    } else {
        Err(not_numeric())
    }
}

/// Parse and range-check a latitude/longitude pair.
///
/// The values are returned unrounded.
///
/// # Examples
/// ```
/// use canopy::domain::validation::{validate_coordinates, NumericInput};
///
/// let coords = validate_coordinates(
///     Some(&NumericInput::from(4.711)),
///     Some(&NumericInput::from("-74.0721")),
/// )
/// .unwrap();
/// assert_eq!(coords.longitude(), -74.0721);
/// ```
pub fn validate_coordinates(
    latitude: Option<&NumericInput>,
    longitude: Option<&NumericInput>,
) -> Result<Coordinates, InvalidInput> {
    let latitude = parse_numeric(latitude, "latitude")?;
    let longitude = parse_numeric(longitude, "longitude")?;
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(InvalidInput::new(
            "latitude",
            InvalidReason::OutOfRange,
            "latitude must be between -90 and 90",
        ));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(InvalidInput::new(
            "longitude",
            InvalidReason::OutOfRange,
            "longitude must be between -180 and 180",
        ));
    }
    Ok(Coordinates {
        latitude,
        longitude,
    })
}

/// Minimum accepted email length, inclusive.
pub const EMAIL_MIN: usize = 5;
/// Maximum accepted email length, inclusive.
pub const EMAIL_MAX: usize = 100;

/// Lowercased, trimmed email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Text before the `@`.
    pub fn local_part(&self) -> &str {
        self.0.split_once('@').map_or(self.0.as_str(), |(local, _)| local)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = InvalidInput;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_email(&value)
    }
}

/// Normalise and check an email address.
///
/// # Examples
/// ```
/// use canopy::domain::validation::validate_email;
///
/// let email = validate_email("  USER@Example.com ").unwrap();
/// assert_eq!(email.as_ref(), "user@example.com");
/// assert!(validate_email("a@b").is_err());
/// ```
pub fn validate_email(email: &str) -> Result<EmailAddress, InvalidInput> {
    let normalized = email.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(InvalidInput::missing("email"));
    }
    let invalid = || {
        InvalidInput::new(
            "email",
            InvalidReason::InvalidFormat,
            "email must be a valid email address",
        )
    };
    if normalized.chars().any(char::is_whitespace) || normalized.matches('@').count() != 1 {
        return Err(invalid());
    }
    let Some((local, domain)) = normalized.split_once('@') else {
        return Err(invalid());
    };
    if local.is_empty()
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }
    let length = normalized.chars().count();
    if !(EMAIL_MIN..=EMAIL_MAX).contains(&length) {
        return Err(InvalidInput::new(
            "email",
            InvalidReason::InvalidFormat,
            format!("email must be between {EMAIL_MIN} and {EMAIL_MAX} characters"),
        ));
    }
    Ok(EmailAddress(normalized))
}

/// Minimum password length. Earlier releases accepted six characters.
pub const PASSWORD_MIN: usize = 8;
/// Maximum password length accepted by the auth collaborator.
pub const PASSWORD_MAX: usize = 128;

/// Validated password held in zeroizing memory.
///
/// `Debug` output is redacted so the value never reaches logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(Zeroizing<String>);

impl Password {
    /// Expose the secret for forwarding to the auth collaborator.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

/// Trim and length-check a password.
pub fn validate_password(password: &str) -> Result<Password, InvalidInput> {
    let trimmed = password.trim();
    if trimmed.is_empty() {
        return Err(InvalidInput::missing("password"));
    }
    let length = trimmed.chars().count();
    if length < PASSWORD_MIN {
        return Err(InvalidInput::new(
            "password",
            InvalidReason::TooShort,
            format!("password must be at least {PASSWORD_MIN} characters"),
        ));
    }
    if length > PASSWORD_MAX {
        return Err(InvalidInput::new(
            "password",
            InvalidReason::TooLong,
            format!("password must be at most {PASSWORD_MAX} characters"),
        ));
    }
    Ok(Password(Zeroizing::new(trimmed.to_owned())))
}

/// Parse a `YYYY-MM-DD` date.
///
/// Partial matches, alternate separators and unpadded fields are rejected
/// before calendar validation.
pub fn validate_date(text: &str, field: &str) -> Result<NaiveDate, InvalidInput> {
    if text.trim().is_empty() {
        return Err(InvalidInput::missing(field));
    }
    let invalid = || {
        InvalidInput::new(
            field,
            InvalidReason::InvalidFormat,
            format!("{field} must be a date in YYYY-MM-DD format"),
        )
    };
    let shape_ok = text.len() == 10
        && text.bytes().enumerate().all(|(index, byte)| match index {
            4 | 7 => byte == b'-',
            _ => byte.is_ascii_digit(),
        });
    if !shape_ok {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| invalid())
}

/// Bounds applied to display names.
pub const DISPLAY_NAME_BOUNDS: LengthBounds = LengthBounds::new(2, 50);

/// Validate an optional display name, falling back to the email local part.
pub fn validate_display_name(
    display_name: Option<&str>,
    email: &EmailAddress,
) -> Result<String, InvalidInput> {
    match display_name.filter(|name| !name.trim().is_empty()) {
        Some(name) => sanitize_string(Some(name), DISPLAY_NAME_BOUNDS, "displayName"),
        None => Ok(email
            .local_part()
            .chars()
            .take(DISPLAY_NAME_BOUNDS.max)
            .collect()),
    }
}

/// Image formats accepted for tree photos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoExtension {
    /// `.png`
    Png,
    /// `.jpg`
    Jpg,
    /// `.jpeg`
    Jpeg,
    /// `.webp`
    Webp,
}

impl PhotoExtension {
    /// Lowercase file extension without the dot.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
        }
    }

    /// MIME type sent to the object store.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpg | Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }
}

/// Derive the photo format from an uploaded file name.
pub fn validate_photo_filename(filename: Option<&str>) -> Result<PhotoExtension, InvalidInput> {
    let Some(filename) = filename.map(str::trim).filter(|name| !name.is_empty()) else {
        return Err(InvalidInput::missing("photo"));
    };
    let extension = filename
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase());
    match extension.as_deref() {
        Some("png") => Ok(PhotoExtension::Png),
        Some("jpg") => Ok(PhotoExtension::Jpg),
        Some("jpeg") => Ok(PhotoExtension::Jpeg),
        Some("webp") => Ok(PhotoExtension::Webp),
        _ => Err(InvalidInput::new(
            "photo",
            InvalidReason::InvalidFormat,
            "photo must be a png, jpg, jpeg or webp file",
        )),
    }
}
