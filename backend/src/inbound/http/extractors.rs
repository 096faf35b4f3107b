//! Extractor configuration shared by every route.
//!
//! Actix reports malformed JSON, query strings and path segments with its own
//! plain-text errors. These configs route them through the domain [`Error`]
//! so every failure uses the same JSON envelope.

use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::{HttpRequest, web};

use crate::domain::Error;

/// Maximum accepted JSON body size.
pub const JSON_BODY_LIMIT: usize = 64 * 1024;

fn json_error(error: &JsonPayloadError) -> Error {
    match error {
        JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
            Error::payload_too_large(format!(
                "request body must be at most {} KiB",
                JSON_BODY_LIMIT / 1024
            ))
        }
        JsonPayloadError::ContentType => {
            Error::invalid_request("Content-Type must be application/json")
        }
        JsonPayloadError::Deserialize(inner) => {
            Error::invalid_request(format!("request body is not valid JSON: {inner}"))
        }
        other => Error::invalid_request(format!("request body could not be read: {other}")),
    }
}

fn handle_json_error(error: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    json_error(&error).into()
}

fn handle_query_error(error: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    Error::invalid_request(format!("invalid query string: {error}")).into()
}

fn handle_path_error(error: PathError, _req: &HttpRequest) -> actix_web::Error {
    Error::invalid_request(format!("invalid path parameter: {error}")).into()
}

/// JSON body limit and error mapping.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_BODY_LIMIT)
        .error_handler(handle_json_error)
}

/// Query-string error mapping.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(handle_query_error)
}

/// Path-segment error mapping.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(handle_path_error)
}
