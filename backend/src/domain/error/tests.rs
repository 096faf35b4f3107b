//! Tests for the domain error payload.

use super::*;
use crate::domain::validation::{InvalidInput, InvalidReason};
use rstest::{fixture, rstest};
use serde_json::json;

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn base_error() -> Error {
    Error::invalid_request("bad")
}

#[rstest]
fn try_new_rejects_blank_messages() {
    let result = Error::try_new(ErrorCode::InvalidRequest, "   ");
    assert_eq!(result, Err(ErrorValidationError::EmptyMessage));
}

#[rstest]
fn try_with_trace_id_rejects_blank_values(base_error: Error) {
    let result = base_error.try_with_trace_id("  ");
    assert_eq!(result, Err(ErrorValidationError::EmptyTraceId));
}

#[rstest]
fn new_has_no_trace_id_out_of_scope() {
    assert!(Error::internal("boom").trace_id().is_none());
}

#[rstest]
#[tokio::test]
async fn new_captures_trace_id_in_scope() {
    let trace_id: TraceId = TRACE_ID.parse().expect("fixture uuid");
    let error = TraceId::scope(trace_id, async move { Error::internal("boom") }).await;
    assert_eq!(error.trace_id(), Some(TRACE_ID));
}

#[rstest]
fn serialises_camel_case_and_skips_empty_fields(base_error: Error) {
    let value = serde_json::to_value(base_error).expect("serialise");
    assert_eq!(value, json!({"code": "invalid_request", "message": "bad"}));
}

#[rstest]
fn deserialise_rejects_blank_message() {
    let result: Result<Error, _> =
        serde_json::from_value(json!({"code": "not_found", "message": " "}));
    assert!(result.is_err());
}

#[rstest]
fn deserialise_keeps_trace_id_and_details() {
    let error: Error = serde_json::from_value(json!({
        "code": "internal_error",
        "message": "Internal server error",
        "traceId": TRACE_ID,
        "details": {"field": "species"}
    }))
    .expect("valid payload");
    assert_eq!(error.trace_id(), Some(TRACE_ID));
    assert_eq!(error.details(), Some(&json!({"field": "species"})));
}

#[rstest]
fn invalid_input_maps_to_invalid_request_with_field_details() {
    let error = Error::from(InvalidInput::new(
        "latitude",
        InvalidReason::OutOfRange,
        "latitude must be between -90 and 90",
    ));
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
    assert_eq!(error.message(), "latitude must be between -90 and 90");
    assert_eq!(
        error.details(),
        Some(&json!({"field": "latitude", "code": "out_of_range"}))
    );
}

#[rstest]
fn error_schema_lists_the_wire_fields() {
    let schema = serde_json::to_value(<Error as utoipa::PartialSchema>::schema())
        .expect("schema serialises");
    let properties = schema
        .get("properties")
        .and_then(serde_json::Value::as_object)
        .expect("object schema");
    for field in ["code", "message", "traceId", "details"] {
        assert!(properties.contains_key(field), "missing {field}");
    }
    assert_eq!(<Error as utoipa::ToSchema>::name(), "Error");
}
