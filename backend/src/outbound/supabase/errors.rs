//! Helpers shared by the adapters when turning failed replies into messages.

use reqwest::StatusCode;

const PREVIEW_CHAR_LIMIT: usize = 160;

/// Broad class of a reqwest failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TransportFailure {
    Timeout,
    Connection,
}

/// Classify a transport error and render it.
pub(super) fn classify_transport(error: &reqwest::Error) -> (TransportFailure, String) {
    let kind = if error.is_timeout() {
        TransportFailure::Timeout
    } else {
        TransportFailure::Connection
    };
    (kind, error.to_string())
}

/// `status N` optionally followed by a compact preview of the body.
pub(super) fn status_message(status: StatusCode, body: &[u8]) -> String {
    let preview = body_preview(body);
    if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {preview}", status.as_u16())
    }
}

/// Whether the upstream reports that it gave up waiting.
pub(super) fn is_timeout_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Whitespace-collapsed body text, truncated for logs and error messages.
pub(super) fn body_preview(body: &[u8]) -> String {
    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
