//! Error mapping for HTTP responses
//!
//! Converts raw HTTP status/body pairs into the normalized [`DataError`]
//! taxonomy and provides the status-keyed user message table.

use reqwest::StatusCode;
use serde_json::Value;

use super::DataError;

/// Map an HTTP error response to a DataError.
///
/// The message is lifted from the body's `message` or `error` field when the
/// body is JSON; otherwise the (truncated) raw body is used.
pub fn map_http_error(status: StatusCode, body: &str) -> DataError {
    let message = extract_message(body)
        .unwrap_or_else(|| crate::util::truncate_string(body.trim(), 200))
        .to_string();

    let message = if message.is_empty() {
        status.to_string()
    } else {
        message
    };

    if status.is_client_error() {
        DataError::client(status.as_u16(), message)
    } else if status.is_server_error() {
        DataError::server(status.as_u16(), message)
    } else {
        // Unexpected non-error status routed through the error path
        DataError::malformed(format!("unexpected status {}: {}", status, message))
    }
}

/// Pull a human-oriented message out of a JSON error body
fn extract_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    json.get("message")
        .or_else(|| json.get("error"))
        .and_then(|m| m.as_str())
        .map(|m| m.to_string())
}

/// Determine if an HTTP status code indicates a retryable failure
pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
}

/// User-facing message keyed by status code.
///
/// Every 4xx surfaces as a specific actionable message; 5xx collapses into a
/// single transient-failure phrasing.
pub fn user_message_for_status(status: u16) -> &'static str {
    match status {
        400 => "The request was invalid. Please check your input.",
        401 => "Your session has expired. Please sign in again.",
        403 => "You do not have permission to perform this action.",
        404 => "The requested resource was not found.",
        409 => "The resource was modified by someone else. Please reload.",
        422 => "The submitted data could not be processed.",
        429 => "Too many requests. Please wait a moment and try again.",
        500..=599 => "The server encountered a problem. Please try again later.",
        _ => "An unexpected error occurred.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_json_error_body() {
        let err = map_http_error(
            StatusCode::NOT_FOUND,
            r#"{"message":"course not found","code":"E404"}"#,
        );
        match err {
            DataError::Client { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "course not found");
            }
            _ => panic!("expected Client error, got: {:?}", err),
        }
    }

    #[test]
    fn test_map_plain_text_body() {
        let err = map_http_error(StatusCode::BAD_GATEWAY, "upstream unavailable");
        match err {
            DataError::Server { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream unavailable");
            }
            _ => panic!("expected Server error, got: {:?}", err),
        }
    }

    #[test]
    fn test_empty_body_uses_status_line() {
        let err = map_http_error(StatusCode::SERVICE_UNAVAILABLE, "");
        match err {
            DataError::Server { message, .. } => assert!(message.contains("503")),
            _ => panic!("expected Server error, got: {:?}", err),
        }
    }

    #[test]
    fn test_retryable_status() {
        assert!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
    }

    #[test]
    fn test_user_messages_keyed_by_status() {
        assert!(user_message_for_status(401).contains("sign in"));
        assert!(user_message_for_status(403).contains("permission"));
        assert_eq!(
            user_message_for_status(500),
            user_message_for_status(503)
        );
    }
}
