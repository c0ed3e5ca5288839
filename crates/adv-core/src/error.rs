use serde::Deserialize;
use thiserror::Error;

/// Status reported when an error body does not carry one.
pub const DEFAULT_ERROR_STATUS: u16 = 400;
const DEFAULT_ERROR_MESSAGE: &str = "unknown message";

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP transport failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl Error {
    /// HTTP-level status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Body shape of an error returned by the service. Every field is optional;
/// whatever the server omits falls back to the defaults above.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<u16>,
}

/// Normalize a non-success response into `Error::Api`.
///
/// A JSON body contributes `message` and `status`. Anything else produces a
/// synthesized message naming the HTTP status and the parse failure, with the
/// HTTP status as `status`.
pub fn api_error_from_body(http_status: u16, body: &[u8]) -> Error {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(parsed) => Error::Api {
            status: parsed.status.unwrap_or(DEFAULT_ERROR_STATUS),
            message: parsed.message.unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
        },
        Err(e) => Error::Api {
            status: http_status,
            message: format!(
                "Your HTTP request was invalid '{}', response not JSON formatted: {}",
                http_status, e
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_body_supplies_message_and_status() {
        let err = api_error_from_body(404, br#"{"message":"no such embedding","status":404}"#);
        match err {
            Error::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "no such embedding");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn json_body_without_fields_uses_defaults() {
        let err = api_error_from_body(500, b"{}");
        assert_eq!(err.status(), Some(DEFAULT_ERROR_STATUS));
        assert!(err.to_string().contains("unknown message"));
    }

    #[test]
    fn non_json_body_is_synthesized() {
        let err = api_error_from_body(502, b"<html>Bad Gateway</html>");
        assert_eq!(err.status(), Some(502));
        let text = err.to_string();
        assert!(text.contains("Your HTTP request was invalid '502'"), "{text}");
        assert!(text.contains("response not JSON formatted"), "{text}");
    }

    #[test]
    fn empty_body_is_not_json() {
        let err = api_error_from_body(401, b"");
        assert_eq!(err.status(), Some(401));
    }
}
