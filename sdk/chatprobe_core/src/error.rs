use thiserror::Error;

use std::fmt;

/// Errors surfaced by the transport layer and the stream decoder.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The response status diverged from an explicit expectation.
    #[error("wrong response code: expected = {expected}, received = {actual} | error = {diagnostic}")]
    ContractViolation {
        expected: u16,
        actual: u16,
        diagnostic: Diagnostic,
    },

    /// A 2xx status was required but something else came back.
    #[error("response code = {status}, error = {reason} {body}")]
    FailureStatus {
        status: u16,
        reason: String,
        body: String,
    },

    /// No response arrived within the request timeout.
    #[error("request timed out")]
    Timeout,

    /// The HTTP request failed at the transport level.
    #[error("request error: {0}")]
    Request(reqwest::Error),

    /// The request payload could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication material could not be attached to the request.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The base URL is not a valid absolute URL.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// A required configuration value is missing.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    /// The client was closed and its connection pool released.
    #[error("client is closed")]
    Closed,
}

/// Result type alias for transport operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Request(err)
        }
    }
}

/// Best-effort extraction of an error body, embedded in a
/// [`ClientError::ContractViolation`].
///
/// Extraction never replaces the violation itself: a 200 carries no error
/// body worth reading, and a body that fails to parse is reported with a
/// fixed placeholder rather than a parse error of its own.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// The actual status was 200; no error body was read.
    None,
    /// The error body parsed as JSON.
    Payload(serde_json::Value),
    /// The error body could not be parsed as JSON.
    Unparseable,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Payload(value) => write!(f, "{value}"),
            Self::Unparseable => f.write_str("Unable to parse error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn contract_violation_message_embeds_both_codes() {
        let err = ClientError::ContractViolation {
            expected: 200,
            actual: 400,
            diagnostic: Diagnostic::Payload(json!({"error": "bad request"})),
        };

        let message = err.to_string();
        assert_eq!(
            message,
            r#"wrong response code: expected = 200, received = 400 | error = {"error":"bad request"}"#
        );
    }

    #[test]
    fn unparseable_diagnostic_uses_placeholder() {
        let err = ClientError::ContractViolation {
            expected: 200,
            actual: 500,
            diagnostic: Diagnostic::Unparseable,
        };

        assert!(err.to_string().contains("Unable to parse error"));
    }

    #[test]
    fn missing_diagnostic_displays_as_none() {
        assert_eq!(Diagnostic::None.to_string(), "none");
    }

    #[test]
    fn failure_status_message_embeds_reason() {
        let err = ClientError::FailureStatus {
            status: 404,
            reason: "Not Found".into(),
            body: "{}".into(),
        };

        assert_eq!(err.to_string(), "response code = 404, error = Not Found {}");
    }
}
