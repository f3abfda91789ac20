//! Typed failures surfaced by remote calls and audio decoding.
//!
//! Classification happens once, at the HTTP boundary. Everything downstream
//! matches on [`FailureKind`] instead of inspecting message text.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Categories of failure, ordered roughly from "configuration" to "outage".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No credential configured; no request was attempted.
    MissingCredential,
    /// HTTP 401 / `UNAUTHENTICATED`
    AuthenticationFailed,
    /// HTTP 403 / `PERMISSION_DENIED`
    AuthorizationDenied,
    /// HTTP 404 / `NOT_FOUND` (usually an unavailable model)
    ResourceNotFound,
    /// Network error or any other non-2xx status
    TransientServiceError,
    /// The response parsed but an expected field was absent
    MalformedResponse,
    /// Raw audio bytes do not form a valid sample buffer
    DecodeError,
}

impl FailureKind {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(self) -> bool {
        !matches!(self, Self::MissingCredential | Self::DecodeError)
    }

    /// True for failures the user fixes in configuration rather than by waiting.
    pub fn is_configuration(self) -> bool {
        matches!(
            self,
            Self::MissingCredential
                | Self::AuthenticationFailed
                | Self::AuthorizationDenied
                | Self::ResourceNotFound
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::MissingCredential => "missing_credential",
            FailureKind::AuthenticationFailed => "authentication_failed",
            FailureKind::AuthorizationDenied => "authorization_denied",
            FailureKind::ResourceNotFound => "resource_not_found",
            FailureKind::TransientServiceError => "transient_service_error",
            FailureKind::MalformedResponse => "malformed_response",
            FailureKind::DecodeError => "decode_error",
        };
        f.write_str(label)
    }
}

/// Structured failure with kind and details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Failure category
    pub kind: FailureKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn missing_credential() -> Self {
        Self::new(FailureKind::MissingCredential, "No API key configured")
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(FailureKind::TransientServiceError, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(FailureKind::MalformedResponse, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(FailureKind::DecodeError, message)
    }

    /// Classifies a non-success HTTP response.
    ///
    /// Google APIs return `{"error": {"code", "message", "status"}}`; the
    /// `status` string is consulted when the numeric code is ambiguous
    /// (e.g. a proxy rewriting the status line).
    pub fn http_status(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<Value>(body).ok();
        let error_obj = parsed.as_ref().and_then(|json| json.get("error"));
        let api_status = error_obj
            .and_then(|e| e.get("status"))
            .and_then(Value::as_str);
        let api_message = error_obj
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str);

        let kind = match (status, api_status) {
            (401, _) | (_, Some("UNAUTHENTICATED")) => FailureKind::AuthenticationFailed,
            (403, _) | (_, Some("PERMISSION_DENIED")) => FailureKind::AuthorizationDenied,
            (404, _) | (_, Some("NOT_FOUND")) => FailureKind::ResourceNotFound,
            _ => FailureKind::TransientServiceError,
        };

        let message = match api_message {
            Some(msg) => format!("HTTP {status}: {msg}"),
            None => format!("HTTP {status}"),
        };
        let details = (!body.is_empty()).then(|| body.to_string());

        Self {
            kind,
            message,
            details,
        }
    }

    /// Classifies a transport-level reqwest error.
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::transient(format!("Request timed out: {e}"))
        } else if e.is_connect() {
            Self::transient(format!("Connection failed: {e}"))
        } else if e.is_decode() {
            Self::malformed(format!("Response body could not be decoded: {e}"))
        } else {
            Self::transient(format!("Network error: {e}"))
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Failure {}
