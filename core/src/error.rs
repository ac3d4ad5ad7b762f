//! Error types for the school-data client.
//!
//! # Design
//! Every non-success outcome is surfaced as an `ApiError` variant carrying
//! enough context (status, body text, or the underlying cause) for the caller
//! to log it or react programmatically. Nothing is retried or swallowed here.
//! A 204 response is not an error; see `response::Outcome::Empty`.

use thiserror::Error;

/// Failure raised before any HTTP status was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    /// The response status arrived but the body stream failed.
    #[error("response body could not be read: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let message = describe(&err);
        if err.is_timeout() {
            TransportError::Timeout(message)
        } else if err.is_connect() {
            TransportError::Connect(message)
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(message)
        } else {
            TransportError::Request(message)
        }
    }
}

/// Flatten an error and its source chain into one line.
pub(crate) fn describe(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Errors returned by the request engine.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The client could not be constructed from the given settings.
    #[error("invalid client configuration: {0}")]
    Configuration(String),

    /// No response was obtained (DNS, TLS, connect, timeout, reset).
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {}", .body.as_deref().unwrap_or("<body unavailable>"))]
    HttpStatus { status: u16, body: Option<String> },

    /// A 2xx response carried a body that is not valid JSON, or JSON that
    /// does not fit the requested type.
    #[error("response decoding failed: {message}")]
    Decode { message: String, body: String },

    /// A request payload could not be serialized to JSON.
    #[error("request serialization failed: {0}")]
    Serialization(String),

    /// The resource family has no endpoint for the requested operation.
    #[error("{resource} does not support {operation}")]
    Unsupported {
        resource: &'static str,
        operation: &'static str,
    },

    /// The client's transport was released by `dispose`.
    #[error("client has been disposed")]
    Disposed,
}

impl ApiError {
    /// HTTP status, when the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw body text captured with the error, if any.
    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::HttpStatus { body, .. } => body.as_deref(),
            ApiError::Decode { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    pub(crate) fn decode(err: serde_json::Error, body: impl Into<String>) -> Self {
        ApiError::Decode {
            message: err.to_string(),
            body: body.into(),
        }
    }
}
