//! Auth/transport context: base endpoint, bearer credential, default headers,
//! and the owned transport.
//!
//! # Lifecycle
//! A `Context` only exists once construction succeeded (Ready). `dispose`
//! releases the transport (Disposed); calling it again does nothing. The
//! context is never mutated between those two points, so any number of
//! concurrent calls can borrow it.

use tracing::{debug, warn};
use url::Url;

use crate::error::ApiError;

#[derive(Debug)]
pub struct Context<T> {
    base_url: String,
    token: Option<String>,
    default_headers: Vec<(String, String)>,
    transport: Option<T>,
}

impl<T> Context<T> {
    /// Validate the endpoint and take ownership of `transport`.
    ///
    /// Only an empty or unparseable base URL is fatal. A missing token or a
    /// non-https scheme is logged and accepted.
    pub fn new(base_url: &str, token: Option<&str>, transport: T) -> Result<Self, ApiError> {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            return Err(ApiError::Configuration("base URL must not be empty".to_string()));
        }
        let parsed = Url::parse(trimmed)
            .map_err(|e| ApiError::Configuration(format!("invalid base URL {trimmed:?}: {e}")))?;
        if parsed.scheme() != "https" {
            warn!(base_url = %trimmed, scheme = parsed.scheme(), "base URL is not using https");
        }

        let token = token.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string);
        if token.is_none() {
            warn!(base_url = %trimmed, "no bearer token configured; requests will be sent unauthenticated");
        }

        Ok(Self {
            base_url: trimmed.trim_end_matches('/').to_string(),
            token,
            default_headers: vec![("accept".to_string(), "application/json".to_string())],
            transport: Some(transport),
        })
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn default_headers(&self) -> &[(String, String)] {
        &self.default_headers
    }

    /// Join a relative path onto the base URL with exactly one slash.
    pub fn resolve(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    pub fn transport(&self) -> Result<&T, ApiError> {
        self.transport.as_ref().ok_or(ApiError::Disposed)
    }

    pub fn is_disposed(&self) -> bool {
        self.transport.is_none()
    }

    /// Release the transport. Repeated calls are no-ops.
    pub fn dispose(&mut self) {
        if self.transport.take().is_some() {
            debug!(base_url = %self.base_url, "transport released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_base_url_is_rejected() {
        for base in ["", "   "] {
            let err = Context::new(base, Some("t"), ()).unwrap_err();
            assert!(matches!(err, ApiError::Configuration(_)));
        }
    }

    #[test]
    fn unparseable_base_url_is_rejected() {
        let err = Context::new("not a url", Some("t"), ()).unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));
    }

    #[test]
    fn http_scheme_and_missing_token_are_accepted() {
        let ctx = Context::new("http://localhost:3000", None, ()).unwrap();
        assert_eq!(ctx.token(), None);
        assert_eq!(ctx.base_url(), "http://localhost:3000");
    }

    #[test]
    fn blank_token_counts_as_missing() {
        let ctx = Context::new("https://api.test", Some("  "), ()).unwrap();
        assert_eq!(ctx.token(), None);
    }

    #[test]
    fn resolve_keeps_base_path_and_avoids_double_slashes() {
        let ctx = Context::new("https://api.test/ss12000/v2/", Some("t"), ()).unwrap();
        assert_eq!(ctx.resolve("/persons"), "https://api.test/ss12000/v2/persons");
        assert_eq!(ctx.resolve("persons/42"), "https://api.test/ss12000/v2/persons/42");
        assert_eq!(ctx.resolve(""), "https://api.test/ss12000/v2");
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut ctx = Context::new("https://api.test", Some("t"), ()).unwrap();
        assert!(ctx.transport().is_ok());
        ctx.dispose();
        assert!(ctx.is_disposed());
        ctx.dispose();
        assert!(matches!(ctx.transport(), Err(ApiError::Disposed)));
    }

    #[test]
    fn accept_header_is_a_default() {
        let ctx = Context::new("https://api.test", None, ())
            .unwrap()
            .with_header("x-tenant", "north");
        assert_eq!(
            ctx.default_headers(),
            [
                ("accept".to_string(), "application/json".to_string()),
                ("x-tenant".to_string(), "north".to_string())
            ]
        );
    }
}
