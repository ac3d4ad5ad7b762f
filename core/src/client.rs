//! Request dispatcher for the school-data API.
//!
//! # Design
//! `SchoolDataClient` owns an immutable `Context` and carries no other state.
//! A call is split the same way regardless of the resource family:
//! `build_request` turns method, path, query and body into an `HttpRequest`,
//! the context's `Transport` executes it, and `response::normalize` classifies
//! the result. Callers with their own HTTP stack can use `build_request` and
//! `normalize` directly and skip the transport.

use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::context::Context;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};
use crate::query::{append_query, Filters, QueryParams};
use crate::resources::Endpoint;
use crate::response::{normalize, Outcome};
use crate::transport::{ReqwestTransport, Transport};

/// Async client for the school-data REST API.
///
/// Shareable across tasks by reference or behind an `Arc`; every call is
/// independent of every other.
#[derive(Debug)]
pub struct SchoolDataClient<T = ReqwestTransport> {
    context: Context<T>,
}

impl SchoolDataClient<ReqwestTransport> {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self, ApiError> {
        Self::from_config(&ClientConfig {
            token: token.map(str::to_string),
            ..ClientConfig::new(base_url)
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::from_config(config)?;
        Self::with_transport(&config.base_url, config.token.as_deref(), transport)
    }
}

impl<T: Transport> SchoolDataClient<T> {
    pub fn with_transport(base_url: &str, token: Option<&str>, transport: T) -> Result<Self, ApiError> {
        Ok(Self {
            context: Context::new(base_url, token, transport)?,
        })
    }

    pub fn from_context(context: Context<T>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Context<T> {
        &self.context
    }

    pub fn is_disposed(&self) -> bool {
        self.context.is_disposed()
    }

    /// Release the transport. Later calls fail with `ApiError::Disposed`.
    pub fn dispose(&mut self) {
        self.context.dispose();
    }

    /// Assemble the outbound request without sending it.
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        query: Option<&QueryParams>,
        body: Option<&Value>,
    ) -> Result<HttpRequest, ApiError> {
        let mut url = self.context.resolve(path);
        if let Some(query) = query {
            url = append_query(&url, query);
        }

        let mut headers = self.context.default_headers().to_vec();
        if let Some(token) = self.context.token() {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }

        let body = body
            .map(|value| {
                serde_json::to_string(value).map_err(|e| ApiError::Serialization(e.to_string()))
            })
            .transpose()?;
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    /// Dispatch one call and normalize its result.
    pub async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        query: Option<&QueryParams>,
        body: Option<&Value>,
    ) -> Result<Outcome, ApiError> {
        let transport = self.context.transport()?;
        let request = self.build_request(method, path, query, body)?;
        debug!(method = %request.method, url = %request.url, "dispatching request");
        let response = transport.execute(request).await?;
        normalize(response)
    }

    /// Dispatch to an endpoint descriptor with a filter mapping.
    pub async fn call(
        &self,
        endpoint: &Endpoint,
        filters: &Filters,
        body: Option<&Value>,
    ) -> Result<Outcome, ApiError> {
        let query = filters.to_params();
        self.send(endpoint.method, &endpoint.path, Some(&query), body)
            .await
    }
}
