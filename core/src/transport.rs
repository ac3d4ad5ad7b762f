//! Network execution of a built `HttpRequest`.
//!
//! `Transport` is the seam between the request engine and the HTTP stack.
//! `ReqwestTransport` is the production implementation; its `reqwest::Client`
//! pools connections and is shared by every concurrent call.

use async_trait::async_trait;
use tracing::{warn, Instrument, Level};

use crate::config::ClientConfig;
use crate::error::{describe, ApiError, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, ResponseBody};

/// Executes exactly one HTTP call per invocation.
///
/// Implementations return the raw status and body for every status code.
/// Only failures that prevent a status from arriving become `Err`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        if config.timeout_ms == 0 {
            return Err(ApiError::Configuration("request timeout must be greater than zero".to_string()));
        }
        let inner = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ApiError::Configuration(format!("failed to build HTTP client: {}", describe(&e))))?;
        Ok(Self::new(inner))
    }

    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl From<reqwest::Client> for ReqwestTransport {
    fn from(inner: reqwest::Client) -> Self {
        Self::new(inner)
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let span = tracing::span!(
            Level::INFO, "outgoing_http",
            http.method = %request.method,
            http.url = %request.url,
            http.status_code = tracing::field::Empty,
            otel.kind = "client",
        );

        let mut builder = self
            .inner
            .request(to_reqwest_method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().instrument(span.clone()).await?;
        let status = response.status().as_u16();
        span.record("http.status_code", status);

        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = match response.text().instrument(span.clone()).await {
            Ok(text) => ResponseBody::Text(text),
            Err(e) => {
                let reason = describe(&e);
                span.in_scope(|| warn!(status, error = %reason, "failed to read response body"));
                ResponseBody::Unreadable(reason)
            }
        };

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn get(url: String) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url,
            headers: vec![("accept".to_string(), "application/json".to_string())],
            body: None,
        }
    }

    #[tokio::test]
    async fn returns_error_statuses_as_data() {
        let server = MockServer::start_async().await;
        let m = server.mock_async(|when, then| {
            when.method(GET).path("/persons/missing");
            then.status(404).body("not here");
        }).await;

        let response = ReqwestTransport::default()
            .execute(get(server.url("/persons/missing")))
            .await
            .unwrap();

        m.assert_async().await;
        assert_eq!(response.status, 404);
        assert_eq!(response.body, ResponseBody::Text("not here".to_string()));
    }

    #[tokio::test]
    async fn sends_headers_and_body() {
        let server = MockServer::start_async().await;
        let m = server.mock_async(|when, then| {
            when.method(POST)
                .path("/persons/lookup")
                .header("content-type", "application/json")
                .header("authorization", "Bearer t0k")
                .body(r#"{"ids":["1"]}"#);
            then.status(200)
                .header("content-type", "application/json")
                .body("[]");
        }).await;

        let request = HttpRequest {
            method: HttpMethod::Post,
            url: server.url("/persons/lookup"),
            headers: vec![
                ("content-type".to_string(), "application/json".to_string()),
                ("authorization".to_string(), "Bearer t0k".to_string()),
            ],
            body: Some(r#"{"ids":["1"]}"#.to_string()),
        };
        let response = ReqwestTransport::default().execute(request).await.unwrap();

        m.assert_async().await;
        assert_eq!(response.status, 200);
        assert_eq!(response.header("Content-Type"), Some("application/json"));
    }

    #[tokio::test]
    async fn connection_failure_has_no_status() {
        // Port 9 (discard) on localhost is closed in test environments.
        let err = ReqwestTransport::default()
            .execute(get("http://127.0.0.1:9/persons".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect(_) | TransportError::Request(_)));
    }

    #[test]
    fn from_config_applies_settings() {
        let config = ClientConfig::new("https://api.test").with_user_agent("tests/1.0");
        assert!(ReqwestTransport::from_config(&config).is_ok());
    }

    #[test]
    fn from_config_rejects_zero_timeout() {
        let config = ClientConfig::new("https://api.test").with_timeout(std::time::Duration::ZERO);
        assert!(matches!(
            ReqwestTransport::from_config(&config),
            Err(ApiError::Configuration(_))
        ));
    }
}
