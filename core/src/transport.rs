//! Executing `HttpRequest` values over the network.
//!
//! `Transport` is the seam between the deterministic client core and real
//! I/O. `ReqwestTransport` is the production implementation; tests plug in
//! scripted transports.

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Perform the round-trip. Non-2xx statuses are returned as data, not as
    /// errors; only a failure to get any response is an `Err`.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// `reqwest`-backed transport with JSON default headers.
///
/// No retry and no timeout: failures propagate to the caller immediately.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = request.url()?;
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };
        debug!(method = request.method.as_str(), url = %url, "sending request");

        let mut builder = self.client.request(method, &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        log_error_status(status, &url);

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
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Log, but never swallow, the statuses the front end always reported.
fn log_error_status(status: u16, url: &str) {
    match status {
        401 => warn!(url, "unauthorized access"),
        404 => warn!(url, "resource not found"),
        _ => {}
    }
}
