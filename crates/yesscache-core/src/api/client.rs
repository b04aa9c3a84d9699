//! HTTP client used by the offline cache manager.
//!
//! `ApiClient` turns owned [`Request`] values into `reqwest` calls and
//! captures the full response so it can be stored in a cache partition.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::debug;

use crate::models::{Method, Request, Response};

use super::{ApiError, Fetcher};

/// HTTP client for the app origin and its backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
}

impl ApiClient {
    /// Create a new client. Without a timeout the platform default applies.
    pub fn new(timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    fn method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
            Method::Options => reqwest::Method::OPTIONS,
        }
    }

    fn headers(request: &Request) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        for (name, value) in &request.headers {
            let name = header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::InvalidRequest(format!("bad header name {}: {}", name, e)))?;
            let value = header::HeaderValue::from_str(value)
                .map_err(|e| ApiError::InvalidRequest(format!("bad header value: {}", e)))?;
            headers.append(name, value);
        }
        Ok(headers)
    }

    /// Capture a reqwest response into an owned [`Response`].
    async fn capture(response: reqwest::Response) -> Result<Response, ApiError> {
        let status = response.status().as_u16();
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
        let body = response.bytes().await?.to_vec();

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Fetcher for ApiClient {
    async fn fetch(&self, request: &Request) -> Result<Response, ApiError> {
        debug!(method = %request.method, url = %request.url, "Sending request");

        let mut builder = self
            .client
            .request(Self::method(request.method), request.url.clone())
            .headers(Self::headers(request)?);
        if let Some(ref body) = request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                ApiError::Offline(e.to_string())
            } else {
                ApiError::NetworkError(e)
            }
        })?;

        let response = Self::capture(response).await?;
        debug!(url = %request.url, status = response.status, bytes = response.body.len(), "Response received");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_are_forwarded() {
        let req = Request::parse("GET", "https://play.yessplora.app/api/me")
            .unwrap()
            .with_header("accept", "application/json")
            .with_header("x-team", "blue");
        let headers = ApiClient::headers(&req).unwrap();
        assert_eq!(headers.get(header::ACCEPT).unwrap(), "application/json");
        assert_eq!(headers.get("x-team").unwrap(), "blue");
    }

    #[test]
    fn test_rejects_invalid_header_name() {
        let req = Request::parse("GET", "https://play.yessplora.app/")
            .unwrap()
            .with_header("bad header", "x");
        assert!(matches!(ApiClient::headers(&req), Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_network_failure() {
        let client = ApiClient::new(Some(Duration::from_secs(2))).unwrap();
        // Port 9 on loopback: nothing listens, the connect is refused
        let req = Request::parse("GET", "http://127.0.0.1:9/").unwrap();
        let err = client.fetch(&req).await.unwrap_err();
        assert!(err.is_network_failure());
    }

    #[test]
    fn test_method_mapping() {
        assert_eq!(ApiClient::method(Method::Get), reqwest::Method::GET);
        assert_eq!(ApiClient::method(Method::Delete), reqwest::Method::DELETE);
    }
}
