//! Per-route response strategies.
//!
//! | route        | strategy      | partition | on network failure          |
//! |--------------|---------------|-----------|-----------------------------|
//! | static asset | cache-first   | static    | no response                 |
//! | QR image     | cache-first   | dynamic   | placeholder SVG             |
//! | API          | network-first | dynamic   | cached copy, else 503 JSON  |
//! | page         | network-first | dynamic   | cached copy, else none      |
//!
//! Partitions are those of the active version.
//!
//! Cache failures never reach the caller: they are logged and the request
//! is served as if the cache were empty.

use tracing::{debug, warn};

use crate::models::{Method, Request, Response};
use crate::router::RouteKind;

use super::{ActivePartitions, Bucket, OfflineCacheManager};

/// Body returned for API requests made offline with nothing cached.
const OFFLINE_BODY: &str = r#"{"error":"offline","message":"You are offline. Please check your connection and try again.","offline":true}"#;

/// Stand-in image for QR codes that were never fetched.
const QR_PLACEHOLDER_SVG: &str = concat!(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="200" viewBox="0 0 200 200">"##,
    r##"<rect width="200" height="200" fill="#f3f4f6"/>"##,
    r##"<rect x="20" y="20" width="50" height="50" fill="none" stroke="#9ca3af" stroke-width="8"/>"##,
    r##"<rect x="130" y="20" width="50" height="50" fill="none" stroke="#9ca3af" stroke-width="8"/>"##,
    r##"<rect x="20" y="130" width="50" height="50" fill="none" stroke="#9ca3af" stroke-width="8"/>"##,
    r##"<text x="100" y="108" font-family="sans-serif" font-size="14" text-anchor="middle" fill="#6b7280">QR offline</text>"##,
    r##"</svg>"##
);

/// Where a response handed back to the page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
    /// Synthesized by the manager (offline JSON, placeholder image).
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Respond {
        response: Response,
        source: ResponseSource,
    },
    /// Not intercepted: the host performs the request itself.
    PassThrough,
    /// Intercepted, but nothing can be served (network error for the page).
    NoResponse,
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::Respond { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            FetchOutcome::Respond { source, .. } => Some(*source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Fallback {
    None,
    QrPlaceholder,
    OfflineJson,
}

pub(crate) fn offline_response() -> Response {
    Response::new(503)
        .with_header("content-type", "application/json")
        .with_header("cache-control", "no-store")
        .with_body(OFFLINE_BODY)
}

pub(crate) fn qr_placeholder_response() -> Response {
    Response::new(200)
        .with_header("content-type", "image/svg+xml")
        .with_header("cache-control", "no-store")
        .with_body(QR_PLACEHOLDER_SVG)
}

impl OfflineCacheManager {
    /// Decide how to answer a request made by a controlled page.
    ///
    /// Until a version has been activated nothing is read from or written
    /// to the cache; the route's network and fallback behaviour still apply.
    pub async fn handle_fetch(&self, request: &Request) -> FetchOutcome {
        if request.method != Method::Get {
            debug!(method = %request.method, url = %request.url, "Not a GET, passing through");
            return FetchOutcome::PassThrough;
        }
        if !request.is_same_origin(&self.origin) {
            debug!(url = %request.url, "Cross-origin, passing through");
            return FetchOutcome::PassThrough;
        }

        let active = self.active_partitions().await;
        let active = active.as_ref();

        match self.router.classify(request.path()) {
            RouteKind::StaticAsset => {
                self.cache_first(request, active, Bucket::Static, Fallback::None)
                    .await
            }
            RouteKind::QrImage => {
                self.cache_first(request, active, Bucket::Dynamic, Fallback::QrPlaceholder)
                    .await
            }
            RouteKind::Api => {
                self.network_first(request, active, Bucket::Dynamic, Fallback::OfflineJson)
                    .await
            }
            RouteKind::Page => {
                self.network_first(request, active, Bucket::Dynamic, Fallback::None)
                    .await
            }
        }
    }

    async fn cache_first(
        &self,
        request: &Request,
        active: Option<&ActivePartitions>,
        bucket: Bucket,
        fallback: Fallback,
    ) -> FetchOutcome {
        let key = request.cache_key();

        if let Some(response) = self.lookup(active, &key).await {
            debug!(url = %key, "Cache hit");
            return FetchOutcome::Respond {
                response,
                source: ResponseSource::Cache,
            };
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store(active, bucket, &key, &response).await;
                }
                FetchOutcome::Respond {
                    response,
                    source: ResponseSource::Network,
                }
            }
            Err(e) => {
                if e.is_network_failure() {
                    debug!(url = %key, error = %e, "Offline with nothing cached");
                } else {
                    warn!(url = %key, error = %e, "Fetch failed with nothing cached");
                }
                Self::fallback(fallback)
            }
        }
    }

    async fn network_first(
        &self,
        request: &Request,
        active: Option<&ActivePartitions>,
        bucket: Bucket,
        fallback: Fallback,
    ) -> FetchOutcome {
        let key = request.cache_key();

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store(active, bucket, &key, &response).await;
                }
                FetchOutcome::Respond {
                    response,
                    source: ResponseSource::Network,
                }
            }
            Err(e) => {
                if e.is_network_failure() {
                    debug!(url = %key, error = %e, "Network unavailable, trying cache");
                } else {
                    warn!(url = %key, error = %e, "Request failed, trying cache");
                }
                match self.lookup(active, &key).await {
                    Some(response) => FetchOutcome::Respond {
                        response,
                        source: ResponseSource::Cache,
                    },
                    None => {
                        debug!(url = %key, "No cached copy");
                        Self::fallback(fallback)
                    }
                }
            }
        }
    }

    fn fallback(fallback: Fallback) -> FetchOutcome {
        let response = match fallback {
            Fallback::None => return FetchOutcome::NoResponse,
            Fallback::QrPlaceholder => qr_placeholder_response(),
            Fallback::OfflineJson => offline_response(),
        };
        FetchOutcome::Respond {
            response,
            source: ResponseSource::Fallback,
        }
    }

    /// Cache read over the active partitions that treats storage errors as
    /// a miss.
    async fn lookup(&self, active: Option<&ActivePartitions>, key: &str) -> Option<Response> {
        for name in active?.search_order() {
            match self.storage.match_in(name, key).await {
                Ok(Some(cached)) => return Some(cached.response),
                Ok(None) => {}
                Err(e) => {
                    warn!(partition = name, url = %key, error = %e, "Cache read failed, treating as miss");
                    return None;
                }
            }
        }
        None
    }

    /// Cache write that never fails the request.
    async fn store(&self, active: Option<&ActivePartitions>, bucket: Bucket, key: &str, response: &Response) {
        let Some(active) = active else {
            debug!(url = %key, "No active version, not caching");
            return;
        };
        let partition = active.name(bucket);
        if let Err(e) = self.storage.put(partition, key, response).await {
            warn!(partition, url = %key, error = %e, "Cache write failed, serving uncached");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_response_shape() {
        let resp = offline_response();
        assert_eq!(resp.status, 503);
        assert_eq!(resp.content_type(), Some("application/json"));
        let body: serde_json::Value = resp.parse_json().unwrap();
        assert_eq!(body["error"], "offline");
        assert_eq!(body["offline"], true);
    }

    #[test]
    fn test_placeholder_is_svg() {
        let resp = qr_placeholder_response();
        assert!(resp.is_ok());
        assert_eq!(resp.content_type(), Some("image/svg+xml"));
        assert!(resp.text().starts_with("<svg"));
    }

    #[test]
    fn test_outcome_accessors() {
        let outcome = FetchOutcome::Respond {
            response: Response::new(200),
            source: ResponseSource::Cache,
        };
        assert_eq!(outcome.source(), Some(ResponseSource::Cache));
        assert!(FetchOutcome::PassThrough.response().is_none());
        assert!(FetchOutcome::NoResponse.source().is_none());
    }
}
