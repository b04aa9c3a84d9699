//! Network access for the offline cache manager.
//!
//! The manager never talks to `reqwest` directly: it goes through the
//! [`Fetcher`] trait so hosts and tests can substitute their own network.
//! [`ApiClient`] is the production implementation.

pub mod client;
pub mod error;

use async_trait::async_trait;

pub use client::ApiClient;
pub use error::ApiError;

use crate::models::{Request, Response};

/// Performs a request against the network.
///
/// `Err` means no response was obtained at all. Any HTTP status, including
/// 4xx/5xx, is returned as `Ok` so callers can decide what to cache.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, ApiError>;
}
