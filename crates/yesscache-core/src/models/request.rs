use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::api::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "OPTIONS" => Ok(Method::Options),
            other => Err(ApiError::InvalidRequest(format!("unsupported method: {}", other))),
        }
    }
}

/// An outgoing request as seen by the cache manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url)
    }

    /// Parse a method and absolute URL into a request.
    pub fn parse(method: &str, url: &str) -> Result<Self, ApiError> {
        let method = method.parse()?;
        let url = Url::parse(url)
            .map_err(|e| ApiError::InvalidRequest(format!("invalid url {}: {}", url, e)))?;
        Ok(Self::new(method, url))
    }

    /// Build a JSON POST request.
    pub fn post_json<T: Serialize>(url: Url, body: &T) -> Result<Self, ApiError> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| ApiError::InvalidRequest(format!("failed to encode body: {}", e)))?;
        Ok(Self {
            method: Method::Post,
            url,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(bytes),
        })
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Whether this request targets the given origin (scheme, host and port).
    pub fn is_same_origin(&self, origin: &Url) -> bool {
        self.url.origin() == origin.origin()
    }

    /// Key under which a response to this request is cached.
    ///
    /// Fragments never reach the server, so they are not part of the key.
    pub fn cache_key(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse_is_case_insensitive() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("Post".parse::<Method>().unwrap(), Method::Post);
        assert!("TRACE".parse::<Method>().is_err());
    }

    #[test]
    fn test_same_origin() {
        let origin = Url::parse("https://play.yessplora.app").unwrap();
        let local = Request::parse("GET", "https://play.yessplora.app/api/levels").unwrap();
        let other_port = Request::parse("GET", "https://play.yessplora.app:8443/api").unwrap();
        let cdn = Request::parse("GET", "https://fonts.example.com/a.woff2").unwrap();

        assert!(local.is_same_origin(&origin));
        assert!(!other_port.is_same_origin(&origin));
        assert!(!cdn.is_same_origin(&origin));
    }

    #[test]
    fn test_cache_key_drops_fragment_keeps_query() {
        let req = Request::parse("GET", "https://play.yessplora.app/index.html?v=2#top").unwrap();
        assert_eq!(req.cache_key(), "https://play.yessplora.app/index.html?v=2");
    }

    #[test]
    fn test_post_json_sets_content_type() {
        let url = Url::parse("https://play.yessplora.app/api/sync").unwrap();
        let req = Request::post_json(url, &serde_json::json!({"items": []})).unwrap();
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.body.as_deref(), Some(br#"{"items":[]}"#.as_slice()));
        assert!(req
            .headers
            .iter()
            .any(|(k, v)| k == "content-type" && v == "application/json"));
    }
}
