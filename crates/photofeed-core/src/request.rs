//! Request construction for the photo API
//!
//! Requests are plain values ([`ApiRequest`]) so that transports, test
//! doubles and logs all see the same thing. Building one can fail when the
//! base URL or a path segment is malformed; that failure is reported as
//! [`Error::RequestConstruction`] and no request is issued.

use crate::error::{Error, Result};
use std::fmt;
use url::Url;

/// Path of the paginated photo listing
pub const PHOTOS_PATH: &str = "/photos";

/// HTTP methods used by the photo API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    /// Upper-case method name
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully built request, ready for a [`Transport`](crate::traits::Transport)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Path relative to the base URL (e.g. `/photos`)
    pub path: String,
    /// Query parameters, in order
    pub query: Vec<(String, String)>,
    /// Absolute URL including the query string
    pub url: String,
}

impl ApiRequest {
    /// Look up a query parameter by name
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Builds [`ApiRequest`]s against a base URL
#[derive(Debug, Clone)]
pub struct RequestFactory {
    base_url: String,
    base: Result<Url>,
}

impl RequestFactory {
    /// Create a factory for `base_url` (e.g. `https://api.unsplash.com`)
    ///
    /// The URL is parsed once here. A malformed URL is only reported when a
    /// request is built.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base = parse_base_url(&base_url);

        Self { base_url, base }
    }

    /// The configured base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /photos?page=<page>&per_page=<per_page>`
    pub fn page_request(&self, page: u32, per_page: u32) -> Result<ApiRequest> {
        self.build(
            PHOTOS_PATH,
            HttpMethod::Get,
            &[("page", page.to_string()), ("per_page", per_page.to_string())],
        )
    }

    /// `POST /photos/<id>/like` when `like` is true, `DELETE` otherwise
    pub fn like_request(&self, photo_id: &str, like: bool) -> Result<ApiRequest> {
        validate_photo_id(photo_id)?;

        let method = if like { HttpMethod::Post } else { HttpMethod::Delete };
        self.build(&format!("{}/{}/like", PHOTOS_PATH, photo_id), method, &[])
    }

    /// Build a request for `path` with the given query parameters
    ///
    /// Path segments and query values are percent-encoded.
    pub fn build(
        &self,
        path: &str,
        method: HttpMethod,
        query: &[(&str, String)],
    ) -> Result<ApiRequest> {
        let mut url = self.base.clone()?;

        if !path.starts_with('/') {
            return Err(Error::request(format!("Path must start with '/': {}", path)));
        }

        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                Error::request(format!("Base URL cannot take a path: '{}'", self.base_url))
            })?;
            segments.pop_if_empty();
            segments.extend(path.split('/').filter(|segment| !segment.is_empty()));
        }

        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        Ok(ApiRequest {
            method,
            path: path.to_string(),
            query: query
                .iter()
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect(),
            url: url.to_string(),
        })
    }
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    let url = Url::parse(base_url)
        .map_err(|e| Error::request(format!("Invalid base URL '{}': {}", base_url, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::request(format!(
            "Base URL must use http or https: '{}'",
            base_url
        )));
    }

    if url.cannot_be_a_base() || url.host_str().is_none_or(str::is_empty) {
        return Err(Error::request(format!("Base URL has no host: '{}'", base_url)));
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(Error::request(format!(
            "Base URL cannot carry a query or fragment: '{}'",
            base_url
        )));
    }

    Ok(url)
}

/// A photo id must be exactly one path segment
fn validate_photo_id(photo_id: &str) -> Result<()> {
    if photo_id.is_empty() || photo_id == "." || photo_id == ".." {
        return Err(Error::request(format!("Invalid photo id: '{}'", photo_id)));
    }

    if photo_id
        .chars()
        .any(|c| c == '/' || c == '\\' || c.is_whitespace() || c.is_control())
    {
        return Err(Error::request(format!(
            "Photo id is not a single path segment: '{}'",
            photo_id
        )));
    }

    Ok(())
}
