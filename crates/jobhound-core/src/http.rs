use std::collections::BTreeMap;

use url::Url;

use crate::error::AppError;

/// HTTP method set needed by source adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Transport-agnostic request envelope built by adapters and executed
/// through the [`TransportGuard`](crate::guard::TransportGuard).
///
/// Header names are stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    /// Build a GET request with URL-encoded query parameters.
    pub fn get_with_query(base: &str, params: &[(&str, &str)]) -> Result<Self, AppError> {
        let url = Url::parse_with_params(base, params)
            .map_err(|e| AppError::HttpError(format!("Invalid URL {base}: {e}")))?;
        Ok(Self::get(url.as_str()))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Host key used for pacing: the host, plus the port when it is explicit.
    pub fn host_key(&self) -> Result<String, AppError> {
        let url = Url::parse(&self.url)
            .map_err(|e| AppError::HttpError(format!("Invalid URL {}: {e}", self.url)))?;
        let host = url
            .host_str()
            .ok_or_else(|| AppError::HttpError(format!("URL has no host: {}", self.url)))?;
        Ok(match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }
}

/// Fully-buffered response returned by an [`HttpTransport`](crate::traits::HttpTransport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_key_extracts_host() {
        let req = HttpRequest::get("https://example.com/path?q=1");
        assert_eq!(req.host_key().unwrap(), "example.com");

        let req = HttpRequest::get("http://127.0.0.1:8080/page");
        assert_eq!(req.host_key().unwrap(), "127.0.0.1:8080");
    }

    #[test]
    fn host_key_rejects_invalid_url() {
        let err = HttpRequest::get("not-a-url").host_key().unwrap_err();
        assert!(matches!(err, AppError::HttpError(_)));
    }

    #[test]
    fn headers_are_case_insensitive() {
        let req = HttpRequest::get("https://example.com").with_header("Accept", "application/json");
        assert_eq!(req.header("accept"), Some("application/json"));
        assert_eq!(req.header("ACCEPT"), Some("application/json"));
    }

    #[test]
    fn query_params_are_encoded() {
        let req = HttpRequest::get_with_query(
            "https://example.com/jobs",
            &[("q", "rust developer"), ("l", "São Paulo")],
        )
        .unwrap();
        assert_eq!(
            req.url,
            "https://example.com/jobs?q=rust+developer&l=S%C3%A3o+Paulo"
        );
    }
}
