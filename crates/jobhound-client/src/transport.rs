use std::time::Duration;

use jobhound_core::error::AppError;
use jobhound_core::http::{HttpMethod, HttpRequest, HttpResponse};
use jobhound_core::traits::HttpTransport;
use reqwest::{Client, Proxy};
use url::Url;

/// Construction options for [`ReqwestTransport`].
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Whole-request timeout, connect through body.
    pub timeout: Duration,
    /// Optional `http`, `https` or `socks5` proxy for every request.
    pub proxy: Option<String>,
}

impl TransportOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Route through `proxy`. A blank string means no proxy.
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        let proxy = proxy.into();
        self.proxy = (!proxy.trim().is_empty()).then_some(proxy);
        self
    }
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            proxy: None,
        }
    }
}

/// HTTP transport using reqwest.
///
/// Sends exactly what it is given: headers, pacing and retries come from
/// the [`TransportGuard`](jobhound_core::guard::TransportGuard) wrapping it.
/// Non-2xx answers are returned as responses, not errors.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, AppError> {
        Self::with_options(&TransportOptions::default())
    }

    pub fn with_options(options: &TransportOptions) -> Result<Self, AppError> {
        let mut builder = Client::builder()
            .timeout(options.timeout)
            .min_tls_version(reqwest::tls::Version::TLS_1_2);

        if let Some(proxy) = &options.proxy {
            builder = builder.proxy(parse_proxy(proxy)?);
        }

        let client = builder
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: options.timeout.as_secs(),
        })
    }
}

impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, AppError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))?;

        Ok(HttpResponse::new(status, body))
    }
}

impl ReqwestTransport {
    fn map_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            AppError::NetworkError(format!("Connection failed: {e}"))
        } else {
            AppError::HttpError(e.to_string())
        }
    }
}

/// Validate a proxy URL before handing it to reqwest.
fn parse_proxy(raw: &str) -> Result<Proxy, AppError> {
    let url = Url::parse(raw).map_err(|e| AppError::InvalidProxy(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" | "socks5" | "socks5h" => {}
        scheme => {
            return Err(AppError::InvalidProxy(format!(
                "{raw}: unsupported scheme '{scheme}'"
            )));
        }
    }
    if url.host_str().is_none() {
        return Err(AppError::InvalidProxy(format!("{raw}: missing host")));
    }
    Proxy::all(url.as_str()).map_err(|e| AppError::InvalidProxy(format!("{raw}: {e}")))
}
