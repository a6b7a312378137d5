// Byte-fetch capability: the only place the engine touches the network.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use tracing::trace;
use url::Url;

use crate::config::DownloaderConfig;
use crate::error::SpoolError;
use crate::proxy::build_proxy_from_config;

/// A complete, buffered HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// `GET(url) -> (status, headers, body)` plus a metadata-only probe.
///
/// Implementations return `Err` only when no HTTP response was received at
/// all; any status code, successful or not, is an `Ok` response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<HttpResponse, SpoolError>;

    async fn head(&self, url: &Url) -> Result<HttpResponse, SpoolError>;
}

/// Builds the shared reqwest client from the downloader configuration.
pub fn create_client(config: &DownloaderConfig) -> Result<Client, SpoolError> {
    let mut builder = Client::builder()
        .connect_timeout(config.connect_timeout)
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .danger_accept_invalid_certs(config.danger_accept_invalid_certs)
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::default()
        } else {
            reqwest::redirect::Policy::none()
        });

    if !config.timeout.is_zero() {
        builder = builder.timeout(config.timeout);
    }

    if let Some(proxy_config) = &config.proxy {
        builder = builder.proxy(build_proxy_from_config(proxy_config)?);
    }

    builder
        .build()
        .map_err(|e| SpoolError::configuration(format!("failed to build HTTP client: {e}")))
}

/// [`HttpTransport`] backed by a `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &DownloaderConfig) -> Result<Self, SpoolError> {
        Ok(Self::new(create_client(config)?))
    }

    async fn collect(url: &Url, response: reqwest::Response) -> Result<HttpResponse, SpoolError> {
        let status = response.status();
        let headers = response.headers().clone();
        trace!(url = %url, status = %status, version = ?response.version(), "Received response");
        let body = response
            .bytes()
            .await
            .map_err(|e| SpoolError::transport(url.as_str(), e))?;
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse, SpoolError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| SpoolError::transport(url.as_str(), e))?;
        Self::collect(url, response).await
    }

    async fn head(&self, url: &Url) -> Result<HttpResponse, SpoolError> {
        let response = self
            .client
            .head(url.clone())
            .send()
            .await
            .map_err(|e| SpoolError::transport(url.as_str(), e))?;
        Ok(HttpResponse {
            status: response.status(),
            headers: response.headers().clone(),
            body: Bytes::new(),
        })
    }
}
