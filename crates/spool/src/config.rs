use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::SpoolError;
use crate::hls::retry::RetryPolicy;
use crate::proxy::ProxyConfig;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

/// HTTP client options for the default transport
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Overall timeout for a single HTTP request (zero disables it)
    pub timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// User agent string
    pub user_agent: String,

    /// Custom HTTP headers for requests
    pub headers: HeaderMap,

    /// Proxy configuration (optional)
    pub proxy: Option<ProxyConfig>,

    pub danger_accept_invalid_certs: bool,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(30),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: DownloaderConfig::get_default_headers(),
            proxy: None,
            danger_accept_invalid_certs: false,
        }
    }
}

impl DownloaderConfig {
    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(
            reqwest::header::ACCEPT_ENCODING,
            HeaderValue::from_static("gzip, deflate"),
        );
        default_headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));
        default_headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.5"),
        );
        default_headers
    }
}

/// Retry behaviour of the fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Total attempts per resource, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for every further attempt
    pub retry_base_delay: Duration,
    /// Upper bound on a single backoff delay
    pub retry_max_delay: Duration,
    /// Add random jitter of [0, base/2) to each delay
    pub retry_jitter: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(30),
            retry_jitter: false,
        }
    }
}

impl FetcherConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: self.retry_base_delay,
            max_delay: self.retry_max_delay,
            jitter: self.retry_jitter,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Number of segments fetched concurrently in one window
    pub download_concurrency: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            download_concurrency: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlaylistConfig {
    /// Maximum number of master -> variant hops followed
    pub max_depth: usize,
    /// HEAD-probe variants whose stream-info line carries no usable bandwidth
    pub probe_bandwidth: bool,
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            probe_bandwidth: true,
        }
    }
}

// --- Top-Level Configuration ---
#[derive(Debug, Clone, Default)]
pub struct SpoolConfig {
    /// HTTP client configuration
    pub base: DownloaderConfig,
    pub fetcher: FetcherConfig,
    pub scheduler: SchedulerConfig,
    pub playlist: PlaylistConfig,
}

impl SpoolConfig {
    pub fn builder() -> SpoolConfigBuilder {
        SpoolConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<(), SpoolError> {
        if self.scheduler.download_concurrency == 0 {
            return Err(SpoolError::configuration(
                "download concurrency must be at least 1",
            ));
        }
        if self.fetcher.max_attempts == 0 {
            return Err(SpoolError::configuration("max attempts must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct SpoolConfigBuilder {
    config: SpoolConfig,
}

impl SpoolConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.base.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.base.connect_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.base.user_agent = user_agent.into();
        self
    }

    /// Add a request header. Invalid names or values are rejected.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, SpoolError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| SpoolError::configuration(format!("invalid header name `{name}`: {e}")))?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            SpoolError::configuration(format!("invalid value for header `{name}`: {e}"))
        })?;
        self.config.base.headers.insert(name, value);
        Ok(self)
    }

    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.config.base.proxy = Some(proxy);
        self
    }

    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.config.base.follow_redirects = follow;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.config.fetcher.max_attempts = attempts;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.config.fetcher.retry_base_delay = delay;
        self
    }

    pub fn with_retry_jitter(mut self, jitter: bool) -> Self {
        self.config.fetcher.retry_jitter = jitter;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.config.scheduler.download_concurrency = concurrency;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.config.playlist.max_depth = depth;
        self
    }

    pub fn with_bandwidth_probe(mut self, enabled: bool) -> Self {
        self.config.playlist.probe_bandwidth = enabled;
        self
    }

    pub fn build(self) -> Result<SpoolConfig, SpoolError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
