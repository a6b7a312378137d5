use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use spool_engine::{ProxyConfig, ProxyType, SpoolConfig};
use tracing::debug;

use crate::cli::Args;
use crate::error::{AppError, Result};

/// Label used when none is given on the command line or in the config file.
pub const DEFAULT_LABEL: &str = "twitter_space";

/// Settings read from `config.toml`; every field is optional in the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub concurrency: usize,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub retry_jitter: bool,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub follow_redirects: bool,
    pub max_depth: usize,
    pub probe_bandwidth: bool,
    pub user_agent: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub proxy: Option<String>,
    pub proxy_username: Option<String>,
    pub proxy_password: Option<String>,
    pub output_dir: PathBuf,
    pub default_label: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let engine = SpoolConfig::default();
        Self {
            concurrency: engine.scheduler.download_concurrency,
            max_attempts: engine.fetcher.max_attempts,
            retry_delay_ms: engine.fetcher.retry_base_delay.as_millis() as u64,
            retry_jitter: engine.fetcher.retry_jitter,
            timeout_secs: engine.base.timeout.as_secs(),
            connect_timeout_secs: engine.base.connect_timeout.as_secs(),
            follow_redirects: engine.base.follow_redirects,
            max_depth: engine.playlist.max_depth,
            probe_bandwidth: engine.playlist.probe_bandwidth,
            user_agent: None,
            headers: BTreeMap::new(),
            proxy: None,
            proxy_username: None,
            proxy_password: None,
            output_dir: PathBuf::from("."),
            default_label: DEFAULT_LABEL.to_string(),
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("spool").join("config.toml"))
    }

    /// Loads `path`, or the default location when `path` is `None`.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.is_file() => path,
                _ => {
                    debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let text = std::fs::read_to_string(&path).map_err(|source| AppError::ConfigRead {
            path: path.clone(),
            source,
        })?;
        let config = Self::parse(&text).map_err(|source| AppError::ConfigParse {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    pub fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Applies command-line flags on top of the file settings.
    pub fn with_overrides(mut self, args: &Args) -> Result<Self> {
        if let Some(concurrency) = args.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(attempts) = args.max_attempts {
            self.max_attempts = attempts;
        }
        if let Some(delay) = args.retry_delay_ms {
            self.retry_delay_ms = delay;
        }
        if let Some(timeout) = args.timeout {
            self.timeout_secs = timeout;
        }
        if let Some(timeout) = args.connect_timeout {
            self.connect_timeout_secs = timeout;
        }
        if let Some(user_agent) = &args.user_agent {
            self.user_agent = Some(user_agent.clone());
        }
        for header in &args.headers {
            let (name, value) = parse_header(header)?;
            self.headers.insert(name, value);
        }
        if let Some(proxy) = &args.proxy {
            self.proxy = Some(proxy.clone());
            self.proxy_username = args.proxy_username.clone();
            self.proxy_password = args.proxy_password.clone();
        }
        if let Some(dir) = &args.output_dir {
            self.output_dir = dir.clone();
        }
        Ok(self)
    }

    pub fn label(&self, name: Option<&str>) -> String {
        let label = name.unwrap_or(&self.default_label).trim();
        if label.is_empty() {
            DEFAULT_LABEL.to_string()
        } else {
            label.to_string()
        }
    }

    pub fn to_spool_config(&self, proxy_type: Option<ProxyType>) -> Result<SpoolConfig> {
        let mut builder = SpoolConfig::builder()
            .with_concurrency(self.concurrency)
            .with_max_attempts(self.max_attempts)
            .with_retry_base_delay(Duration::from_millis(self.retry_delay_ms))
            .with_retry_jitter(self.retry_jitter)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .with_follow_redirects(self.follow_redirects)
            .with_max_depth(self.max_depth)
            .with_bandwidth_probe(self.probe_bandwidth);

        if let Some(user_agent) = &self.user_agent {
            builder = builder.with_user_agent(user_agent);
        }
        for (name, value) in &self.headers {
            builder = builder.with_header(name, value)?;
        }
        if let Some(url) = &self.proxy {
            let mut proxy = ProxyConfig::from_url(url);
            if let Some(proxy_type) = proxy_type {
                proxy.proxy_type = proxy_type;
            }
            if let Some(username) = &self.proxy_username {
                proxy = proxy.with_auth(username, self.proxy_password.as_deref().unwrap_or(""));
            }
            builder = builder.with_proxy(proxy);
        }

        Ok(builder.build()?)
    }
}

/// Splits a `Name: value` header argument.
fn parse_header(header: &str) -> Result<(String, String)> {
    header
        .split_once(':')
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| AppError::InvalidInput(format!("Invalid header format: {header}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use spool_engine::SpoolError;

    #[test]
    fn empty_file_gives_engine_defaults() {
        let config = AppConfig::parse("").unwrap();
        let engine = config.to_spool_config(None).unwrap();
        assert_eq!(engine.scheduler.download_concurrency, 5);
        assert_eq!(engine.fetcher.max_attempts, 3);
        assert_eq!(engine.fetcher.retry_base_delay, Duration::from_secs(1));
        assert_eq!(config.default_label, DEFAULT_LABEL);
        assert_eq!(engine.base.connect_timeout, Duration::from_secs(30));
        assert!(engine.base.follow_redirects);
    }

    #[test]
    fn connection_settings_reach_engine() {
        let args = Args::try_parse_from([
            "spool",
            "https://x.test/p.m3u8",
            "--connect-timeout",
            "7",
        ])
        .unwrap();
        let config = AppConfig::parse("follow_redirects = false\nconnect_timeout_secs = 3")
            .unwrap()
            .with_overrides(&args)
            .unwrap();
        let engine = config.to_spool_config(None).unwrap();
        assert_eq!(engine.base.connect_timeout, Duration::from_secs(7));
        assert!(!engine.base.follow_redirects);
    }

    #[test]
    fn file_values_are_applied() {
        let config = AppConfig::parse(
            r#"
concurrency = 2
retry_delay_ms = 250
output_dir = "/tmp/spaces"
proxy = "socks5://127.0.0.1:1080"

[headers]
Referer = "https://x.com/"
"#,
        )
        .unwrap();
        let engine = config.to_spool_config(None).unwrap();
        assert_eq!(engine.scheduler.download_concurrency, 2);
        assert_eq!(engine.fetcher.retry_base_delay, Duration::from_millis(250));
        assert_eq!(engine.base.headers["referer"].to_str().unwrap(), "https://x.com/");
        assert_eq!(engine.base.proxy.unwrap().proxy_type, ProxyType::Socks5);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/spaces"));
    }

    #[test]
    fn flags_override_file() {
        let args = Args::try_parse_from([
            "spool",
            "https://x.test/p.m3u8",
            "--concurrency",
            "9",
            "-H",
            "Cookie: a=b",
            "-o",
            "out",
        ])
        .unwrap();
        let config = AppConfig::parse("concurrency = 2")
            .unwrap()
            .with_overrides(&args)
            .unwrap();
        assert_eq!(config.concurrency, 9);
        assert_eq!(config.headers["Cookie"], "a=b");
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn zero_concurrency_is_a_config_error() {
        let config = AppConfig::parse("concurrency = 0").unwrap();
        assert!(matches!(
            config.to_spool_config(None),
            Err(AppError::Capture(SpoolError::Configuration { .. }))
        ));
    }

    #[test]
    fn malformed_header_is_rejected() {
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
        assert_eq!(
            parse_header("X-Token:  abc ").unwrap(),
            ("X-Token".to_string(), "abc".to_string())
        );
    }

    #[test]
    fn blank_labels_fall_back() {
        let config = AppConfig::default();
        assert_eq!(config.label(None), DEFAULT_LABEL);
        assert_eq!(config.label(Some("   ")), DEFAULT_LABEL);
        assert_eq!(config.label(Some(" Weekly ")), "Weekly");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, AppError::ConfigRead { .. }));
    }
}
