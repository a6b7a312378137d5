use std::path::PathBuf;

use clap::Parser;
use spool_engine::ProxyType;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Playlist (.m3u8) URL to capture
    #[arg(required_unless_present = "stdin")]
    pub url: Option<String>,

    /// Read observed URLs from stdin and capture the first playlist among them
    #[arg(long, conflicts_with = "url")]
    pub stdin: bool,

    /// Label used to derive the output file name (e.g. the space title)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Directory the media file is written to
    #[arg(short, long, env = "SPOOL_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Number of segments downloaded concurrently
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Attempts per request, including the first one
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Delay before the first retry in milliseconds; doubles on every retry
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Connection timeout in seconds
    #[arg(long)]
    pub connect_timeout: Option<u64>,

    /// User agent sent with every request
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Extra request header, `Name: value` (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Proxy URL (http://, https:// or socks5://)
    #[arg(long)]
    pub proxy: Option<String>,

    /// Override the proxy type inferred from the URL scheme
    #[arg(long, requires = "proxy")]
    pub proxy_type: Option<ProxyType>,

    /// Proxy username
    #[arg(long, requires = "proxy")]
    pub proxy_username: Option<String>,

    /// Proxy password
    #[arg(long, requires = "proxy_username")]
    pub proxy_password: Option<String>,

    /// Config file (defaults to <config dir>/spool/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors and hide the progress bar
    #[arg(short, long)]
    pub quiet: bool,
}
