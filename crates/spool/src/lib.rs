// Spool engine: captures an HLS playlist into a single media file
pub mod capture;
pub mod config;
pub mod error;
pub mod hls;
pub mod http;
pub mod naming;
pub mod proxy;
pub mod session;

#[cfg(test)]
mod test_utils;

// Export common types for ease of use
pub use capture::{CaptureReceiver, ManifestCapture, capture_channel, is_manifest_url};
pub use config::{
    DownloaderConfig, FetcherConfig, PlaylistConfig, SchedulerConfig, SpoolConfig,
    SpoolConfigBuilder,
};
pub use error::SpoolError;
pub use hls::{
    ChannelSink, MediaArtifact, MediaType, NoopSink, Phase, ProgressEvent, ProgressSink,
    SegmentReference, SegmentResult,
};
pub use http::{HttpResponse, HttpTransport, ReqwestTransport};
pub use naming::{sanitize_filename, sanitize_stem, validate_filename};
pub use proxy::{ProxyAuth, ProxyConfig, ProxyType};
pub use session::{CaptureSession, CapturedMedia};
