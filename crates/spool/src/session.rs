//! End-to-end capture of one manifest: resolve, download, assemble, name.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::config::SpoolConfig;
use crate::error::SpoolError;
use crate::hls::events::{Phase, ProgressEvent, ProgressSink};
use crate::hls::fetcher::Fetcher;
use crate::hls::output::{MediaArtifact, MediaAssembler};
use crate::hls::playlist::PlaylistResolver;
use crate::hls::scheduler::SegmentDownloadManager;
use crate::http::{HttpTransport, ReqwestTransport};
use crate::naming::{sanitize_filename, validate_filename};

/// Result of a successful capture, ready to be persisted.
#[derive(Debug, Clone)]
pub struct CapturedMedia {
    pub artifact: MediaArtifact,
    pub filename: String,
    pub segments_total: usize,
    pub segments_failed: usize,
}

impl CapturedMedia {
    pub fn mime(&self) -> &'static str {
        self.artifact.mime()
    }
}

/// Runs the capture pipeline. Holds no state between runs.
pub struct CaptureSession {
    config: SpoolConfig,
    transport: Arc<dyn HttpTransport>,
}

impl CaptureSession {
    pub fn new(config: SpoolConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self { config, transport }
    }

    /// Session backed by a reqwest client built from `config.base`.
    pub fn from_config(config: SpoolConfig) -> Result<Self, SpoolError> {
        config.validate()?;
        let transport = ReqwestTransport::from_config(&config.base)?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    pub fn config(&self) -> &SpoolConfig {
        &self.config
    }

    /// Captures `manifest_url` into a single media artifact named after `label`.
    ///
    /// Any failure is reported to `sink` as exactly one `Failed` event carrying
    /// the error message before it is returned.
    #[instrument(skip(self, sink, token), fields(url = %manifest_url))]
    pub async fn run(
        &self,
        manifest_url: &str,
        label: &str,
        sink: &dyn ProgressSink,
        token: &CancellationToken,
    ) -> Result<CapturedMedia, SpoolError> {
        match self.run_stages(manifest_url, label, sink, token).await {
            Ok(media) => Ok(media),
            Err(e) => {
                error!(error = %e, "Capture failed");
                sink.on_progress(ProgressEvent::failed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        manifest_url: &str,
        label: &str,
        sink: &dyn ProgressSink,
        token: &CancellationToken,
    ) -> Result<CapturedMedia, SpoolError> {
        self.config.validate()?;
        let fetcher = Fetcher::new(Arc::clone(&self.transport), self.config.fetcher.retry_policy());

        sink.on_progress(ProgressEvent::new(Phase::Resolving, 0, 0));
        let resolver = PlaylistResolver::new(fetcher.clone(), self.config.playlist.clone());
        let segments = resolver.resolve(manifest_url).await?;
        let total = segments.len();

        let downloader = SegmentDownloadManager::new(fetcher, self.config.scheduler.clone());
        let results = downloader.download_all(&segments, sink, token).await?;
        let failed = results.iter().filter(|r| !r.ok).count();

        sink.on_progress(ProgressEvent::new(Phase::Assembling, total, total));
        let urls: Vec<&str> = segments.iter().map(|s| s.url.as_str()).collect();
        let artifact = MediaAssembler::new().assemble(&results, &urls)?;

        let filename = sanitize_filename(label, artifact.has_video());
        validate_filename(&filename)?;

        info!(
            filename = %filename,
            bytes = artifact.len(),
            segments = total,
            failed,
            "Capture complete"
        );
        sink.on_progress(ProgressEvent::new(Phase::Done, total, total));

        Ok(CapturedMedia {
            artifact,
            filename,
            segments_total: total,
            segments_failed: failed,
        })
    }
}
