// Segment Download Manager: fetches an ordered segment list in fixed-size
// concurrent windows and keeps every result in its original slot.

use crate::config::SchedulerConfig;
use crate::error::SpoolError;
use crate::hls::events::{Phase, ProgressEvent, ProgressSink};
use crate::hls::fetcher::Fetcher;
use crate::hls::playlist::SegmentReference;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outcome of one attempted segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentResult {
    pub sequence_index: usize,
    /// Segment payload; empty when `ok` is false
    pub bytes: Bytes,
    pub ok: bool,
}

impl SegmentResult {
    pub fn success(sequence_index: usize, bytes: Bytes) -> Self {
        Self {
            sequence_index,
            bytes,
            ok: true,
        }
    }

    pub fn failure(sequence_index: usize) -> Self {
        Self {
            sequence_index,
            bytes: Bytes::new(),
            ok: false,
        }
    }
}

pub struct SegmentDownloadManager {
    fetcher: Fetcher,
    config: SchedulerConfig,
}

impl SegmentDownloadManager {
    pub fn new(fetcher: Fetcher, config: SchedulerConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn concurrency(&self) -> usize {
        self.config.download_concurrency
    }

    /// Downloads every segment, `concurrency` at a time.
    ///
    /// Individual segment failures are recorded as `ok = false` results and
    /// never abort the batch. The returned vector has one entry per input
    /// segment, at the same position. Errors are reserved for invalid input,
    /// a zero window size, and cancellation observed between windows.
    pub async fn download_all(
        &self,
        segments: &[SegmentReference],
        sink: &dyn ProgressSink,
        token: &CancellationToken,
    ) -> Result<Vec<SegmentResult>, SpoolError> {
        let window = self.concurrency();
        if window == 0 {
            return Err(SpoolError::configuration(
                "download concurrency must be at least 1",
            ));
        }
        if let Some((position, segment)) = segments
            .iter()
            .enumerate()
            .find(|(position, segment)| segment.sequence_index != *position)
        {
            return Err(SpoolError::invalid_input(format!(
                "segment at position {position} carries sequence index {}",
                segment.sequence_index
            )));
        }

        let total = segments.len();
        let mut slots: Vec<Option<SegmentResult>> = vec![None; total];
        info!(segments = total, concurrency = window, "Starting segment download");

        for batch in segments.chunks(window) {
            if token.is_cancelled() {
                info!("Cancellation requested, stopping before next window");
                return Err(SpoolError::Cancelled);
            }

            let mut in_flight: FuturesUnordered<_> =
                batch.iter().map(|segment| self.download_one(segment)).collect();

            while let Some(result) = in_flight.next().await {
                let slot = &mut slots[result.sequence_index];
                debug_assert!(slot.is_none(), "segment slot written twice");
                *slot = Some(result);
            }

            let first = batch[0].sequence_index;
            let attempted = (first + batch.len()).min(total);
            sink.on_progress(
                ProgressEvent::new(Phase::Downloading, attempted, total).with_detail(format!(
                    "Downloading segment {} to {} of {}",
                    first + 1,
                    attempted,
                    total
                )),
            );
        }

        let results: Vec<SegmentResult> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.unwrap_or_else(|| SegmentResult::failure(index)))
            .collect();
        let failed = results.iter().filter(|r| !r.ok).count();
        info!(
            segments = total,
            ok = total - failed,
            failed,
            "Segment download finished"
        );
        Ok(results)
    }

    async fn download_one(&self, segment: &SegmentReference) -> SegmentResult {
        debug!(index = segment.sequence_index, url = %segment.url, "Downloading segment");
        match self.fetcher.fetch(&segment.url).await {
            Ok(bytes) => SegmentResult::success(segment.sequence_index, bytes),
            Err(e) => {
                warn!(
                    index = segment.sequence_index,
                    url = %segment.url,
                    error = %e,
                    "Segment failed, continuing without it"
                );
                SegmentResult::failure(segment.sequence_index)
            }
        }
    }
}
