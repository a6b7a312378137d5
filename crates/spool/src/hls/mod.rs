// HLS capture pipeline: playlist resolution, windowed segment download and
// reassembly of the downloaded segments.

pub mod events;
pub mod fetcher;
pub mod output;
pub mod playlist;
pub mod retry;
pub mod scheduler;

// Re-exports for easier access
pub use events::{ChannelSink, NoopSink, Phase, ProgressEvent, ProgressSink};
pub use fetcher::Fetcher;
pub use output::{MediaArtifact, MediaAssembler, MediaType, infer_media_type};
pub use playlist::{Manifest, PlaylistResolver, SegmentReference, VariantDescriptor};
pub use retry::RetryPolicy;
pub use scheduler::{SegmentDownloadManager, SegmentResult};
