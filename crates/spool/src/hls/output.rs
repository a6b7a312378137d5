// HLS Output: compacts downloaded segments into one media artifact.
// Byte order is governed by sequence index only; completion order never matters.

use crate::error::SpoolError;
use crate::hls::scheduler::SegmentResult;
use bytes::{Bytes, BytesMut};
use std::fmt;
use tracing::{debug, info};
use url::Url;

const VIDEO_EXTENSIONS: &[&str] = &["ts", "mp4", "m4s"];

/// Container type of an assembled artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    VideoMp4,
    AudioMpeg,
}

impl MediaType {
    pub fn mime(self) -> &'static str {
        match self {
            MediaType::VideoMp4 => "video/mp4",
            MediaType::AudioMpeg => "audio/mpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            MediaType::VideoMp4 => "mp4",
            MediaType::AudioMpeg => "mp3",
        }
    }

    pub fn is_video(self) -> bool {
        self == MediaType::VideoMp4
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaArtifact {
    pub bytes: Bytes,
    pub media_type: MediaType,
}

impl MediaArtifact {
    pub fn has_video(&self) -> bool {
        self.media_type.is_video()
    }

    pub fn mime(&self) -> &'static str {
        self.media_type.mime()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Lowercased extension of the last path segment, ignoring query and fragment.
fn path_extension(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    let file = path.rsplit('/').next()?;
    let (stem, ext) = file.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Video if any segment URL carries a video extension, audio otherwise.
pub fn infer_media_type<S: AsRef<str>>(urls: &[S]) -> MediaType {
    let has_video = urls.iter().any(|url| {
        path_extension(url.as_ref())
            .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
    });
    if has_video {
        MediaType::VideoMp4
    } else {
        MediaType::AudioMpeg
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MediaAssembler;

impl MediaAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Concatenates the successful results in ascending sequence order.
    pub fn assemble<S: AsRef<str>>(
        &self,
        results: &[SegmentResult],
        original_urls: &[S],
    ) -> Result<MediaArtifact, SpoolError> {
        let mut kept: Vec<&SegmentResult> = results.iter().filter(|r| r.ok).collect();
        if kept.is_empty() {
            return Err(SpoolError::empty_artifact(format!(
                "all {} segments failed",
                results.len()
            )));
        }
        kept.sort_by_key(|r| r.sequence_index);

        let total_len: usize = kept.iter().map(|r| r.bytes.len()).sum();
        if total_len == 0 {
            return Err(SpoolError::empty_artifact(
                "downloaded segments contain no data",
            ));
        }

        let mut buffer = BytesMut::with_capacity(total_len);
        for result in &kept {
            debug!(index = result.sequence_index, len = result.bytes.len(), "Appending segment");
            buffer.extend_from_slice(&result.bytes);
        }

        let media_type = infer_media_type(original_urls);
        info!(
            segments = kept.len(),
            skipped = results.len() - kept.len(),
            bytes = total_len,
            mime = media_type.mime(),
            "Assembled media artifact"
        );
        Ok(MediaArtifact {
            bytes: buffer.freeze(),
            media_type,
        })
    }
}
