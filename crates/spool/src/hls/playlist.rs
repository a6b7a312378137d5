// Playlist Resolver: fetches a manifest, follows master playlists to the best
// variant, and turns a media playlist into an ordered list of segment URLs.

use crate::config::PlaylistConfig;
use crate::error::SpoolError;
use crate::hls::fetcher::Fetcher;
use tracing::{debug, info, warn};
use url::Url;

/// Directive marking the line that precedes a variant URL in a master playlist.
pub const STREAM_INF_TAG: &str = "#EXT-X-STREAM-INF";

/// Response header consulted by the HEAD probe when a variant has no
/// `BANDWIDTH` attribute.
pub const BANDWIDTH_HEADER: &str = "content-bandwidth";

/// A fetched playlist document and the URL it was fetched from.
///
/// Relative references inside `text` resolve against `url`.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub url: Url,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDescriptor {
    pub url: Url,
    /// Advertised bandwidth in bits per second, 0 when unknown.
    pub bandwidth: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentReference {
    /// 0-based position in the media playlist; defines output order.
    pub sequence_index: usize,
    pub url: Url,
}

/// A variant URL found in a master playlist, before its bandwidth is settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantCandidate {
    pub url: Url,
    /// `BANDWIDTH` attribute of the preceding stream-info line, if usable.
    pub declared_bandwidth: Option<u64>,
}

fn is_reference_line(line: &str) -> bool {
    !line.is_empty() && !line.starts_with('#')
}

impl Manifest {
    pub fn new(url: Url, text: impl Into<String>) -> Self {
        Self {
            url,
            text: text.into(),
        }
    }

    pub fn is_master(&self) -> bool {
        self.text.contains(STREAM_INF_TAG)
    }

    fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines().map(str::trim)
    }

    /// Variant references of a master playlist, in document order.
    ///
    /// Only the reference line directly after a stream-info directive counts.
    /// References that cannot be resolved to a URL are dropped.
    pub fn variant_candidates(&self) -> Vec<VariantCandidate> {
        let lines: Vec<&str> = self.lines().collect();
        let mut candidates = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            if !line.starts_with(STREAM_INF_TAG) {
                continue;
            }
            let Some(reference) = lines.get(i + 1).copied().filter(|l| is_reference_line(l))
            else {
                debug!(line = i + 1, "Stream-info directive without a variant reference");
                continue;
            };
            match self.url.join(reference) {
                Ok(url) => {
                    debug!(url = %url, "Resolved variant URL");
                    candidates.push(VariantCandidate {
                        url,
                        declared_bandwidth: parse_bandwidth_attribute(line),
                    });
                }
                Err(e) => {
                    warn!(reference, error = %e, "Dropping unresolvable variant reference");
                }
            }
        }

        candidates
    }

    /// Segment references of a media playlist: every non-empty, non-comment
    /// line, numbered in document order after unresolvable lines are dropped.
    pub fn segment_references(&self) -> Vec<SegmentReference> {
        self.lines()
            .filter(|line| is_reference_line(line))
            .filter_map(|reference| match self.url.join(reference) {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(reference, error = %e, "Dropping unresolvable segment reference");
                    None
                }
            })
            .enumerate()
            .map(|(sequence_index, url)| SegmentReference {
                sequence_index,
                url,
            })
            .collect()
    }
}

/// Splits an attribute list on commas that are not inside quotes.
fn split_attributes(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
}

/// Reads the `BANDWIDTH` attribute from a `#EXT-X-STREAM-INF:` line.
pub fn parse_bandwidth_attribute(line: &str) -> Option<u64> {
    let (_, attributes) = line.split_once(':')?;
    split_attributes(attributes).into_iter().find_map(|attr| {
        let (key, value) = attr.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("BANDWIDTH") {
            value.trim().trim_matches('"').parse().ok()
        } else {
            None
        }
    })
}

/// Picks the variant with strictly greatest bandwidth; the first one wins ties.
pub fn select_variant(variants: &[VariantDescriptor]) -> Option<&VariantDescriptor> {
    variants.iter().fold(None, |best, candidate| match best {
        Some(current) if current.bandwidth >= candidate.bandwidth => Some(current),
        _ => Some(candidate),
    })
}

pub struct PlaylistResolver {
    fetcher: Fetcher,
    config: PlaylistConfig,
}

impl PlaylistResolver {
    pub fn new(fetcher: Fetcher, config: PlaylistConfig) -> Self {
        Self { fetcher, config }
    }

    /// Resolves `manifest_url` into the ordered segments of the best variant.
    pub async fn resolve(&self, manifest_url: &str) -> Result<Vec<SegmentReference>, SpoolError> {
        let mut url = parse_manifest_url(manifest_url)?;

        for depth in 0..=self.config.max_depth {
            let manifest = self.load(&url).await?;

            if !manifest.is_master() {
                let segments = manifest.segment_references();
                if segments.is_empty() {
                    return Err(SpoolError::NoSegments {
                        url: url.to_string(),
                    });
                }
                info!(url = %url, segments = segments.len(), depth, "Resolved media playlist");
                return Ok(segments);
            }

            info!(url = %url, depth, "Detected master playlist, selecting variant");
            let variants = self.describe_variants(&manifest).await;
            let selected = select_variant(&variants).ok_or_else(|| SpoolError::NoVariants {
                url: url.to_string(),
            })?;
            info!(
                url = %selected.url,
                bandwidth = selected.bandwidth,
                candidates = variants.len(),
                "Selected variant playlist"
            );
            url = selected.url.clone();
        }

        Err(SpoolError::manifest(
            url.as_str(),
            format!("playlist nesting exceeds depth {}", self.config.max_depth),
        ))
    }

    /// Fetches a playlist document through the retrying fetcher.
    pub async fn load(&self, url: &Url) -> Result<Manifest, SpoolError> {
        let body = self.fetcher.fetch(url).await.map_err(|err| match err {
            SpoolError::Network {
                url,
                last_status: Some(status),
                ..
            } => SpoolError::manifest(url, format!("HTTP {status}")),
            other => other,
        })?;
        let text = String::from_utf8(body.to_vec())
            .map_err(|e| SpoolError::manifest(url.as_str(), format!("not valid UTF-8: {e}")))?;
        debug!(url = %url, bytes = text.len(), "Fetched playlist");
        Ok(Manifest::new(url.clone(), text))
    }

    /// Settles the bandwidth of every variant candidate, probing those whose
    /// stream-info line did not declare one.
    async fn describe_variants(&self, manifest: &Manifest) -> Vec<VariantDescriptor> {
        let mut variants = Vec::new();
        for candidate in manifest.variant_candidates() {
            let bandwidth = match candidate.declared_bandwidth {
                Some(bandwidth) => bandwidth,
                None if self.config.probe_bandwidth => self.probe_bandwidth(&candidate.url).await,
                None => 0,
            };
            variants.push(VariantDescriptor {
                url: candidate.url,
                bandwidth,
            });
        }
        variants
    }

    async fn probe_bandwidth(&self, url: &Url) -> u64 {
        match self.fetcher.probe(url).await {
            Ok(headers) => headers
                .get(BANDWIDTH_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0),
            Err(e) => {
                warn!(url = %url, error = %e, "Bandwidth probe failed");
                0
            }
        }
    }
}

fn parse_manifest_url(input: &str) -> Result<Url, SpoolError> {
    let url = Url::parse(input.trim()).map_err(|e| SpoolError::invalid_url(input, e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(SpoolError::invalid_url(
            input,
            format!("unsupported scheme `{other}`"),
        )),
    }
}
