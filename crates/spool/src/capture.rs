//! One-shot hand-off of an observed manifest URL.
//!
//! Whatever watches traffic (a proxy log, a browser devtools export, lines on
//! stdin) feeds every URL it sees into [`ManifestCapture::observe`]. The first
//! playlist URL is forwarded to the [`CaptureReceiver`] and everything after
//! that is ignored.

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info};
use url::Url;

const MANIFEST_EXTENSION: &str = ".m3u8";

/// Whether `url` points at an HLS playlist (`.m3u8` path, any query string).
pub fn is_manifest_url(url: &str) -> bool {
    let url = url.trim();
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_ascii_lowercase(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase(),
    };
    path.ends_with(MANIFEST_EXTENSION)
}

/// Producer side of the capture channel.
#[derive(Debug)]
pub struct ManifestCapture {
    sender: Mutex<Option<oneshot::Sender<String>>>,
}

/// Consumer side of the capture channel.
#[derive(Debug)]
pub struct CaptureReceiver {
    receiver: oneshot::Receiver<String>,
}

pub fn capture_channel() -> (ManifestCapture, CaptureReceiver) {
    let (sender, receiver) = oneshot::channel();
    (
        ManifestCapture {
            sender: Mutex::new(Some(sender)),
        },
        CaptureReceiver { receiver },
    )
}

impl ManifestCapture {
    /// Offers a URL. Returns `true` only for the URL that gets captured.
    pub fn observe(&self, url: &str) -> bool {
        if !is_manifest_url(url) {
            return false;
        }
        let Some(sender) = self.sender.lock().take() else {
            debug!(url, "Manifest already captured, ignoring");
            return false;
        };
        info!(url, "Captured manifest URL");
        // The receiver may already be gone; the capture still counts as done.
        let _ = sender.send(url.trim().to_string());
        true
    }

    pub fn is_captured(&self) -> bool {
        self.sender.lock().is_none()
    }
}

impl CaptureReceiver {
    /// Waits for the captured URL. `None` if the producer was dropped first.
    pub async fn recv(self) -> Option<String> {
        self.receiver.await.ok()
    }
}
