use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use spool_engine::{
    CaptureSession, HttpResponse, HttpTransport, Phase, ProgressEvent, SpoolConfig, SpoolError,
    capture_channel,
};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Serves fixed bodies; anything unknown answers 404.
#[derive(Default)]
struct FakeOrigin {
    bodies: HashMap<String, (StatusCode, Bytes)>,
    requests: Mutex<Vec<String>>,
}

impl FakeOrigin {
    fn serve(mut self, url: &str, body: impl Into<Bytes>) -> Self {
        self.bodies
            .insert(url.to_string(), (StatusCode::OK, body.into()));
        self
    }

    fn fail(mut self, url: &str, status: StatusCode) -> Self {
        self.bodies.insert(url.to_string(), (status, Bytes::new()));
        self
    }

    fn requests_for(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }
}

#[async_trait]
impl HttpTransport for FakeOrigin {
    async fn get(&self, url: &Url) -> Result<HttpResponse, SpoolError> {
        self.requests.lock().unwrap().push(url.to_string());
        let (status, body) = self
            .bodies
            .get(url.as_str())
            .cloned()
            .unwrap_or((StatusCode::NOT_FOUND, Bytes::new()));
        Ok(HttpResponse::new(status, body))
    }

    async fn head(&self, _url: &Url) -> Result<HttpResponse, SpoolError> {
        Ok(HttpResponse::new(StatusCode::OK, Bytes::new()))
    }
}

#[derive(Default)]
struct EventLog(Mutex<Vec<ProgressEvent>>);

impl spool_engine::ProgressSink for EventLog {
    fn on_progress(&self, event: ProgressEvent) {
        self.0.lock().unwrap().push(event);
    }
}

fn segment_body(index: usize) -> Vec<u8> {
    vec![index as u8; index + 1]
}

fn twelve_segment_origin(fail_all: bool) -> FakeOrigin {
    let playlist: String = (0..12).map(|i| format!("#EXTINF:2.0,\nseg_{i}.ts\n")).collect();
    let mut origin = FakeOrigin::default().serve(
        "https://x.test/live/media.m3u8",
        format!("#EXTM3U\n#EXT-X-TARGETDURATION:2\n{playlist}#EXT-X-ENDLIST\n"),
    );
    for i in 0..12 {
        let url = format!("https://x.test/live/seg_{i}.ts");
        origin = if fail_all || i == 7 {
            origin.fail(&url, StatusCode::SERVICE_UNAVAILABLE)
        } else {
            origin.serve(&url, segment_body(i))
        };
    }
    origin
}

#[tokio::test(start_paused = true)]
async fn failed_segment_is_left_out_of_artifact() {
    let origin = Arc::new(twelve_segment_origin(false));
    let session = CaptureSession::new(SpoolConfig::default(), origin.clone());
    let events = EventLog::default();

    let media = session
        .run(
            "https://x.test/live/media.m3u8",
            "Morning show",
            &events,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let expected: Vec<u8> = (0..12).filter(|&i| i != 7).flat_map(segment_body).collect();
    assert_eq!(&media.artifact.bytes[..], &expected[..]);
    assert_eq!(media.filename, "Morning_show.mp4");
    assert_eq!(media.mime(), "video/mp4");
    assert_eq!((media.segments_total, media.segments_failed), (12, 1));
    assert_eq!(origin.requests_for("https://x.test/live/seg_7.ts"), 3);

    let events = events.0.lock().unwrap();
    let downloading: Vec<usize> = events
        .iter()
        .filter(|e| e.phase == Phase::Downloading)
        .map(|e| e.completed)
        .collect();
    assert_eq!(downloading, vec![5, 10, 12]);
    assert_eq!(events.last().map(|e| e.phase), Some(Phase::Done));
}

#[tokio::test(start_paused = true)]
async fn all_segments_failing_is_empty_artifact() {
    let session = CaptureSession::new(
        SpoolConfig::default(),
        Arc::new(twelve_segment_origin(true)),
    );
    let events = EventLog::default();

    let err = session
        .run(
            "https://x.test/live/media.m3u8",
            "nothing",
            &events,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, SpoolError::EmptyArtifact { .. }));
    let events = events.0.lock().unwrap();
    assert_eq!(events.last().map(|e| e.phase), Some(Phase::Failed));
    assert!(events.iter().all(|e| e.phase != Phase::Done));
}

#[tokio::test]
async fn master_playlist_follows_highest_bandwidth() {
    let origin = FakeOrigin::default()
        .serve(
            "https://x.test/space/master.m3u8",
            "#EXTM3U\n\
             #EXT-X-STREAM-INF:BANDWIDTH=500,CODECS=\"mp4a.40.2\"\n\
             low/index.m3u8\n\
             #EXT-X-STREAM-INF:BANDWIDTH=1200,CODECS=\"mp4a.40.2\"\n\
             high/index.m3u8\n",
        )
        .serve("https://x.test/space/low/index.m3u8", "#EXTM3U\nlow_0.aac\n")
        .serve(
            "https://x.test/space/high/index.m3u8",
            "#EXTM3U\n#EXTINF:3.0,\nchunk_0.aac\n#EXTINF:3.0,\nchunk_1.aac\n",
        )
        .serve("https://x.test/space/high/chunk_0.aac", "hi-0|")
        .serve("https://x.test/space/high/chunk_1.aac", "hi-1");
    let origin = Arc::new(origin);
    let session = CaptureSession::new(SpoolConfig::default(), origin.clone());

    let media = session
        .run(
            "https://x.test/space/master.m3u8",
            "",
            &spool_engine::NoopSink,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(&media.artifact.bytes[..], b"hi-0|hi-1");
    assert_eq!(media.filename, "twitter_space_media.mp3");
    assert_eq!(origin.requests_for("https://x.test/space/low/index.m3u8"), 0);
}

#[tokio::test]
async fn captured_url_feeds_session() {
    let origin = Arc::new(
        FakeOrigin::default()
            .serve("https://x.test/r/playlist.m3u8?type=replay", "#EXTM3U\na.aac\n")
            .serve("https://x.test/r/a.aac", "audio"),
    );
    let (capture, receiver) = capture_channel();

    let observer = tokio::spawn(async move {
        for url in [
            "https://x.test/r/app.js",
            "https://x.test/r/playlist.m3u8?type=replay",
            "https://x.test/r/other.m3u8",
        ] {
            capture.observe(url);
        }
    });

    let manifest_url = receiver.recv().await.unwrap();
    observer.await.unwrap();

    let media = CaptureSession::new(SpoolConfig::default(), origin)
        .run(
            &manifest_url,
            "replay",
            &spool_engine::NoopSink,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(media.filename, "replay.mp3");
    assert_eq!(&media.artifact.bytes[..], b"audio");
}
