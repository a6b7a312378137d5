use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::error::SpoolError;
use crate::http::{HttpResponse, HttpTransport};

/// Initialize tracing for tests with appropriate settings
#[inline]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone)]
pub enum Reply {
    Status(StatusCode, Bytes),
    Unreachable(&'static str),
}

#[derive(Debug, Default)]
struct Route {
    /// Replies served in order; the last one repeats forever.
    replies: VecDeque<Reply>,
    delay: Duration,
}

/// In-memory [`HttpTransport`] serving scripted replies per URL.
///
/// Unknown URLs answer `404 Not Found`.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, Route>>,
    heads: Mutex<HashMap<String, HeaderMap>>,
    hits: Mutex<HashMap<String, u32>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(self, url: &str, body: impl Into<Bytes>) -> Self {
        self.replies(url, vec![Reply::Status(StatusCode::OK, body.into())])
    }

    pub fn status(self, url: &str, status: StatusCode) -> Self {
        self.replies(url, vec![Reply::Status(status, Bytes::new())])
    }

    pub fn unreachable(self, url: &str) -> Self {
        self.replies(url, vec![Reply::Unreachable("connection refused")])
    }

    pub fn replies(self, url: &str, replies: Vec<Reply>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .replies = replies.into();
        self
    }

    pub fn delay(self, url: &str, delay: Duration) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .delay = delay;
        self
    }

    pub fn head_header(self, url: &str, name: &'static str, value: &str) -> Self {
        self.heads
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .insert(
                HeaderName::from_static(name),
                HeaderValue::from_str(value).unwrap(),
            );
        self
    }

    /// Number of GET requests made for `url`.
    pub fn hits(&self, url: &str) -> u32 {
        self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    fn next_reply(&self, url: &str) -> (Option<Reply>, Duration) {
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(url) {
            Some(route) => {
                let reply = if route.replies.len() > 1 {
                    route.replies.pop_front()
                } else {
                    route.replies.front().cloned()
                };
                (reply, route.delay)
            }
            None => (None, Duration::ZERO),
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse, SpoolError> {
        *self
            .hits
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default() += 1;

        let (reply, delay) = self.next_reply(url.as_str());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match reply {
            Some(Reply::Status(status, body)) => Ok(HttpResponse::new(status, body)),
            Some(Reply::Unreachable(reason)) => Err(SpoolError::transport(url.as_str(), reason)),
            None => Ok(HttpResponse::new(StatusCode::NOT_FOUND, Bytes::new())),
        }
    }

    async fn head(&self, url: &Url) -> Result<HttpResponse, SpoolError> {
        let headers = self.heads.lock().unwrap().get(url.as_str()).cloned();
        match headers {
            Some(headers) => Ok(HttpResponse {
                status: StatusCode::OK,
                headers,
                body: Bytes::new(),
            }),
            None => Ok(HttpResponse::new(StatusCode::OK, Bytes::new())),
        }
    }
}
