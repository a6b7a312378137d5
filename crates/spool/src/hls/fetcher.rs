// Fetcher: whole-resource retrieval with bounded exponential-backoff retry.

use crate::error::SpoolError;
use crate::hls::retry::{RetryAction, RetryPolicy, retry_with_backoff};
use crate::http::{HttpResponse, HttpTransport};
use bytes::Bytes;
use reqwest::header::HeaderMap;
use std::sync::Arc;
use tracing::{debug, trace};
use url::Url;

#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Fetches `url` using the configured attempt budget.
    pub async fn fetch(&self, url: &Url) -> Result<Bytes, SpoolError> {
        self.fetch_with_attempts(url, self.policy.max_attempts).await
    }

    /// Fetches `url`, retrying transport failures and non-success statuses
    /// until `max_attempts` attempts have been made.
    ///
    /// Exhaustion yields [`SpoolError::Network`] carrying the last HTTP status,
    /// or `None` when the last attempt got no response at all.
    pub async fn fetch_with_attempts(
        &self,
        url: &Url,
        max_attempts: u32,
    ) -> Result<Bytes, SpoolError> {
        let policy = RetryPolicy {
            max_attempts,
            ..self.policy.clone()
        };

        let result = retry_with_backoff(&policy, |attempt| {
            let transport = Arc::clone(&self.transport);
            let url = url.clone();
            async move {
                trace!(url = %url, attempt, "Fetching");
                match transport.get(&url).await {
                    Ok(response) if response.is_success() => RetryAction::Success(response),
                    Ok(response) => RetryAction::Retry(SpoolError::network(
                        url.as_str(),
                        attempt,
                        Some(response.status),
                    )),
                    Err(e) if e.is_retryable() => RetryAction::Retry(e),
                    Err(e) => RetryAction::Fail(e),
                }
            }
        })
        .await;

        match result {
            Ok(HttpResponse { body, .. }) => {
                debug!(url = %url, size = body.len(), "Fetched");
                Ok(body)
            }
            Err((SpoolError::Network { last_status, .. }, attempts)) => {
                Err(SpoolError::network(url.as_str(), attempts, last_status))
            }
            Err((err @ SpoolError::Transport { .. }, attempts)) => {
                debug!(url = %url, error = %err, "Last attempt failed without a response");
                Err(SpoolError::network(url.as_str(), attempts, None))
            }
            Err((err, _)) => Err(err),
        }
    }

    /// Single HEAD request, no retry. Returns the response headers of a
    /// successful probe.
    pub async fn probe(&self, url: &Url) -> Result<HeaderMap, SpoolError> {
        let response = self.transport.head(url).await?;
        if !response.is_success() {
            return Err(SpoolError::network(url.as_str(), 1, Some(response.status)));
        }
        Ok(response.headers)
    }
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
