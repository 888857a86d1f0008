//! Snapshot fetching over HTTP.

use crate::snapshot::Snapshot;
use futures::future::BoxFuture;
use std::time::Duration;

/// Failure taxonomy for a snapshot fetch. The loader swallows these on the
/// background path and propagates them on the cold path.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("snapshot fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error("snapshot endpoint returned status {0}")]
    Status(u16),
    #[error("snapshot transport error: {0}")]
    Transport(String),
    #[error("malformed snapshot body: {0}")]
    Malformed(String),
}

/// Seam between the loader and the network.
///
/// Boxed futures keep the trait object-safe so tests can substitute a stub
/// without touching the loader.
pub trait SnapshotFetcher: Send + Sync + 'static {
    fn fetch(
        &self,
        url: &str,
        timeout: Duration,
    ) -> BoxFuture<'static, Result<Snapshot, FetchError>>;
}

/// Production fetcher backed by a shared reqwest client.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotFetcher for HttpFetcher {
    fn fetch(
        &self,
        url: &str,
        timeout: Duration,
    ) -> BoxFuture<'static, Result<Snapshot, FetchError>> {
        let client = self.client.clone();
        let url = url.to_string();

        Box::pin(async move {
            let response = client
                .get(&url)
                .timeout(timeout)
                .send()
                .await
                .map_err(|err| classify(&err, timeout))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()));
            }

            // Snapshot deserialization is lenient; only non-JSON bodies fail.
            response
                .json::<Snapshot>()
                .await
                .map_err(|err| match classify(&err, timeout) {
                    FetchError::Transport(message) => FetchError::Malformed(message),
                    other => other,
                })
        })
    }
}

fn classify(err: &reqwest::Error, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(timeout)
    } else {
        FetchError::Transport(err.to_string())
    }
}
