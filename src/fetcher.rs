// 🌐 Remote Fetcher
// One GET per call, fixed timeout, JSON body. Failures become "no data".

use crate::notice::{Notice, Notifier};
use serde_json::Value;
use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP status {status}")]
    Status { url: String, status: u16 },
    #[error("invalid JSON body: {reason}")]
    Decode { url: String, reason: String },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Transport { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Decode { url, .. } => url,
        }
    }
}

/// Transport seam between the lookups and the network.
pub trait JsonFetcher: Send + Sync {
    fn get_json(&self, url: &str) -> Result<Value, FetchError>;
}

/// Blocking `reqwest` implementation.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| FetchError::Transport {
                url: "client_init".to_string(),
                source,
            })?;

        Ok(HttpFetcher { client })
    }
}

impl JsonFetcher for HttpFetcher {
    fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let transport = |source: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(transport)?;
        serde_json::from_str(&body).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Fetch `url`, turning any failure into an error notice and `None`.
pub fn fetch_or_notify<N: Notifier + ?Sized>(
    fetcher: &dyn JsonFetcher,
    url: &str,
    notifier: &mut N,
) -> Option<Value> {
    match fetcher.get_json(url) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(url = e.url(), error = %e, "fetch failed");
            notifier.notify(Notice::error(format!(
                "Error fetching data from {}: {}",
                e.url(),
                e
            )));
            None
        }
    }
}

// ============================================================================
// TEST SUPPORT
// ============================================================================
