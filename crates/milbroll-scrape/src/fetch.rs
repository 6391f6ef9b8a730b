// HTTP seam for the stats site.
//
// Every network read goes through `PageFetcher` so the pipeline can be driven
// by in-memory fixtures in tests. `HttpFetcher` is the reqwest-backed
// implementation used by the binary.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {secs}s: {url}")]
    Timeout { url: String, secs: u64 },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
}

/// Fetch a URL and return the response body as text. Non-2xx responses are
/// errors.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;
}

/// reqwest client with a fixed User-Agent and a per-request deadline.
pub struct HttpFetcher {
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { http, timeout })
    }

    fn map_error(&self, url: &str, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                secs: self.timeout.as_secs(),
            }
        } else if let Some(status) = err.status() {
            FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        debug!(url, "GET");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| self.map_error(url, e))
    }
}
