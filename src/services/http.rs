//! Shared HTTP client with request logging.
//!
//! Every lookup adapter sends through [`HttpClient::send`], which logs the
//! method, URL, status and elapsed time of each call at `debug` level.

use std::time::{Duration, Instant};

use super::FetchError;

/// Longest URL prefix written to the log.
const MAX_LOGGED_URL: usize = 250;

const USER_AGENT: &str = concat!("english-helper/", env!("CARGO_PKG_VERSION"));

/// Cheap-to-clone `reqwest` client configured with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Build a client with the given timeout.  A default client is used as a
    /// last resort if the builder fails.
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    pub fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client.get(url)
    }

    /// Send a request built from this client and log the round trip.
    pub async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, FetchError> {
        let request = request.build()?;
        let method = request.method().clone();
        let url = truncate_url(request.url().as_str());
        let started = Instant::now();

        match self.client.execute(request).await {
            Ok(response) => {
                log::debug!(
                    "net: {method} {url} -> {} in {} ms",
                    response.status().as_u16(),
                    started.elapsed().as_millis()
                );
                Ok(response)
            }
            Err(e) => {
                log::debug!(
                    "net: {method} {url} failed after {} ms: {e}",
                    started.elapsed().as_millis()
                );
                Err(e.into())
            }
        }
    }

    /// GET `url` and return the body bytes of a successful response.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.send(self.get(url)).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

fn truncate_url(url: &str) -> String {
    match url.char_indices().nth(MAX_LOGGED_URL) {
        Some((idx, _)) => format!("{}…", &url[..idx]),
        None => url.to_string(),
    }
}
