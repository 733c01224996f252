use crate::config::ImportConfig;
use crate::error::{AppError, Result};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

// ---------- SWAPI shapes (minimal) ----------
// Only the fields the import reads are modeled; everything else is ignored.

#[derive(Debug, Deserialize)]
pub struct Page<T> {
    pub next: Option<String>,
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwapiFilm {
    pub title: String,
    pub release_date: String,
    pub url: String,
}

/// Numeric fields arrive as strings and may hold the sentinel `"unknown"`.
#[derive(Debug, Clone, Deserialize)]
pub struct SwapiPlanet {
    pub name: String,
    #[serde(default)]
    pub diameter: Option<String>,
    #[serde(default)]
    pub climate: Option<String>,
    #[serde(default)]
    pub population: Option<String>,
    #[serde(default)]
    pub films: Vec<String>,
}

/// Sequential client for the public films/planets API.
pub struct SwapiClient {
    http: Client,
    base: Url,
    max_retries: u32,
    backoff: Duration,
}

impl SwapiClient {
    pub fn new(config: &ImportConfig) -> Result<Self> {
        let mut raw = config.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base = Url::parse(&raw)
            .map_err(|e| AppError::Upstream(format!("invalid SWAPI base url {raw:?}: {e}")))?;
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base,
            max_retries: config.max_retries,
            backoff: config.backoff,
        })
    }

    pub fn films_url(&self) -> Result<String> {
        self.endpoint("films/")
    }

    pub fn planets_url(&self) -> Result<String> {
        self.endpoint("planets/")
    }

    fn endpoint(&self, path: &str) -> Result<String> {
        self.base
            .join(path)
            .map(String::from)
            .map_err(|e| AppError::Upstream(format!("cannot build {path} url: {e}")))
    }

    pub async fn fetch_page<T: DeserializeOwned>(&self, url: &str) -> Result<Page<T>> {
        self.get_json(url).await
    }

    /// GET with bounded retries on transport errors, 429 and 5xx. Other error
    /// statuses and undecodable bodies fail straight away.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut attempt: u32 = 0;
        loop {
            let outcome = self
                .http
                .get(url)
                .header("Accept", "application/json")
                .send()
                .await;

            let retry_after = match outcome {
                Ok(resp) if resp.status().is_success() => {
                    let body = resp.bytes().await?;
                    return serde_json::from_slice(&body).map_err(|e| {
                        AppError::Upstream(format!("unexpected payload from {url}: {e}"))
                    });
                }
                Ok(resp) if is_retryable(resp.status()) => {
                    let status = resp.status();
                    if attempt >= self.max_retries {
                        return Err(AppError::UpstreamStatus {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                    }
                    warn!(url, status = status.as_u16(), attempt, "retryable upstream status");
                    retry_after_secs(&resp)
                }
                Ok(resp) => {
                    return Err(AppError::UpstreamStatus {
                        status: resp.status().as_u16(),
                        url: url.to_string(),
                    });
                }
                Err(err) => {
                    if attempt >= self.max_retries {
                        return Err(err.into());
                    }
                    warn!(url, error = %err, attempt, "upstream request failed; retrying");
                    None
                }
            };

            let mut delay = self.backoff.saturating_mul(2u32.saturating_pow(attempt));
            if let Some(secs) = retry_after {
                delay = delay.max(Duration::from_secs(secs));
            }
            attempt += 1;
            debug!(url, attempt, delay_ms = delay.as_millis() as u64, "backing off");
            tokio::time::sleep(delay).await;
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn retry_after_secs(resp: &reqwest::Response) -> Option<u64> {
    resp.headers()
        .get("Retry-After")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}
