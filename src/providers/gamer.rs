use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::{Client, StatusCode, header};
use std::time::Duration;
use url::Url;

use crate::app_config::Settings;
use crate::danmaku::{Comment, DanmuResponse};
use crate::errors::FetchError;
use crate::providers::CommentSource;

/// Endpoint of the Bahamut anime danmu API
pub const DEFAULT_ENDPOINT: &str = "https://api.gamer.com.tw/anime/v1/danmu.php";

/// Upper bound for a single retry delay
pub const MAX_BACKOFF_MS: u64 = 60_000;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Client for the Bahamut anime danmu API
#[derive(Debug)]
pub struct GamerDanmuSource {
    /// HTTP client for making requests
    client: Client,
    /// API endpoint
    endpoint: String,
    /// Region parameter sent as `geo`
    geo: String,
    /// Maximum number of retry attempts
    max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    backoff_base_ms: u64,
}

impl GamerDanmuSource {
    /// Create a client from the resolved settings
    pub fn new(settings: &Settings) -> Result<Self, FetchError> {
        Self::with_endpoint(settings, DEFAULT_ENDPOINT)
    }

    /// Create a client against another endpoint, e.g. a local test server
    pub fn with_endpoint(settings: &Settings, endpoint: impl Into<String>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::RequestFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            geo: settings.geo.clone(),
            max_retries: settings.retry_count,
            backoff_base_ms: settings.retry_backoff_ms,
        })
    }

    /// Full request URL for a video
    pub fn request_url(&self, video_sn: &str) -> Result<Url, FetchError> {
        Url::parse_with_params(&self.endpoint, &[("videoSn", video_sn), ("geo", self.geo.as_str())])
            .map_err(|e| FetchError::RequestFailed(format!("Invalid endpoint '{}': {}", self.endpoint, e)))
    }

    /// One request without retries
    async fn fetch_once(&self, url: &Url, video_sn: &str) -> Result<Vec<Comment>, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            return Err(FetchError::ApiError {
                status_code: status.as_u16(),
                message: excerpt(&message),
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.contains("application/json") {
            warn!("Danmu API responded with content type '{}', trying to parse it as JSON", content_type);
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::RequestFailed(format!("Failed to read response body: {}", e)))?;

        parse_response(&body, video_sn)
    }
}

/// Parse a danmu API response body into comments
pub fn parse_response(body: &str, video_sn: &str) -> Result<Vec<Comment>, FetchError> {
    let response: DanmuResponse = serde_json::from_str(body).map_err(|e| {
        error!("Failed to parse danmu response: {}. Body starts with: {}", e, excerpt(body));
        FetchError::ParseError(e.to_string())
    })?;

    let records = response
        .into_records()
        .ok_or_else(|| FetchError::MissingData(video_sn.to_string()))?;

    Ok(records.records.into_iter().map(Comment::from).collect())
}

/// Exponential backoff before retry `attempt` (1-based), capped
pub fn backoff_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    base_ms.saturating_mul(factor).min(MAX_BACKOFF_MS)
}

fn excerpt(text: &str) -> String {
    if text.chars().count() > 200 {
        text.chars().take(200).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[async_trait]
impl CommentSource for GamerDanmuSource {
    async fn fetch(&self, video_sn: &str) -> Result<Vec<Comment>, FetchError> {
        let url = self.request_url(video_sn)?;
        debug!("Requesting {}", url);

        let mut attempt = 0;
        loop {
            match self.fetch_once(&url, video_sn).await {
                Ok(comments) => return Ok(comments),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let backoff_ms = backoff_delay_ms(self.backoff_base_ms, attempt);
                    warn!(
                        "Danmu request failed: {} - retrying in {}ms (attempt {}/{})",
                        e,
                        backoff_ms,
                        attempt + 1,
                        self.max_retries.saturating_add(1)
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                Err(e) => {
                    if let FetchError::ApiError { status_code, .. } = &e {
                        if *status_code == StatusCode::NOT_FOUND.as_u16() {
                            error!("Video {} was not found by the danmu API", video_sn);
                        }
                    }
                    return Err(e);
                }
            }
        }
    }

    fn name(&self) -> &str {
        "gamer"
    }
}
