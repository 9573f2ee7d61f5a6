//! HTTP client for the external analysis engine.

use tracing::{debug, info, warn};
use url::Url;

use crate::error::AnalysisError;
use crate::schema::{AnalysisRequest, AnalysisResponse};
use crate::TARGET_WEB_REQUEST;

pub const ANALYZE_PATH: &str = "api/v1/analyze";

/// Create the HTTP client used for engine requests.
pub fn create_http_client() -> Result<reqwest::Client, AnalysisError> {
    reqwest::Client::builder()
        .gzip(true)
        .build()
        .map_err(|e| AnalysisError::Network(format!("failed to build HTTP client: {}", e)))
}

/// Performs `POST {base}/api/v1/analyze`: one attempt, no retry, no timeout.
#[derive(Clone, Debug)]
pub struct AnalysisClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl AnalysisClient {
    pub fn new(base_url: &Url) -> Result<Self, AnalysisError> {
        Self::with_http_client(create_http_client()?, base_url)
    }

    pub fn with_http_client(http: reqwest::Client, base_url: &Url) -> Result<Self, AnalysisError> {
        // Url::join drops the last path segment unless it ends in '/'.
        let mut base = base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join(ANALYZE_PATH).map_err(|e| {
            AnalysisError::Network(format!("invalid engine URL '{}': {}", base_url, e))
        })?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, AnalysisError> {
        debug!(target: TARGET_WEB_REQUEST, "POST {} window={} top_k={}", self.endpoint, request.time_window_hours, request.top_k.count());

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(target: TARGET_WEB_REQUEST, "Request to {} failed: {}", self.endpoint, e);
                AnalysisError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(target: TARGET_WEB_REQUEST, "Analysis engine returned status {}", status);
            return Err(AnalysisError::Transport {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AnalysisError::Network(format!("failed to read response body: {}", e)))?;

        let decoded: AnalysisResponse =
            serde_json::from_slice(&body).map_err(|e| AnalysisError::Decode(e.to_string()))?;
        decoded.validate().map_err(AnalysisError::Decode)?;

        info!(target: TARGET_WEB_REQUEST, "Received {} clusters ({} articles analyzed)", decoded.results.len(), decoded.total_articles_analyzed);
        Ok(decoded)
    }
}
