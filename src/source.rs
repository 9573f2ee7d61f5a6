//! Where analysis responses come from.
//!
//! The variant is picked once at startup and handed to the controller; both
//! variants honor the same `analyze` contract so the controller cannot tell
//! them apart.

use once_cell::sync::Lazy;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::client::AnalysisClient;
use crate::error::AnalysisError;
use crate::schema::{AnalysisRequest, AnalysisResponse};
use crate::TARGET_WEB_REQUEST;

pub const DEFAULT_FIXTURE_LATENCY: Duration = Duration::from_millis(800);

static FIXTURE_RESPONSE: Lazy<Result<AnalysisResponse, String>> = Lazy::new(load_bundled_fixture);

fn load_bundled_fixture() -> Result<AnalysisResponse, String> {
    let response: AnalysisResponse =
        serde_json::from_str(include_str!("../fixtures/analysis.json")).map_err(|e| e.to_string())?;
    response.validate()?;
    Ok(response)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DataSourceKind {
    Live,
    Fixture,
}

impl FromStr for DataSourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "live" => Ok(DataSourceKind::Live),
            "fixture" | "mock" => Ok(DataSourceKind::Fixture),
            other => Err(format!("unknown data source '{}', expected 'live' or 'fixture'", other)),
        }
    }
}

impl fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceKind::Live => write!(f, "live"),
            DataSourceKind::Fixture => write!(f, "fixture"),
        }
    }
}

/// Offline stand-in for the engine: a bundled response served after a delay.
#[derive(Clone, Debug)]
pub struct FixtureSource {
    response: Option<AnalysisResponse>,
    latency: Duration,
}

impl FixtureSource {
    /// The response bundled with the crate.
    pub fn bundled(latency: Duration) -> Self {
        Self {
            response: None,
            latency,
        }
    }

    pub fn with_response(response: AnalysisResponse, latency: Duration) -> Self {
        Self {
            response: Some(response),
            latency,
        }
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, AnalysisError> {
        debug!(target: TARGET_WEB_REQUEST, "Serving fixture for window={} top_k={} after {:?}", request.time_window_hours, request.top_k.count(), self.latency);
        sleep(self.latency).await;

        let mut response = match &self.response {
            Some(response) => response.clone(),
            None => FIXTURE_RESPONSE
                .as_ref()
                .map(AnalysisResponse::clone)
                .map_err(|e| AnalysisError::Decode(e.clone()))?,
        };
        response.results.truncate(request.top_k.count() as usize);
        Ok(response)
    }
}

#[derive(Clone, Debug)]
pub enum DataSource {
    Live(AnalysisClient),
    Fixture(FixtureSource),
}

impl DataSource {
    pub fn kind(&self) -> DataSourceKind {
        match self {
            DataSource::Live(_) => DataSourceKind::Live,
            DataSource::Fixture(_) => DataSourceKind::Fixture,
        }
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, AnalysisError> {
        match self {
            DataSource::Live(client) => client.analyze(request).await,
            DataSource::Fixture(fixture) => fixture.analyze(request).await,
        }
    }
}
