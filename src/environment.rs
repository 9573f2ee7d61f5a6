use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::client::AnalysisClient;
use crate::controller::{ControllerConfig, DEFAULT_REQUEST_TIMEOUT};
use crate::error::AnalysisError;
use crate::schema::{AnalysisRequest, TimeWindow, TopK};
use crate::source::{DataSource, DataSourceKind, FixtureSource, DEFAULT_FIXTURE_LATENCY};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error)]
#[error("invalid value for {name}: {reason}")]
pub struct ConfigError {
    pub name: &'static str,
    pub reason: String,
}

/// Process-wide settings, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_base_url: Url,
    pub data_source: DataSourceKind,
    pub request_timeout: Duration,
    pub fixture_latency: Duration,
    pub initial_request: AnalysisRequest,
    pub port: u16,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads settings through `lookup`; unset or blank variables fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = parse_var(&lookup, "API_BASE_URL", || {
            Url::parse(DEFAULT_API_BASE_URL).map_err(|e| e.to_string())
        })?;
        let data_source = parse_var(&lookup, "RADAR_DATA_SOURCE", || Ok(DataSourceKind::Live))?;
        let timeout_secs: u64 = parse_var(&lookup, "RADAR_REQUEST_TIMEOUT_SECS", || {
            Ok(DEFAULT_REQUEST_TIMEOUT.as_secs())
        })?;
        if timeout_secs == 0 {
            return Err(ConfigError {
                name: "RADAR_REQUEST_TIMEOUT_SECS",
                reason: "must be at least 1 second".to_string(),
            });
        }
        let latency_ms: u64 = parse_var(&lookup, "RADAR_FIXTURE_LATENCY_MS", || {
            Ok(DEFAULT_FIXTURE_LATENCY.as_millis() as u64)
        })?;
        let window_hours: u32 = parse_var(&lookup, "RADAR_TIME_WINDOW", || {
            Ok(TimeWindow::default().hours())
        })?;
        let top_k: u32 = parse_var(&lookup, "RADAR_TOP_K", || Ok(TopK::default().count()))?;
        let port = parse_var(&lookup, "PORT", || Ok(DEFAULT_PORT))?;

        Ok(Self {
            api_base_url,
            data_source,
            request_timeout: Duration::from_secs(timeout_secs),
            fixture_latency: Duration::from_millis(latency_ms),
            initial_request: AnalysisRequest {
                time_window_hours: TimeWindow::try_from(window_hours).map_err(|e| ConfigError {
                    name: "RADAR_TIME_WINDOW",
                    reason: e.to_string(),
                })?,
                top_k: TopK::try_from(top_k).map_err(|e| ConfigError {
                    name: "RADAR_TOP_K",
                    reason: e.to_string(),
                })?,
            },
            port,
        })
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            initial: self.initial_request,
            request_timeout: self.request_timeout,
        }
    }

    pub fn build_source(&self) -> Result<DataSource, AnalysisError> {
        Ok(match self.data_source {
            DataSourceKind::Live => DataSource::Live(AnalysisClient::new(&self.api_base_url)?),
            DataSourceKind::Fixture => DataSource::Fixture(FixtureSource::bundled(self.fixture_latency)),
        })
    }
}

fn parse_var<T, F, D>(lookup: &F, name: &'static str, default: D) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
    D: FnOnce() -> Result<T, String>,
{
    let result = match lookup(name).filter(|value| !value.trim().is_empty()) {
        Some(value) => value.trim().parse::<T>().map_err(|e| e.to_string()),
        None => default(),
    };
    result.map_err(|reason| ConfigError { name, reason })
}
