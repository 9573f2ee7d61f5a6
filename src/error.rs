use std::time::Duration;
use thiserror::Error;

/// Everything that can go wrong during one analysis round trip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// The engine answered with a non-2xx status.
    #[error("analysis engine returned HTTP {status}")]
    Transport { status: u16 },

    /// The body did not decode into the expected schema or failed validation.
    #[error("unexpected response from analysis engine: {0}")]
    Decode(String),

    /// No response was received at all.
    #[error("could not reach analysis engine: {0}")]
    Network(String),

    #[error("analysis request timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),
}

impl AnalysisError {
    /// Single human-readable message shown on the dashboard, whatever the cause.
    pub fn user_message(&self) -> String {
        format!("Failed to load news: {}", self)
    }
}
