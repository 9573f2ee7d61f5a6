//! Data contracts shared with the analysis engine.
//!
//! Requests are built from the closed [`TimeWindow`] and [`TopK`] sets and
//! serialize as plain integers. Responses are validated once at the client
//! boundary via [`AnalysisResponse::validate`]; everything downstream treats
//! them as immutable.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::TARGET_WEB_REQUEST;

/// Raised when an integer is not one of the enumerated query values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    #[error("unsupported time window: {0} hours")]
    TimeWindow(u32),
    #[error("unsupported result count: {0}")]
    TopK(u32),
}

/// How far back the engine should look.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum TimeWindow {
    LastHour,
    Last3Hours,
    Last6Hours,
    Last12Hours,
    #[default]
    Last24Hours,
    Last2Days,
    Last3Days,
    LastWeek,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 8] = [
        TimeWindow::LastHour,
        TimeWindow::Last3Hours,
        TimeWindow::Last6Hours,
        TimeWindow::Last12Hours,
        TimeWindow::Last24Hours,
        TimeWindow::Last2Days,
        TimeWindow::Last3Days,
        TimeWindow::LastWeek,
    ];

    pub fn hours(self) -> u32 {
        match self {
            TimeWindow::LastHour => 1,
            TimeWindow::Last3Hours => 3,
            TimeWindow::Last6Hours => 6,
            TimeWindow::Last12Hours => 12,
            TimeWindow::Last24Hours => 24,
            TimeWindow::Last2Days => 48,
            TimeWindow::Last3Days => 72,
            TimeWindow::LastWeek => 168,
        }
    }

    /// Selector label.
    pub fn label(self) -> &'static str {
        match self {
            TimeWindow::LastHour => "Last hour",
            TimeWindow::Last3Hours => "Last 3 hours",
            TimeWindow::Last6Hours => "Last 6 hours",
            TimeWindow::Last12Hours => "Last 12 hours",
            TimeWindow::Last24Hours => "Last 24 hours",
            TimeWindow::Last2Days => "Last 2 days",
            TimeWindow::Last3Days => "Last 3 days",
            TimeWindow::LastWeek => "Last week",
        }
    }
}

impl From<TimeWindow> for u32 {
    fn from(window: TimeWindow) -> Self {
        window.hours()
    }
}

impl TryFrom<u32> for TimeWindow {
    type Error = ParameterError;

    fn try_from(hours: u32) -> Result<Self, Self::Error> {
        TimeWindow::ALL
            .into_iter()
            .find(|window| window.hours() == hours)
            .ok_or(ParameterError::TimeWindow(hours))
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h", self.hours())
    }
}

/// How many ranked clusters the engine should return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum TopK {
    Top5,
    #[default]
    Top10,
    Top15,
    Top20,
    Top30,
    Top50,
}

impl TopK {
    pub const ALL: [TopK; 6] = [
        TopK::Top5,
        TopK::Top10,
        TopK::Top15,
        TopK::Top20,
        TopK::Top30,
        TopK::Top50,
    ];

    pub fn count(self) -> u32 {
        match self {
            TopK::Top5 => 5,
            TopK::Top10 => 10,
            TopK::Top15 => 15,
            TopK::Top20 => 20,
            TopK::Top30 => 30,
            TopK::Top50 => 50,
        }
    }
}

impl From<TopK> for u32 {
    fn from(top_k: TopK) -> Self {
        top_k.count()
    }
}

impl TryFrom<u32> for TopK {
    type Error = ParameterError;

    fn try_from(count: u32) -> Result<Self, Self::Error> {
        TopK::ALL
            .into_iter()
            .find(|top_k| top_k.count() == count)
            .ok_or(ParameterError::TopK(count))
    }
}

impl fmt::Display for TopK {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Top {}", self.count())
    }
}

/// Body of `POST /api/v1/analyze`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub time_window_hours: TimeWindow,
    pub top_k: TopK,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub time: String,
    pub event: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsSource {
    pub url: String,
    pub title: String,
    #[serde(default, deserialize_with = "deserialize_optional_instant")]
    pub published_at: Option<DateTime<Utc>>,
}

impl NewsSource {
    /// The source URL if it is safe to link to: absolute `http` or `https`.
    pub fn link(&self) -> Option<Url> {
        Url::parse(self.url.trim())
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
    }
}

/// One deduplicated story cluster, as scored by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub dedup_group: String,
    pub hotness: f64,
    pub headline: String,
    pub why_now: String,
    pub entities: Vec<String>,
    pub sources: Vec<NewsSource>,
    pub timeline: Vec<TimelineEvent>,
    pub draft: String,
    pub telegram_post: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub results: Vec<AnalysisResult>,
    pub total_articles_analyzed: u64,
    pub total_clusters: u64,
    #[serde(deserialize_with = "deserialize_instant")]
    pub analysis_timestamp: DateTime<Utc>,
}

impl AnalysisResponse {
    /// Checks the invariants serde cannot express: hotness within `[0, 1]`
    /// and a non-empty `dedup_group` that is unique within the response.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::with_capacity(self.results.len());
        for (index, result) in self.results.iter().enumerate() {
            if result.dedup_group.trim().is_empty() {
                return Err(format!("result #{} has an empty dedup_group", index));
            }
            if !seen.insert(result.dedup_group.as_str()) {
                return Err(format!("duplicate dedup_group '{}'", result.dedup_group));
            }
            if !result.hotness.is_finite() || !(0.0..=1.0).contains(&result.hotness) {
                return Err(format!(
                    "hotness {} of '{}' is outside [0, 1]",
                    result.hotness, result.dedup_group
                ));
            }
        }
        Ok(())
    }
}

/// Parses an ISO-8601 instant; values without an offset are taken as UTC.
///
/// Accepts extended (`+03:00`) and basic (`+0300`) offsets, `Z`, and
/// minute precision.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    let with_offset = ["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M%#z"]
        .iter()
        .find_map(|format| DateTime::parse_from_str(raw, format).ok())
        .map(|parsed| parsed.with_timezone(&Utc));
    if with_offset.is_some() {
        return with_offset;
    }
    [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
    ]
    .iter()
    .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
    .map(|naive| naive.and_utc())
}

fn deserialize_instant<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_instant(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
}

/// A source date is display-only; an unreadable one is dropped rather than
/// failing the whole response.
fn deserialize_optional_instant<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return Ok(None),
    };
    let parsed = parse_instant(&raw);
    if parsed.is_none() {
        warn!(target: TARGET_WEB_REQUEST, "Ignoring unparseable published_at '{}'", raw);
    }
    Ok(parsed)
}
