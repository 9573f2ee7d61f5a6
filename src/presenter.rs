//! Projection of controller state and analysis results into view models.
//!
//! Renderers (HTML and terminal) only format what is built here, so the
//! truncation and tiering rules live in one place.

use chrono::{DateTime, Utc};

use crate::classifier::{classify, Classification};
use crate::controller::{ControllerState, FetchStatus};
use crate::schema::{AnalysisResult, TimelineEvent};

/// Entities shown on a collapsed card before the `+N` marker.
pub const COLLAPSED_ENTITY_LIMIT: usize = 3;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// `round(hotness * 100)`.
pub fn hotness_percent(hotness: f64) -> u32 {
    (hotness * 100.0).round() as u32
}

pub fn format_timestamp(instant: &DateTime<Utc>) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollapsedView<'a> {
    pub dedup_group: &'a str,
    pub headline: &'a str,
    pub why_now: &'a str,
    pub classification: Classification,
    /// At most [`COLLAPSED_ENTITY_LIMIT`] entities, in received order.
    pub entities: &'a [String],
    /// Number of entities not shown, when there are any.
    pub overflow: Option<usize>,
    pub hotness_percent: u32,
    pub source_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceLink<'a> {
    pub url: &'a str,
    /// Set only for `http`/`https` URLs; anything else is shown as text.
    pub href: Option<&'a str>,
    pub title: &'a str,
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedView<'a> {
    pub dedup_group: &'a str,
    pub headline: &'a str,
    pub why_now: &'a str,
    pub classification: Classification,
    pub hotness_percent: u32,
    /// Verbatim; renderers must preserve whitespace and line breaks.
    pub draft: &'a str,
    pub telegram_post: &'a str,
    pub entities: &'a [String],
    pub timeline: &'a [TimelineEvent],
    pub sources: Vec<SourceLink<'a>>,
}

/// One result plus whether its detail view is open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultCard<'a> {
    result: &'a AnalysisResult,
    open: bool,
}

impl<'a> ResultCard<'a> {
    pub fn new(result: &'a AnalysisResult) -> Self {
        Self {
            result,
            open: false,
        }
    }

    pub fn result(&self) -> &'a AnalysisResult {
        self.result
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    pub fn collapsed(&self) -> CollapsedView<'a> {
        let result = self.result;
        let shown = result.entities.len().min(COLLAPSED_ENTITY_LIMIT);
        let hidden = result.entities.len() - shown;
        CollapsedView {
            dedup_group: &result.dedup_group,
            headline: &result.headline,
            why_now: &result.why_now,
            classification: classify(result.hotness),
            entities: &result.entities[..shown],
            overflow: (hidden > 0).then_some(hidden),
            hotness_percent: hotness_percent(result.hotness),
            source_count: result.sources.len(),
        }
    }

    /// The detail view, only while open.
    pub fn expanded(&self) -> Option<ExpandedView<'a>> {
        if !self.open {
            return None;
        }
        let result = self.result;
        Some(ExpandedView {
            dedup_group: &result.dedup_group,
            headline: &result.headline,
            why_now: &result.why_now,
            classification: classify(result.hotness),
            hotness_percent: hotness_percent(result.hotness),
            draft: &result.draft,
            telegram_post: &result.telegram_post,
            entities: &result.entities,
            timeline: &result.timeline,
            sources: result
                .sources
                .iter()
                .map(|source| SourceLink {
                    url: &source.url,
                    href: source.link().map(|_| source.url.trim()),
                    title: &source.title,
                    published_at: source.published_at.as_ref().map(format_timestamp),
                })
                .collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsView {
    pub articles_analyzed: u64,
    pub clusters: u64,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardBody<'a> {
    /// Nothing fetched yet.
    Idle,
    Loading,
    /// A successful response without results. Not an error.
    Empty,
    Results(Vec<ResultCard<'a>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView<'a> {
    pub stats: Option<StatsView>,
    pub error: Option<&'a str>,
    pub loading: bool,
    pub body: DashboardBody<'a>,
}

impl<'a> DashboardView<'a> {
    /// `open` names the single card whose detail view is shown, if any.
    pub fn project(state: &'a ControllerState, open: Option<&str>) -> Self {
        let loading = state.status == FetchStatus::Loading;
        let stats = state.data.as_ref().map(|data| StatsView {
            articles_analyzed: data.total_articles_analyzed,
            clusters: data.total_clusters,
            updated_at: format_timestamp(&data.analysis_timestamp),
        });

        let body = match (&state.data, loading) {
            (_, true) => DashboardBody::Loading,
            (None, false) => DashboardBody::Idle,
            (Some(data), false) if data.results.is_empty() => DashboardBody::Empty,
            (Some(data), false) => DashboardBody::Results(
                data.results
                    .iter()
                    .map(|result| {
                        let mut card = ResultCard::new(result);
                        if open == Some(result.dedup_group.as_str()) {
                            card.open();
                        }
                        card
                    })
                    .collect(),
            ),
        };

        Self {
            stats,
            error: state.error_message.as_deref(),
            loading,
            body,
        }
    }

    pub fn open_card(&self) -> Option<&ResultCard<'a>> {
        match &self.body {
            DashboardBody::Results(cards) => cards.iter().find(|card| card.is_open()),
            _ => None,
        }
    }
}
