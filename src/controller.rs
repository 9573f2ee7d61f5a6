//! Query parameters and the fetch lifecycle.
//!
//! The controller is the single writer of [`ControllerState`]; readers take
//! snapshots or subscribe through a `watch` channel. Each refresh is tagged
//! with a sequence number, and a completion is committed only while its number
//! is still the latest issued, so a slow earlier response can never overwrite
//! a newer one. A failed refresh keeps the last good `data` and only sets the
//! error message.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::AnalysisError;
use crate::schema::{AnalysisRequest, AnalysisResponse, TimeWindow, TopK};
use crate::source::{DataSource, DataSourceKind};
use crate::TARGET_CONTROLLER;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// What readers see.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerState {
    pub status: FetchStatus,
    /// Last successfully fetched response; survives later failures.
    pub data: Option<Arc<AnalysisResponse>>,
    pub error_message: Option<String>,
    /// Parameters of the most recently issued request.
    pub requested: Option<AnalysisRequest>,
}

impl ControllerState {
    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            status: FetchStatus::Idle,
            data: None,
            error_message: None,
            requested: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The completion was written to the state.
    Committed,
    /// A newer refresh was issued meanwhile; the completion was dropped.
    Superseded,
}

#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    pub initial: AnalysisRequest,
    pub request_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            initial: AnalysisRequest::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

pub struct RequestController {
    source: DataSource,
    params: watch::Sender<AnalysisRequest>,
    state: watch::Sender<ControllerState>,
    latest: AtomicU64,
    activated: AtomicBool,
    request_timeout: Duration,
}

impl RequestController {
    pub fn new(source: DataSource, config: ControllerConfig) -> Self {
        let (params, _) = watch::channel(config.initial);
        let (state, _) = watch::channel(ControllerState::default());
        Self {
            source,
            params,
            state,
            latest: AtomicU64::new(0),
            activated: AtomicBool::new(false),
            request_timeout: config.request_timeout,
        }
    }

    pub fn source_kind(&self) -> DataSourceKind {
        self.source.kind()
    }

    pub fn params(&self) -> AnalysisRequest {
        *self.params.borrow()
    }

    pub fn set_time_window(&self, window: TimeWindow) {
        self.params.send_modify(|params| params.time_window_hours = window);
    }

    pub fn set_top_k(&self, top_k: TopK) {
        self.params.send_modify(|params| params.top_k = top_k);
    }

    /// Replaces both parameters in one update, so a concurrent refresh never
    /// sees one field from each of two callers.
    pub fn set_params(&self, request: AnalysisRequest) {
        self.params.send_replace(request);
    }

    pub fn state(&self) -> ControllerState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ControllerState> {
        self.state.subscribe()
    }

    /// Initial load. Only the first call issues a refresh.
    pub async fn activate(&self) -> Option<RefreshOutcome> {
        if self.activated.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(self.refresh().await)
    }

    /// Like [`Self::activate`], but runs the round trip on a background task.
    pub fn spawn_activate(self: &Arc<Self>) -> Option<JoinHandle<RefreshOutcome>> {
        if self.activated.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(self.spawn_refresh())
    }

    /// Fetches with the current parameters.
    ///
    /// Moves to `Loading` and clears the error immediately. On completion,
    /// unless superseded, moves to `Success` (replacing `data`) or `Error`
    /// (keeping `data`). Timeouts count as errors, so `Loading` is always left.
    pub async fn refresh(&self) -> RefreshOutcome {
        let ticket = self.begin();
        self.complete(ticket).await
    }

    /// Enters `Loading` before returning, then completes on a background
    /// task. Readers that look right after this call see the new request.
    pub fn spawn_refresh(self: &Arc<Self>) -> JoinHandle<RefreshOutcome> {
        let ticket = self.begin();
        let controller = Arc::clone(self);
        tokio::spawn(async move { controller.complete(ticket).await })
    }

    fn begin(&self) -> Ticket {
        // Read the parameters and issue the sequence number under the state
        // lock so `requested` always matches the latest request.
        let mut sequence = 0;
        let mut request = AnalysisRequest::default();
        self.state.send_modify(|state| {
            request = self.params();
            sequence = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
            state.status = FetchStatus::Loading;
            state.error_message = None;
            state.requested = Some(request);
        });
        info!(target: TARGET_CONTROLLER, "Refresh #{} started ({} source, window={}, top_k={})", sequence, self.source.kind(), request.time_window_hours, request.top_k.count());

        Ticket { sequence, request }
    }

    async fn complete(&self, ticket: Ticket) -> RefreshOutcome {
        let Ticket { sequence, request } = ticket;
        let result = match timeout(self.request_timeout, self.source.analyze(&request)).await {
            Ok(result) => result.map(Arc::new),
            Err(_) => Err(AnalysisError::Timeout(self.request_timeout)),
        };

        let committed = self.state.send_if_modified(|state| {
            if self.latest.load(Ordering::SeqCst) != sequence {
                return false;
            }
            match &result {
                Ok(response) => {
                    state.status = FetchStatus::Success;
                    state.data = Some(Arc::clone(response));
                    state.error_message = None;
                }
                Err(err) => {
                    state.status = FetchStatus::Error;
                    state.error_message = Some(err.user_message());
                }
            }
            true
        });

        if !committed {
            debug!(target: TARGET_CONTROLLER, "Refresh #{} superseded, discarding its result", sequence);
            return RefreshOutcome::Superseded;
        }

        match result {
            Ok(response) => {
                info!(target: TARGET_CONTROLLER, "Refresh #{} succeeded with {} results", sequence, response.results.len())
            }
            Err(err) => warn!(target: TARGET_CONTROLLER, "Refresh #{} failed: {}", sequence, err),
        }
        RefreshOutcome::Committed
    }
}

struct Ticket {
    sequence: u64,
    request: AnalysisRequest,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::AnalysisClient;
    use crate::presenter::DashboardView;
    use crate::render::render_dashboard_page;
    use crate::source::FixtureSource;
    use crate::testing::{sample_response, sample_result, MockEngine, MockReply};
    use std::sync::atomic::AtomicUsize;
    use tokio::time::sleep;

    fn live_controller(engine: &MockEngine, request_timeout: Duration) -> RequestController {
        let client = AnalysisClient::new(&engine.base_url()).unwrap();
        RequestController::new(
            DataSource::Live(client),
            ControllerConfig {
                initial: AnalysisRequest::default(),
                request_timeout,
            },
        )
    }

    #[tokio::test]
    async fn test_activate_issues_one_request_with_rendered_params() {
        let engine = MockEngine::start(|_| MockReply::json(&sample_response(vec![]))).await;
        let client = AnalysisClient::new(&engine.base_url()).unwrap();
        let controller = RequestController::new(
            DataSource::Live(client),
            ControllerConfig {
                initial: AnalysisRequest {
                    time_window_hours: TimeWindow::Last12Hours,
                    top_k: TopK::Top20,
                },
                request_timeout: DEFAULT_REQUEST_TIMEOUT,
            },
        );

        assert_eq!(controller.state(), ControllerState::default());
        let state = controller.state();
        let view = DashboardView::project(&state, None);
        let page = render_dashboard_page(&view, &controller.params());

        assert_eq!(controller.activate().await, Some(RefreshOutcome::Committed));
        assert_eq!(controller.activate().await, None);

        let received = engine.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].body, r#"{"time_window_hours":12,"top_k":20}"#);

        let sent = received[0].analysis_request().unwrap();
        assert_eq!(page.matches(" selected>").count(), 2);
        assert!(page.contains(&format!(
            r#"<option value="{}" selected>{}</option>"#,
            sent.time_window_hours.hours(),
            sent.time_window_hours.label()
        )));
        assert!(page.contains(&format!(
            r#"<option value="{}" selected>{}</option>"#,
            sent.top_k.count(),
            sent.top_k
        )));
        assert_eq!(controller.state().requested, Some(sent));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_param_updates_never_mix_fields() {
        let engine = MockEngine::start(|_| MockReply::json(&sample_response(vec![]))).await;
        let controller = Arc::new(live_controller(&engine, DEFAULT_REQUEST_TIMEOUT));
        let narrow = AnalysisRequest {
            time_window_hours: TimeWindow::LastHour,
            top_k: TopK::Top5,
        };
        let wide = AnalysisRequest {
            time_window_hours: TimeWindow::LastWeek,
            top_k: TopK::Top50,
        };

        let tasks: Vec<_> = (0..40)
            .map(|i| {
                let controller = Arc::clone(&controller);
                let request = if i % 2 == 0 { narrow } else { wide };
                tokio::spawn(async move {
                    controller.set_params(request);
                    controller.spawn_refresh().await.unwrap()
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let received = engine.received();
        assert_eq!(received.len(), 40);
        for request in received {
            let sent = request.analysis_request().unwrap();
            assert!(sent == narrow || sent == wide, "mixed request {:?}", sent);
        }
        let params = controller.params();
        assert!(params == narrow || params == wide);
    }

    #[tokio::test]
    async fn test_refresh_sends_current_params() {
        let engine = MockEngine::start(|_| MockReply::json(&sample_response(vec![]))).await;
        let controller = live_controller(&engine, DEFAULT_REQUEST_TIMEOUT);

        controller.set_time_window(TimeWindow::Last3Days);
        controller.set_top_k(TopK::Top50);
        controller.refresh().await;

        assert_eq!(
            engine.received()[0].body,
            r#"{"time_window_hours":72,"top_k":50}"#
        );
    }

    #[tokio::test]
    async fn test_loading_then_success() {
        let engine = MockEngine::start(|_| {
            MockReply::json(&sample_response(vec![sample_result("g1", 0.5)]))
                .delayed(Duration::from_millis(100))
        })
        .await;
        let controller = live_controller(&engine, DEFAULT_REQUEST_TIMEOUT);
        let mut rx = controller.subscribe();

        let (outcome, seen_loading) = tokio::join!(controller.refresh(), async {
            rx.wait_for(|state| state.is_loading()).await.is_ok()
        });
        assert_eq!(outcome, RefreshOutcome::Committed);
        assert!(seen_loading);

        let state = controller.state();
        assert_eq!(state.status, FetchStatus::Success);
        assert_eq!(state.error_message, None);
        assert_eq!(state.data.unwrap().results[0].dedup_group, "g1");
    }

    #[tokio::test]
    async fn test_refresh_twice_is_idempotent() {
        let engine = MockEngine::start(|_| {
            MockReply::json(&sample_response(vec![sample_result("g1", 0.5), sample_result("g2", 0.25)]))
        })
        .await;
        let controller = live_controller(&engine, DEFAULT_REQUEST_TIMEOUT);

        controller.refresh().await;
        let once = controller.state();
        controller.refresh().await;
        let twice = controller.state();

        assert_eq!(once, twice);
        assert_eq!(engine.received().len(), 2);
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_data() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let engine = MockEngine::start(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                MockReply::json(&sample_response(vec![sample_result("g1", 0.9)]))
            } else {
                MockReply::status(500, "internal error")
            }
        })
        .await;
        let controller = live_controller(&engine, DEFAULT_REQUEST_TIMEOUT);

        controller.refresh().await;
        let before = controller.state().data;
        assert!(before.is_some());

        assert_eq!(controller.refresh().await, RefreshOutcome::Committed);
        let state = controller.state();
        assert_eq!(state.status, FetchStatus::Error);
        assert!(!state.is_loading());
        let message = state.error_message.unwrap();
        assert!(!message.is_empty());
        assert!(message.contains("500"));
        assert_eq!(state.data, before);
    }

    #[tokio::test]
    async fn test_new_refresh_clears_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let engine = MockEngine::start(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                MockReply::status(502, "")
            } else {
                MockReply::json(&sample_response(vec![])).delayed(Duration::from_millis(100))
            }
        })
        .await;
        let controller = live_controller(&engine, DEFAULT_REQUEST_TIMEOUT);

        controller.refresh().await;
        assert_eq!(controller.state().status, FetchStatus::Error);

        let mut rx = controller.subscribe();
        let (_, error_while_loading) = tokio::join!(controller.refresh(), async {
            rx.wait_for(|state| state.is_loading())
                .await
                .map(|state| state.error_message.clone())
                .ok()
        });
        assert_eq!(error_while_loading, Some(None));
        assert_eq!(controller.state().status, FetchStatus::Success);
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded() {
        let engine = MockEngine::start(|received| {
            let request = received.analysis_request().unwrap();
            let hours = request.time_window_hours.hours();
            let mut response = sample_response(vec![sample_result(&format!("window-{}", hours), 0.5)]);
            response.total_articles_analyzed = hours as u64;
            let delay = if hours == 24 { 400 } else { 20 };
            MockReply::json(&response).delayed(Duration::from_millis(delay))
        })
        .await;
        let controller = live_controller(&engine, DEFAULT_REQUEST_TIMEOUT);
        controller.set_time_window(TimeWindow::Last24Hours);

        let (first, second) = tokio::join!(controller.refresh(), async {
            sleep(Duration::from_millis(50)).await;
            controller.set_time_window(TimeWindow::LastHour);
            controller.refresh().await
        });

        assert_eq!(first, RefreshOutcome::Superseded);
        assert_eq!(second, RefreshOutcome::Committed);

        let state = controller.state();
        assert_eq!(state.status, FetchStatus::Success);
        assert_eq!(state.data.unwrap().total_articles_analyzed, 1);
        assert_eq!(
            state.requested.map(|r| r.time_window_hours),
            Some(TimeWindow::LastHour)
        );
        assert_eq!(engine.received().len(), 2);
    }

    #[tokio::test]
    async fn test_stale_failure_does_not_override_success() {
        let engine = MockEngine::start(|received| {
            let request = received.analysis_request().unwrap();
            if request.time_window_hours == TimeWindow::Last24Hours {
                MockReply::status(500, "").delayed(Duration::from_millis(300))
            } else {
                MockReply::json(&sample_response(vec![]))
            }
        })
        .await;
        let controller = live_controller(&engine, DEFAULT_REQUEST_TIMEOUT);

        let (first, _) = tokio::join!(controller.refresh(), async {
            sleep(Duration::from_millis(50)).await;
            controller.set_time_window(TimeWindow::Last6Hours);
            controller.refresh().await
        });

        assert_eq!(first, RefreshOutcome::Superseded);
        let state = controller.state();
        assert_eq!(state.status, FetchStatus::Success);
        assert_eq!(state.error_message, None);
    }

    #[tokio::test]
    async fn test_hung_request_times_out_into_error() {
        let engine = MockEngine::start(|_| {
            MockReply::json(&sample_response(vec![])).delayed(Duration::from_secs(5))
        })
        .await;
        let controller = live_controller(&engine, Duration::from_millis(100));

        assert_eq!(controller.refresh().await, RefreshOutcome::Committed);
        let state = controller.state();
        assert_eq!(state.status, FetchStatus::Error);
        assert!(state.error_message.unwrap().contains("timed out"));
        assert!(state.data.is_none());
    }

    #[tokio::test]
    async fn test_fixture_source_is_transparent() {
        let response = sample_response(vec![sample_result("fixture-1", 0.8)]);
        let controller = RequestController::new(
            DataSource::Fixture(FixtureSource::with_response(response.clone(), Duration::from_millis(10))),
            ControllerConfig::default(),
        );
        assert_eq!(controller.source_kind(), DataSourceKind::Fixture);

        controller.activate().await;
        let state = controller.state();
        assert_eq!(state.status, FetchStatus::Success);
        assert_eq!(state.data.as_deref(), Some(&response));
    }

    #[tokio::test]
    async fn test_spawn_refresh_is_loading_on_return() {
        let controller = Arc::new(RequestController::new(
            DataSource::Fixture(FixtureSource::with_response(
                sample_response(vec![]),
                Duration::from_millis(50),
            )),
            ControllerConfig::default(),
        ));

        let handle = controller.spawn_activate().unwrap();
        assert!(controller.state().is_loading());
        assert!(controller.spawn_activate().is_none());

        assert_eq!(handle.await.unwrap(), RefreshOutcome::Committed);
        assert_eq!(controller.state().status, FetchStatus::Success);
    }
}
