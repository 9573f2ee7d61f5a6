//! Shared test fixtures and a scriptable mock of the analysis engine.

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use chrono::{TimeZone, Utc};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

use crate::schema::{AnalysisRequest, AnalysisResponse, AnalysisResult, NewsSource, TimelineEvent};

pub fn sample_result(dedup_group: &str, hotness: f64) -> AnalysisResult {
    AnalysisResult {
        dedup_group: dedup_group.to_string(),
        hotness,
        headline: format!("Headline for {}", dedup_group),
        why_now: "Central bank surprised the market".to_string(),
        entities: vec!["Fed".to_string(), "ECB".to_string()],
        sources: vec![
            NewsSource {
                url: "https://news.example/a".to_string(),
                title: "Rates decision".to_string(),
                published_at: Some(Utc.with_ymd_and_hms(2025, 3, 1, 9, 15, 0).unwrap()),
            },
            NewsSource {
                url: "https://news.example/b".to_string(),
                title: "Market reaction".to_string(),
                published_at: None,
            },
        ],
        timeline: vec![
            TimelineEvent {
                time: "09:15".to_string(),
                event: "Decision announced".to_string(),
            },
            TimelineEvent {
                time: "09:40".to_string(),
                event: "Bond yields jump".to_string(),
            },
        ],
        draft: "Line one\n\n  Line two".to_string(),
        telegram_post: "Rates up".to_string(),
    }
}

pub fn sample_response(results: Vec<AnalysisResult>) -> AnalysisResponse {
    AnalysisResponse {
        total_clusters: results.len() as u64,
        results,
        total_articles_analyzed: 120,
        analysis_timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap(),
    }
}

#[derive(Clone, Debug)]
pub struct ReceivedRequest {
    pub body: String,
    pub content_type: Option<String>,
}

impl ReceivedRequest {
    pub fn analysis_request(&self) -> Option<AnalysisRequest> {
        serde_json::from_str(&self.body).ok()
    }
}

pub struct MockReply {
    status: u16,
    body: String,
    delay: Duration,
}

impl MockReply {
    pub fn json<T: Serialize>(value: &T) -> Self {
        Self {
            status: 200,
            body: serde_json::to_string(value).unwrap(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Responder = Arc<dyn Fn(&ReceivedRequest) -> MockReply + Send + Sync>;

#[derive(Clone)]
struct MockState {
    responder: Responder,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
}

/// An analysis engine bound to an ephemeral local port.
pub struct MockEngine {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
    handle: JoinHandle<()>,
}

impl MockEngine {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&ReceivedRequest) -> MockReply + Send + Sync + 'static,
    {
        let received = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            responder: Arc::new(responder),
            received: received.clone(),
        };
        let app = Router::new()
            .route("/api/v1/analyze", post(analyze))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            received,
            handle,
        }
    }

    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr)).unwrap()
    }

    pub fn received(&self) -> Vec<ReceivedRequest> {
        self.received.lock().unwrap().clone()
    }
}

impl Drop for MockEngine {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn analyze(State(state): State<MockState>, headers: HeaderMap, body: String) -> Response {
    let received = ReceivedRequest {
        body,
        content_type: headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
    };
    let reply = (state.responder)(&received);
    state.received.lock().unwrap().push(received);

    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(CONTENT_TYPE, "application/json")], reply.body).into_response()
}
