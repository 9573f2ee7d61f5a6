//! The dashboard server.

use anyhow::{Context, Result};
use axum::extract::{Form, Query, State};
use axum::response::{Html, Redirect};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use crate::controller::{ControllerState, RequestController};
use crate::presenter::DashboardView;
use crate::render::render_dashboard_page;
use crate::schema::{AnalysisRequest, TimeWindow, TopK};

#[derive(Clone)]
struct AppState {
    controller: Arc<RequestController>,
}

#[derive(Deserialize)]
struct DashboardQuery {
    open: Option<String>,
}

/// Selector values; anything outside the enumerated sets is rejected by the extractor.
#[derive(Deserialize)]
struct RefreshForm {
    time_window_hours: TimeWindow,
    top_k: TopK,
}

pub fn build_router(controller: Arc<RequestController>) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/refresh", post(refresh))
        .route("/api/state", get(state_json))
        .with_state(AppState { controller })
}

/// Runs the dashboard until ctrl-c, after kicking off the initial load.
pub async fn serve(controller: Arc<RequestController>, port: u16) -> Result<()> {
    controller.spawn_activate();

    let app = build_router(controller);
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    info!("Dashboard running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("dashboard server failed")?;

    info!("Dashboard stopped");
    Ok(())
}

async fn shutdown_signal() {
    if signal::ctrl_c().await.is_err() {
        error!("Failed to listen for ctrl-c");
    }
}

async fn dashboard(State(app): State<AppState>, Query(query): Query<DashboardQuery>) -> Html<String> {
    let state = app.controller.state();
    let params = app.controller.params();
    let view = DashboardView::project(&state, query.open.as_deref());
    Html(render_dashboard_page(&view, &params))
}

async fn refresh(State(app): State<AppState>, Form(form): Form<RefreshForm>) -> Redirect {
    info!(
        "Refresh requested: window={} top_k={}",
        form.time_window_hours,
        form.top_k.count()
    );
    app.controller.set_params(AnalysisRequest {
        time_window_hours: form.time_window_hours,
        top_k: form.top_k,
    });
    app.controller.spawn_refresh();
    Redirect::to("/")
}

async fn state_json(State(app): State<AppState>) -> Json<ControllerState> {
    Json(app.controller.state())
}
