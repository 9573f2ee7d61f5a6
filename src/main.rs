use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use url::Url;

use radar::controller::{FetchStatus, RequestController};
use radar::environment::Settings;
use radar::logging::configure_logging;
use radar::presenter::DashboardView;
use radar::render::render_dashboard_text;
use radar::schema::{TimeWindow, TopK};
use radar::source::DataSourceKind;
use radar::web;

#[derive(Parser)]
#[clap(name = "radar", about = "Dashboard for hot financial news clusters")]
struct Cli {
    /// Where analysis results come from (overrides RADAR_DATA_SOURCE)
    #[clap(long, global = true, value_enum)]
    source: Option<DataSourceKind>,

    /// Base URL of the analysis engine (overrides API_BASE_URL)
    #[clap(long, global = true)]
    api_url: Option<Url>,

    /// Per-request timeout in seconds (overrides RADAR_REQUEST_TIMEOUT_SECS)
    #[clap(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the web dashboard
    Serve {
        /// Listen port (overrides PORT)
        #[clap(short, long)]
        port: Option<u16>,
    },

    /// Fetch once and print the dashboard to the terminal
    Fetch {
        /// Time window in hours: 1, 3, 6, 12, 24, 48, 72 or 168
        #[clap(short, long, value_parser = parse_time_window)]
        window: Option<TimeWindow>,

        /// Number of clusters: 5, 10, 15, 20, 30 or 50
        #[clap(short = 'k', long, value_parser = parse_top_k)]
        top_k: Option<TopK>,

        /// Also print the detail view of this dedup group
        #[clap(short, long)]
        open: Option<String>,

        /// Print the raw response as JSON
        #[clap(long)]
        json: bool,
    },
}

fn parse_time_window(value: &str) -> Result<TimeWindow, String> {
    let hours: u32 = value.parse().map_err(|_| format!("'{}' is not a number", value))?;
    TimeWindow::try_from(hours).map_err(|e| e.to_string())
}

fn parse_top_k(value: &str) -> Result<TopK, String> {
    let count: u32 = value.parse().map_err(|_| format!("'{}' is not a number", value))?;
    TopK::try_from(count).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    configure_logging();

    let mut settings = Settings::from_env()?;
    if let Some(source) = cli.source {
        settings.data_source = source;
    }
    if let Some(api_url) = cli.api_url {
        settings.api_base_url = api_url;
    }
    if let Some(timeout_secs) = cli.timeout_secs {
        settings.request_timeout = Duration::from_secs(timeout_secs);
    }

    let source = settings
        .build_source()
        .context("failed to set up data source")?;
    info!(
        "Using {} data source (engine: {})",
        source.kind(),
        settings.api_base_url
    );
    let controller = Arc::new(RequestController::new(source, settings.controller_config()));

    match cli.command {
        Commands::Serve { port } => web::serve(controller, port.unwrap_or(settings.port)).await,
        Commands::Fetch {
            window,
            top_k,
            open,
            json,
        } => fetch(&controller, window, top_k, open.as_deref(), json).await,
    }
}

async fn fetch(
    controller: &RequestController,
    window: Option<TimeWindow>,
    top_k: Option<TopK>,
    open: Option<&str>,
    json: bool,
) -> Result<()> {
    if let Some(window) = window {
        controller.set_time_window(window);
    }
    if let Some(top_k) = top_k {
        controller.set_top_k(top_k);
    }
    controller.activate().await;

    let state = controller.state();
    if state.status == FetchStatus::Error {
        bail!(state
            .error_message
            .unwrap_or_else(|| "Failed to load news".to_string()));
    }

    match (&state.data, json) {
        (Some(data), true) => println!("{}", serde_json::to_string_pretty(data.as_ref())?),
        _ => {
            let view = DashboardView::project(&state, open);
            print!("{}", render_dashboard_text(&view, &controller.params()));
        }
    }
    Ok(())
}
