//! Plain-text dashboard for the `fetch` command.

use colored::Colorize;
use std::fmt::Write;

use crate::presenter::{CollapsedView, DashboardBody, DashboardView, ExpandedView};
use crate::schema::AnalysisRequest;

pub fn render_dashboard_text(view: &DashboardView<'_>, params: &AnalysisRequest) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({}, {})",
        "HOT NEWS RADAR".bold(),
        params.time_window_hours.label(),
        params.top_k
    );

    if let Some(stats) = &view.stats {
        let _ = writeln!(
            out,
            "Articles analyzed: {} | Clusters found: {} | Updated: {}",
            stats.articles_analyzed, stats.clusters, stats.updated_at
        );
    }
    if let Some(error) = view.error {
        let _ = writeln!(out, "{}", error.red().bold());
    }
    out.push('\n');

    match &view.body {
        DashboardBody::Idle => {}
        DashboardBody::Loading => out.push_str("Analyzing news...\n"),
        DashboardBody::Empty => {
            out.push_str("No news found\n");
            out.push_str("Try a different time window or filter settings\n");
        }
        DashboardBody::Results(cards) => {
            for (index, card) in cards.iter().enumerate() {
                write_card(&mut out, index + 1, &card.collapsed());
            }
        }
    }

    if let Some(expanded) = view.open_card().and_then(|card| card.expanded()) {
        write_detail(&mut out, &expanded);
    }
    out
}

fn write_card(out: &mut String, rank: usize, card: &CollapsedView<'_>) {
    let color = card.classification.severity.terminal();
    let mut entities = card.entities.join(", ");
    if let Some(hidden) = card.overflow {
        entities.push_str(&format!(", +{}", hidden));
    }

    let _ = writeln!(
        out,
        "{:>2}. [{}] {}",
        rank,
        card.classification.label.to_uppercase().color(color).bold(),
        card.headline.bold()
    );
    let _ = writeln!(out, "    {}", card.why_now);
    if !entities.is_empty() {
        let _ = writeln!(out, "    Entities: {}", entities);
    }
    let _ = writeln!(
        out,
        "    Hotness: {}% | {} sources | id: {}",
        card.hotness_percent, card.source_count, card.dedup_group
    );
    out.push('\n');
}

fn write_detail(out: &mut String, detail: &ExpandedView<'_>) {
    let color = detail.classification.severity.terminal();
    let _ = writeln!(out, "{}", "=".repeat(72));
    let _ = writeln!(
        out,
        "{} {}",
        detail.headline.bold(),
        format!("{}%", detail.hotness_percent).color(color).bold()
    );
    let _ = writeln!(out, "{}\n", detail.why_now);

    let _ = writeln!(out, "{}", "Post draft".underline());
    let _ = writeln!(out, "{}\n", detail.draft);
    let _ = writeln!(out, "{}", "Telegram post".underline());
    let _ = writeln!(out, "{}\n", detail.telegram_post);

    if !detail.entities.is_empty() {
        let _ = writeln!(out, "{}", "Key entities".underline());
        let _ = writeln!(out, "{}\n", detail.entities.join(", "));
    }
    if !detail.timeline.is_empty() {
        let _ = writeln!(out, "{}", "Timeline".underline());
        for event in detail.timeline {
            let _ = writeln!(out, "  {}  {}", event.time.dimmed(), event.event);
        }
        out.push('\n');
    }
    if !detail.sources.is_empty() {
        let _ = writeln!(out, "{}", "Sources".underline());
        for source in &detail.sources {
            match &source.published_at {
                Some(at) => {
                    let _ = writeln!(out, "  {} ({})\n    {}", source.title, at, source.url);
                }
                None => {
                    let _ = writeln!(out, "  {}\n    {}", source.title, source.url);
                }
            }
        }
    }
}
