//! Server-rendered HTML for the dashboard page.
//!
//! The page is self-contained (inline CSS, no scripts). While a refresh is in
//! flight it reloads itself every few seconds until the controller settles.

use url::form_urlencoded;

use crate::presenter::{CollapsedView, DashboardBody, DashboardView, ExpandedView, StatsView};
use crate::schema::{AnalysisRequest, TimeWindow, TopK};

const LOADING_RELOAD_SECS: u32 = 2;

/// Render the full dashboard page.
pub fn render_dashboard_page(view: &DashboardView<'_>, params: &AnalysisRequest) -> String {
    let reload = if view.loading {
        format!(
            r#"<meta http-equiv="refresh" content="{}">"#,
            LOADING_RELOAD_SECS
        )
    } else {
        String::new()
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    {reload}
    <title>Hot News Radar</title>
    <style>{css}</style>
</head>
<body>
    <header>
        <h1>HOT NEWS RADAR</h1>
        <p class="muted">Detection and scoring of hot financial news</p>
    </header>
    <main>
        <section class="panel">
            {controls}
            {stats}
        </section>
        {error}
        {body}
        {detail}
    </main>
</body>
</html>"#,
        reload = reload,
        css = inline_css(),
        controls = render_controls(params, view.loading),
        stats = view.stats.as_ref().map(render_stats).unwrap_or_default(),
        error = view.error.map(render_error).unwrap_or_default(),
        body = render_body(&view.body),
        detail = view
            .open_card()
            .and_then(|card| card.expanded())
            .map(|expanded| render_detail(&expanded))
            .unwrap_or_default(),
    )
}

fn render_controls(params: &AnalysisRequest, loading: bool) -> String {
    let windows: String = TimeWindow::ALL
        .iter()
        .map(|window| {
            render_option(
                window.hours(),
                window.label(),
                *window == params.time_window_hours,
            )
        })
        .collect();
    let counts: String = TopK::ALL
        .iter()
        .map(|top_k| render_option(top_k.count(), &top_k.to_string(), *top_k == params.top_k))
        .collect();
    let button = if loading {
        r#"<button type="submit" disabled>Loading...</button>"#
    } else {
        r#"<button type="submit">Refresh</button>"#
    };

    format!(
        r#"<form class="controls" method="post" action="/refresh">
                <label>Time window
                    <select name="time_window_hours">{windows}</select>
                </label>
                <label>Number of news
                    <select name="top_k">{counts}</select>
                </label>
                {button}
            </form>"#,
        windows = windows,
        counts = counts,
        button = button,
    )
}

fn render_option(value: u32, label: &str, selected: bool) -> String {
    format!(
        r#"<option value="{}"{}>{}</option>"#,
        value,
        if selected { " selected" } else { "" },
        html_escape(label)
    )
}

fn render_stats(stats: &StatsView) -> String {
    format!(
        r#"<div class="stats">
                <span class="stat">Articles analyzed: {}</span>
                <span class="stat">Clusters found: {}</span>
                <span class="stat">Updated: {}</span>
            </div>"#,
        stats.articles_analyzed,
        stats.clusters,
        html_escape(&stats.updated_at)
    )
}

fn render_error(message: &str) -> String {
    format!(
        r#"<div class="error" role="alert">{}</div>"#,
        html_escape(message)
    )
}

fn render_body(body: &DashboardBody<'_>) -> String {
    match body {
        DashboardBody::Idle => String::new(),
        DashboardBody::Loading => {
            r#"<div class="loading">Analyzing news...</div>"#.to_string()
        }
        DashboardBody::Empty => r#"<div class="empty">
            <h3>No news found</h3>
            <p class="muted">Try a different time window or filter settings</p>
        </div>"#
            .to_string(),
        DashboardBody::Results(cards) => {
            let cards: String = cards
                .iter()
                .map(|card| render_card(&card.collapsed()))
                .collect();
            format!(r#"<div class="grid">{}</div>"#, cards)
        }
    }
}

fn render_card(card: &CollapsedView<'_>) -> String {
    let mut entities: String = card
        .entities
        .iter()
        .map(|entity| format!(r#"<span class="tag">{}</span>"#, html_escape(entity)))
        .collect();
    if let Some(hidden) = card.overflow {
        entities.push_str(&format!(r#"<span class="tag">+{}</span>"#, hidden));
    }

    format!(
        r#"<article class="card tier-{tier}" id="{anchor}">
                <div class="card-head">
                    <h2>{headline}</h2>
                    <span class="badge" style="background:{color}">{label}</span>
                </div>
                <p class="muted">{why_now}</p>
                <div class="tags">{entities}</div>
                <div class="meta">
                    <span>Hotness: {percent}%</span>
                    <span>{sources} sources</span>
                </div>
                <a class="more" href="/?open={open}#detail">Details</a>
            </article>"#,
        tier = card.classification.tier,
        anchor = html_escape(card.dedup_group),
        headline = html_escape(card.headline),
        color = card.classification.severity.css(),
        label = html_escape(card.classification.label),
        why_now = html_escape(card.why_now),
        entities = entities,
        percent = card.hotness_percent,
        sources = card.source_count,
        open = query_escape(card.dedup_group),
    )
}

fn render_detail(detail: &ExpandedView<'_>) -> String {
    let entities = if detail.entities.is_empty() {
        String::new()
    } else {
        let tags: String = detail
            .entities
            .iter()
            .map(|entity| format!(r#"<span class="tag">{}</span>"#, html_escape(entity)))
            .collect();
        format!(r#"<h3>Key entities</h3><div class="tags">{}</div>"#, tags)
    };

    let timeline = if detail.timeline.is_empty() {
        String::new()
    } else {
        let events: String = detail
            .timeline
            .iter()
            .map(|event| {
                format!(
                    r#"<li><span class="time">{}</span> {}</li>"#,
                    html_escape(&event.time),
                    html_escape(&event.event)
                )
            })
            .collect();
        format!(r#"<h3>Timeline</h3><ol class="timeline">{}</ol>"#, events)
    };

    let sources = if detail.sources.is_empty() {
        String::new()
    } else {
        let links: String = detail
            .sources
            .iter()
            .map(|source| {
                let published = source
                    .published_at
                    .as_deref()
                    .map(|at| format!(r#"<div class="muted">{}</div>"#, html_escape(at)))
                    .unwrap_or_default();
                let title = match source.href {
                    Some(href) => format!(
                        r#"<a href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#,
                        html_escape(href),
                        html_escape(source.title)
                    ),
                    None => format!(
                        r#"{} <span class="muted">{}</span>"#,
                        html_escape(source.title),
                        html_escape(source.url)
                    ),
                };
                format!("<li>{}{}</li>", title, published)
            })
            .collect();
        format!(r#"<h3>Sources</h3><ul class="sources">{}</ul>"#, links)
    };

    format!(
        r#"<section class="detail" id="detail">
            <div class="card-head">
                <h2>{headline}</h2>
                <span class="badge" style="background:{color}">{percent}%</span>
            </div>
            <p>{why_now}</p>
            <h3>Post draft</h3>
            <div class="draft">{draft}</div>
            <h3>Telegram post</h3>
            <div class="draft">{telegram}</div>
            {entities}
            {timeline}
            {sources}
            <a class="more" href="/">Close</a>
        </section>"#,
        headline = html_escape(detail.headline),
        color = detail.classification.severity.css(),
        percent = detail.hotness_percent,
        why_now = html_escape(detail.why_now),
        draft = html_escape(detail.draft),
        telegram = html_escape(detail.telegram_post),
        entities = entities,
        timeline = timeline,
        sources = sources,
    )
}

fn query_escape(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn inline_css() -> &'static str {
    r#"
body { font-family: system-ui, sans-serif; margin: 0; background: #0f0f17; color: #e5e5ef; }
header, main { max-width: 1200px; margin: 0 auto; padding: 16px; }
h1 { color: #ec4899; margin-bottom: 4px; }
.muted { color: #9ca3af; }
.panel { background: #1a1a26; border: 1px solid #3f3f5a; border-radius: 8px; padding: 16px; margin-bottom: 16px; }
.controls { display: flex; flex-wrap: wrap; gap: 16px; align-items: flex-end; }
.controls label { display: flex; flex-direction: column; gap: 6px; flex: 1; min-width: 200px; }
.stats { display: flex; flex-wrap: wrap; gap: 12px; margin-top: 12px; padding-top: 12px; border-top: 1px solid #3f3f5a; }
.stat, .tag { background: #2a2a3d; border-radius: 999px; padding: 4px 10px; font-size: 0.85em; }
.error { border: 1px solid #ef4444; background: #2b1416; color: #fca5a5; border-radius: 8px; padding: 12px; margin-bottom: 16px; }
.loading, .empty { text-align: center; padding: 64px 0; }
.grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(320px, 1fr)); gap: 16px; }
.card, .detail { background: #1a1a26; border: 1px solid #3f3f5a; border-radius: 8px; padding: 16px; display: flex; flex-direction: column; gap: 8px; }
.detail { margin-top: 24px; background: #ffffff; color: #111827; }
.card-head { display: flex; justify-content: space-between; align-items: flex-start; gap: 12px; }
.card-head h2 { font-size: 1.1em; margin: 0; }
.badge { color: #ffffff; border-radius: 6px; padding: 2px 8px; white-space: nowrap; font-size: 0.8em; }
.tags { display: flex; flex-wrap: wrap; gap: 6px; }
.meta { display: flex; gap: 16px; font-size: 0.85em; color: #9ca3af; }
.draft { white-space: pre-wrap; background: #f9fafb; border: 1px solid #e5e7eb; border-radius: 6px; padding: 12px; }
.timeline { border-left: 2px solid #f472b6; padding-left: 20px; }
.time { color: #6b7280; white-space: nowrap; }
.more { margin-top: auto; text-align: center; color: inherit; }
"#
}
