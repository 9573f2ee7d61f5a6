use std::io;
use tracing_appender::rolling;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Console logging goes to stderr so `radar fetch` output stays clean on stdout.
pub fn configure_logging() {
    let console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,web_request=info,controller=info,hyper=warn,reqwest=warn")
    });
    let console_log = fmt::layer()
        .with_writer(io::stderr)
        .with_filter(console_filter);

    // File log configuration
    let file_appender = rolling::daily("logs", "radar.log");
    let file_log = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_filter(EnvFilter::new(
            "info,web_request=debug,controller=debug,hyper=warn",
        ));

    tracing_subscriber::Registry::default()
        .with(console_log)
        .with(file_log)
        .init();
}
