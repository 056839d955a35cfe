use std::str::FromStr;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Quiet HTTP and RPC transport crates unless asked for explicitly.
const NOISY_MODULES: &str = "h2=info,hyper=info,hyper_util=info,reqwest=info,alloy_transport_http=info,notify=info";

/// Expand a bare level into a filter spec. Directive strings (containing
/// `,` or `=`) pass through untouched.
pub fn filter_spec(log_level: &str) -> String {
    let normalized = log_level.trim();
    if normalized.contains(',') || normalized.contains('=') {
        normalized.to_string()
    } else {
        format!("{normalized},{NOISY_MODULES}")
    }
}

/// Install the global subscriber. Logs go to stderr so JSON printed by
/// the CLI on stdout stays machine-readable.
pub fn setup_logging(log_level: &str, json_format: bool) {
    let spec = filter_spec(log_level);
    let filter = EnvFilter::from_str(&spec).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry().with(filter);

    if json_format {
        let json_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_current_span(false);
        subscriber.with(json_layer).init();
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .compact();
        subscriber.with(fmt_layer).init();
    }

    tracing::debug!(
        filter = %spec,
        format = if json_format { "json" } else { "compact" },
        "logging initialized"
    );
}
