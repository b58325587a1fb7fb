/*!
 * Tracing
 * Subscriber setup and lifecycle spans using the tracing crate
 */

use crate::config::ENV_TRACE_JSON;
use crate::core::types::Pid;
use tracing::{info, span, Level, Span};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - PROCHOLD_TRACE_JSON: Enable JSON output (default: false)
///
/// `log` records from the library are bridged into the subscriber. Returns
/// false if a global subscriber was already installed.
pub fn init_tracing(json: bool) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = json
        || std::env::var(ENV_TRACE_JSON)
            .map(|v| v == "1" || v == "true")
            .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = use_json, "Structured tracing initialized");
    }
    installed
}

/// Span covering one module lifecycle phase (`load`, `unload`)
pub fn span_lifecycle(phase: &'static str, client_pid: Pid) -> Span {
    span!(Level::INFO, "lifecycle", phase = phase, client_pid = client_pid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_without_subscriber() {
        let span = span_lifecycle("load", 500);
        let _entered = span.enter();
    }

    #[test]
    fn test_second_init_is_rejected() {
        init_tracing(false);
        assert!(!init_tracing(false));
    }
}
