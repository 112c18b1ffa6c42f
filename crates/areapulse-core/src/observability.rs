//! Observability infrastructure for the pipeline.
//!
//! Structured logging with consistent spans. Skip-class conditions during a
//! run are visible only through these logs, so every component emits through
//! `tracing` rather than returning partial diagnostics.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `areapulse_etl=debug`)
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Creates a span for one pipeline run with standard fields.
///
/// `trigger` is the run's logical trigger instant in the pipeline's civil
/// timezone, formatted by the caller.
#[must_use]
pub fn run_span(operation: &str, trigger: &str) -> Span {
    tracing::info_span!("pipeline", op = operation, trigger = trigger)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(LogFormat::Pretty);
        init_logging(LogFormat::Pretty);
    }

    #[test]
    fn run_span_creates_span() {
        let span = run_span("run", "2025-07-08 09:35:00");
        let _guard = span.enter();
        tracing::info!("test message in span");
    }
}
