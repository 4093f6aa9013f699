//! Tracing/logging initialization
//!
//! The library only emits `tracing` events. Hosts that have no subscriber of
//! their own can install one here.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

/// Output format for [`init_tracing`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Install a global subscriber
///
/// `RUST_LOG` takes precedence over `level`. Returns `false` when a global
/// subscriber was already set, so calling this from several tests is fine.
pub fn init_tracing(level: &str, format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE);
            subscriber.with(fmt_layer).try_init().is_ok()
        }
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .with_target(true)
                .with_test_writer()
                .with_span_events(FmtSpan::CLOSE);
            subscriber.with(fmt_layer).try_init().is_ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        let _ = init_tracing("debug", LogFormat::Pretty);
        assert!(!init_tracing("debug", LogFormat::Json));
    }
}
