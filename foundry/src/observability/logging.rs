//! Subscriber setup and timing helpers for structured logs.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable, one event per line.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Installs the global subscriber.
///
/// The filter comes from `RUST_LOG` and falls back to `info`. Returns
/// `false` if a subscriber was already installed, in which case nothing
/// changes.
pub fn init_tracing(format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true).with_current_span(true))
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(false)).try_init(),
    };
    installed.is_ok()
}

/// Measures wall time for a named unit of work.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: &'static str,
}

impl SpanTimer {
    /// Starts a new timer.
    #[must_use]
    pub fn start(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            name,
        }
    }

    /// The timer's name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}
