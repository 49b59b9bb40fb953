//! Tracing bootstrap shared by the whole workspace.
//!
//! The binary calls [`init`] once; libraries only emit `tracing` events.

use std::io::{self, IsTerminal};

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Workspace crates whose events are raised to the requested level.
pub const WORKSPACE_TARGETS: &[&str] = &["study_backend", "api", "contextor", "rag_store", "ai_llm_service"];

/// RFC3339 UTC timer implemented via `chrono`.
/// Example output: `2025-09-12T10:20:30Z`
#[derive(Clone, Debug, Default)]
struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        w.write_str(&now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
    }
}

/// Builds the filter: `RUST_LOG` wins; otherwise `warn` for dependencies and
/// `level` for workspace crates.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut spec = String::from("warn");
        for target in WORKSPACE_TARGETS {
            spec.push_str(&format!(",{target}={level}"));
        }
        EnvFilter::new(spec)
    })
}

/// Installs the global subscriber: compact single-line output, RFC3339 timer,
/// `file:line`, span-close timings, ANSI only on a terminal.
///
/// Returns `false` if a subscriber was already installed (tests, embedding).
pub fn init(level: &str) -> bool {
    let fmt_layer = fmt::layer()
        .with_timer(ChronoRfc3339Utc)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(io::stdout().is_terminal())
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(fmt_layer)
        .try_init()
        .is_ok()
}
