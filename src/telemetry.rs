//! Terminal formatting for progress events and tracing initialization.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

use crate::progress::event::{ProgressEvent, ProgressEventKind};

pub const START_COLOR: &str = "\x1b[32m"; // green
pub const ERROR_COLOR: &str = "\x1b[31m"; // red
pub const LABEL_COLOR: &str = "\x1b[35m"; // magenta
pub const RESET_COLOR: &str = "\x1b[0m";

/// Formatter color mode.
///
/// - [`FormatterMode::Auto`]: detect TTY capability via `stderr.is_terminal()`
/// - [`FormatterMode::Colored`]: always include ANSI color codes
/// - [`FormatterMode::Plain`]: never include color codes (logs/files)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatterMode {
    #[default]
    Auto,
    Colored,
    Plain,
}

impl FormatterMode {
    pub fn auto_detect() -> Self {
        if std::io::stderr().is_terminal() {
            FormatterMode::Colored
        } else {
            FormatterMode::Plain
        }
    }

    pub fn is_colored(&self) -> bool {
        match self {
            FormatterMode::Auto => std::io::stderr().is_terminal(),
            FormatterMode::Colored => true,
            FormatterMode::Plain => false,
        }
    }
}

/// Renders progress events for line-oriented sinks.
pub trait ProgressFormatter: Send + Sync {
    fn render(&self, event: &ProgressEvent) -> String;
}

/// Plain text formatter with optional ANSI color codes.
pub struct PlainFormatter {
    mode: FormatterMode,
}

impl PlainFormatter {
    pub fn new() -> Self {
        Self {
            mode: FormatterMode::Auto,
        }
    }

    pub fn with_mode(mode: FormatterMode) -> Self {
        Self { mode }
    }

    fn color(&self, ansi_code: &'static str) -> &'static str {
        if self.mode.is_colored() { ansi_code } else { "" }
    }

    fn reset(&self) -> &'static str {
        if self.mode.is_colored() { RESET_COLOR } else { "" }
    }
}

impl Default for PlainFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressFormatter for PlainFormatter {
    fn render(&self, event: &ProgressEvent) -> String {
        let label_color = match event.kind {
            ProgressEventKind::Error { .. } => self.color(ERROR_COLOR),
            ProgressEventKind::Start { .. } | ProgressEventKind::End => self.color(START_COLOR),
            _ => self.color(LABEL_COLOR),
        };
        format!(
            "{label_color}{:>15}{} {event}",
            event.kind.label(),
            self.reset(),
        )
    }
}

/// Install a global `tracing` subscriber reading `RUST_LOG`.
///
/// Idempotent: later calls are no-ops once a subscriber is installed.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
