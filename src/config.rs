//! Environment-driven configuration for observability behavior.
//!
//! Execution semantics never depend on configuration; only what gets
//! recorded and printed does. `.env` files are honored via `dotenvy` before
//! the process environment is read.
//!
//! Recognized variables:
//! - `TRELLIS_CHECKPOINTS`: `false`/`0`/`no`/`off` disables checkpoint and
//!   progress capture entirely.
//! - `TRELLIS_PRINT_URL`: force the console-URL print on or off.
//! - `TRELLIS_CONSOLE_URL`: base URL for the printed execution link.
//! - `TRELLIS_ORG`: organization segment of the execution link.
//! - `CI`: suppresses URL printing by default.

const DEFAULT_CONSOLE_URL: &str = "https://app.trellis.dev";

/// Resolved observability configuration for one run.
#[derive(Clone, Debug)]
pub struct TrellisConfig {
    pub checkpoints_enabled: bool,
    pub print_url: Option<bool>,
    pub console_base_url: String,
    pub org: Option<String>,
    pub in_ci: bool,
}

impl TrellisConfig {
    /// Read configuration from `.env` and the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let checkpoints_enabled = std::env::var("TRELLIS_CHECKPOINTS")
            .map(|v| !is_disabled_flag(&v))
            .unwrap_or(true);
        let print_url = std::env::var("TRELLIS_PRINT_URL")
            .ok()
            .map(|v| !is_disabled_flag(&v));
        let console_base_url = std::env::var("TRELLIS_CONSOLE_URL")
            .unwrap_or_else(|_| DEFAULT_CONSOLE_URL.to_string());
        let org = std::env::var("TRELLIS_ORG").ok().filter(|v| !v.is_empty());
        let in_ci = std::env::var("CI").map(|v| !v.is_empty()).unwrap_or(false);
        Self {
            checkpoints_enabled,
            print_url,
            console_base_url,
            org,
            in_ci,
        }
    }

    /// Whether to print the execution URL after a run.
    ///
    /// Priority: per-run override, then `TRELLIS_PRINT_URL`, then the
    /// default, which prints only when an org is configured and not in CI.
    pub fn should_print_url(&self, run_override: Option<bool>) -> bool {
        match run_override.or(self.print_url) {
            Some(explicit) => explicit,
            None => self.org.is_some() && !self.in_ci,
        }
    }

    /// Console link for a finished execution.
    pub fn execution_url(&self, run_id: &str, workflow_name: &str) -> String {
        let org = self.org.as_deref().unwrap_or("default");
        format!(
            "{}/{org}/default/executions/{run_id}?workflowName={workflow_name}",
            self.console_base_url.trim_end_matches('/'),
        )
    }
}

/// Truthiness convention for disable flags: `false`, `0`, `no`, `off`
/// (case-insensitive) disable; anything else keeps the feature on.
pub fn is_disabled_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "no" | "off"
    )
}
