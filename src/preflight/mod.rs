//! Preflight checks before a conversion.
//!
//! Resolves every external program the run needs so that a missing tool
//! is reported up front instead of halfway through a long conversion.
//! No external command is executed here.

mod host_tools;
mod types;

use anyhow::{bail, Result};

use crate::config::Config;
use crate::extract::InputKind;

pub use host_tools::{required_tools, Tool};
pub use types::{CheckResult, CheckStatus, PreflightReport};

/// Run all preflight checks.
pub fn run_preflight(kind: InputKind, config: &Config) -> PreflightReport {
    PreflightReport {
        checks: host_tools::check_host_tools(kind, config),
    }
}

/// Run preflight and bail if any checks fail.
pub fn run_preflight_or_fail(kind: InputKind, config: &Config) -> Result<()> {
    let report = run_preflight(kind, config);
    report.log();

    if !report.all_passed() {
        let missing: Vec<String> = report
            .failures()
            .map(|c| format!("  {}: {}", c.name, c.details.as_deref().unwrap_or("")))
            .collect();
        bail!(
            "Preflight failed: {} required tool(s) missing:\n{}",
            report.fail_count(),
            missing.join("\n")
        );
    }

    Ok(())
}
