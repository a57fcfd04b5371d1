//! Compliance probes
//!
//! A probe inspects one security domain and returns exactly one
//! [`CheckOutcome`]. Probes never fail outward: when evidence cannot be
//! gathered the probe degrades to a zero-score `Fail` outcome that explains
//! what went wrong.
//!
//! Each built-in probe follows the same shape:
//! 1. Gather raw evidence through a [`SystemQuery`]
//! 2. Parse it into a typed evidence struct
//! 3. Derive the outcome with a pure `evaluate` function
//!
//! Only step 1 touches the host, so steps 2 and 3 are unit tested with
//! canned command output.

mod antivirus;
mod bitlocker;
mod firewall;
mod installed_software;
mod network_shares;
mod parse;
mod password_policy;
mod query;
mod system_logging;
mod user_accounts;
mod windows_update;

pub use antivirus::AntivirusProbe;
pub use bitlocker::BitLockerProbe;
pub use firewall::FirewallProbe;
pub use installed_software::InstalledSoftwareProbe;
pub use network_shares::NetworkSharesProbe;
pub use password_policy::PasswordPolicyProbe;
pub use query::{default_query, CommandQuery, UnsupportedQuery};
pub use system_logging::SystemLoggingProbe;
pub use user_accounts::UserAccountProbe;
pub use windows_update::WindowsUpdateProbe;

use crate::models::{CheckOutcome, CheckStatus, Severity};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while gathering probe evidence
///
/// These never leave a probe; see [`degraded`].
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("system queries are not supported on {platform}")]
    Unsupported { platform: &'static str },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("query exited with code {code}: {output}")]
    NonZeroExit { code: i32, output: String },

    #[error("query timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("unexpected query output: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type ProbeResult<T> = Result<T, ProbeError>;

/// Source of raw host evidence
///
/// The production implementation shells out to PowerShell; tests supply
/// canned output.
pub trait SystemQuery: Send + Sync {
    /// Run a script and return its trimmed standard output
    fn run(&self, script: &str) -> ProbeResult<String>;

    /// Read a registry value, `None` when the value does not exist
    fn registry_value(&self, key: &str, value: &str) -> ProbeResult<Option<String>> {
        let script = format!(
            "(Get-ItemProperty -Path 'Registry::{key}' -Name '{value}' -ErrorAction SilentlyContinue).'{value}'"
        );
        let out = self.run(&script)?;
        let trimmed = out.trim();
        Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
    }
}

/// Capability every probe exposes to the registry
pub trait Probe: Send + Sync {
    /// Unique module name, also the enable/disable key
    fn name(&self) -> &str;

    /// Static description of what the probe checks
    fn description(&self) -> &str;

    /// Inspect the host and produce a verdict. Must not panic or fail.
    fn run(&self) -> CheckOutcome;
}

/// Score cutoffs for probes whose status is derived from their score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StatusPolicy {
    /// Score at or above which a probe passes
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: u8,
    /// Score at or above which a non-passing probe only warns
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: u8,
}

fn default_pass_threshold() -> u8 {
    90
}

fn default_warning_threshold() -> u8 {
    70
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self {
            pass_threshold: default_pass_threshold(),
            warning_threshold: default_warning_threshold(),
        }
    }
}

/// Which side of the policy cutoffs a score falls on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Pass,
    Warning,
    Fail,
}

impl StatusPolicy {
    pub fn band(&self, score: u8) -> Band {
        if score >= self.pass_threshold {
            Band::Pass
        } else if score >= self.warning_threshold {
            Band::Warning
        } else {
            Band::Fail
        }
    }

    /// Warning cutoff must not exceed the pass cutoff
    pub fn is_valid(&self) -> bool {
        self.warning_threshold <= self.pass_threshold && self.pass_threshold <= 100
    }
}

/// Worst-case outcome for a probe whose evidence could not be gathered
pub fn degraded(name: &str, description: &str, marker: &str, error: &ProbeError) -> CheckOutcome {
    tracing::warn!("{} degraded: {}", name, error);
    CheckOutcome::builder(name, description)
        .status(CheckStatus::Fail)
        .severity(Severity::High)
        .score(0)
        .recommendation(
            "Compliance evidence could not be gathered. Re-run the audit with administrative privileges on a supported system.",
        )
        .detail(marker)
        .detail(format!("Evidence query failed: {error}"))
        .build()
}

/// The nine built-in probes in registration order
pub fn default_probes(query: Arc<dyn SystemQuery>, policy: StatusPolicy) -> Vec<Arc<dyn Probe>> {
    vec![
        Arc::new(FirewallProbe::new(Arc::clone(&query))),
        Arc::new(AntivirusProbe::new(Arc::clone(&query))),
        Arc::new(PasswordPolicyProbe::new(Arc::clone(&query), policy)),
        Arc::new(WindowsUpdateProbe::new(Arc::clone(&query))),
        Arc::new(UserAccountProbe::new(Arc::clone(&query), policy)),
        Arc::new(BitLockerProbe::new(Arc::clone(&query))),
        Arc::new(SystemLoggingProbe::new(Arc::clone(&query))),
        Arc::new(InstalledSoftwareProbe::new(Arc::clone(&query), policy)),
        Arc::new(NetworkSharesProbe::new(query, policy)),
    ]
}
