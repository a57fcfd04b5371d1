//! Audit configuration
//!
//! Loaded from `hostaudit.toml` in the working directory, an explicit
//! `--config` path, or the user config at `~/.config/hostaudit/config.toml`.
//!
//! # Configuration Format
//!
//! ```toml
//! # hostaudit.toml
//!
//! [modules."Network Shares Check"]
//! enabled = false
//!
//! [scan]
//! workers = 1          # 1 = sequential
//! selected = []        # default module selection (empty = all)
//!
//! [report]
//! tool_name = "Windows Compliance Tool"
//! version = "2.0"
//!
//! [policy]
//! pass_threshold = 90
//! warning_threshold = 70
//! ```

use crate::engine::ComplianceEngine;
use crate::probes::StatusPolicy;
use crate::reporters::ReportHeader;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Project config file name
pub const CONFIG_FILE_NAME: &str = "hostaudit.toml";

/// Upper bound on probe worker threads
pub const MAX_WORKERS: usize = 64;

/// Example written by `hostaudit init`
pub const EXAMPLE_CONFIG: &str = r#"# HostAudit configuration

# Per-module switches. Names match `hostaudit modules`.
[modules."Firewall Status"]
enabled = true

[modules."Network Shares Check"]
enabled = true

[scan]
# Worker threads for probes (1 = sequential)
workers = 1

# Modules to scan when no --only flag is given (empty = all enabled)
selected = []

[report]
tool_name = "Windows Compliance Tool"
version = "2.0"

[policy]
# Score cutoffs for password policy, user account, installed software
# and network share checks
pass_threshold = 90
warning_threshold = 70
"#;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// Initial enabled flags keyed by module name
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleConfig>,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub report: ReportHeader,

    #[serde(default)]
    pub policy: StatusPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModuleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default)]
    pub selected: Vec<String>,
}

fn default_workers() -> usize {
    1
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            selected: Vec::new(),
        }
    }
}

impl AuditConfig {
    /// Replace out-of-range values with defaults
    fn validated(mut self) -> Self {
        if !self.policy.is_valid() {
            warn!(
                "Invalid policy thresholds (pass {}, warning {}); using defaults",
                self.policy.pass_threshold, self.policy.warning_threshold
            );
            self.policy = StatusPolicy::default();
        }
        if self.scan.workers == 0 || self.scan.workers > MAX_WORKERS {
            let clamped = self.scan.workers.clamp(1, MAX_WORKERS);
            warn!(
                "scan.workers = {} is out of range 1-{}; using {}",
                self.scan.workers, MAX_WORKERS, clamped
            );
            self.scan.workers = clamped;
        }
        self
    }

    /// Apply the per-module enabled flags to an engine
    pub fn apply_module_flags(&self, engine: &mut ComplianceEngine) {
        for (name, module) in &self.modules {
            if engine.is_module_enabled(name).is_none() {
                warn!("Config names unknown module '{}'", name);
                continue;
            }
            engine.set_module_enabled(name, module.enabled);
        }
    }
}

/// `<config_dir>/hostaudit/config.toml`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("hostaudit").join("config.toml"))
}

/// Load configuration
///
/// An explicit path must exist and parse. Otherwise `hostaudit.toml` in
/// `dir` is tried, then the user config; a file that fails to parse is
/// skipped with a warning, and defaults are used when nothing loads.
pub fn load_config(explicit: Option<&Path>, dir: &Path) -> Result<AuditConfig> {
    if let Some(path) = explicit {
        let config = load_toml_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        return Ok(config.validated());
    }

    let candidates = std::iter::once(dir.join(CONFIG_FILE_NAME)).chain(user_config_path());
    for path in candidates {
        if !path.exists() {
            continue;
        }
        match load_toml_config(&path) {
            Ok(config) => {
                debug!("Loaded config from {}", path.display());
                return Ok(config.validated());
            }
            Err(e) => {
                warn!("Failed to load {}: {}", path.display(), e);
            }
        }
    }

    debug!("No config found, using defaults");
    Ok(AuditConfig::default())
}

fn load_toml_config(path: &Path) -> Result<AuditConfig> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::tests::FakeQuery;

    #[test]
    fn test_defaults() {
        let config = AuditConfig::default();
        assert!(config.modules.is_empty());
        assert_eq!(config.scan.workers, 1);
        assert!(config.scan.selected.is_empty());
        assert_eq!(config.report.tool_name, "Windows Compliance Tool");
        assert_eq!(config.report.version, "2.0");
        assert_eq!(config.policy, StatusPolicy::default());
    }

    #[test]
    fn test_example_config_parses() {
        let config: AuditConfig = toml::from_str(EXAMPLE_CONFIG).unwrap();
        assert!(config.modules["Network Shares Check"].enabled);
        assert_eq!(config.policy.pass_threshold, 90);
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: AuditConfig = toml::from_str(
            "[report]\nversion = \"3.1\"\n\n[modules.\"Firewall Status\"]\n\n[policy]\nwarning_threshold = 60\n",
        )
        .unwrap();
        assert_eq!(config.report.tool_name, "Windows Compliance Tool");
        assert_eq!(config.report.version, "3.1");
        assert!(config.modules["Firewall Status"].enabled);
        assert_eq!(config.policy.pass_threshold, 90);
        assert_eq!(config.policy.warning_threshold, 60);
    }

    #[test]
    fn test_invalid_values_are_replaced() {
        let config: AuditConfig =
            toml::from_str("[policy]\npass_threshold = 50\nwarning_threshold = 80\n\n[scan]\nworkers = 0\n")
                .unwrap();
        let config = config.validated();
        assert_eq!(config.policy, StatusPolicy::default());
        assert_eq!(config.scan.workers, 1);
    }

    #[test]
    fn test_oversized_worker_count_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[scan]\nworkers = 5000\n").unwrap();
        let config = load_config(None, dir.path()).unwrap();
        assert_eq!(config.scan.workers, MAX_WORKERS);
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[scan]\nworkers = 4\nselected = [\"Firewall Status\"]\n",
        )
        .unwrap();
        let config = load_config(None, dir.path()).unwrap();
        assert_eq!(config.scan.workers, 4);
        assert_eq!(config.scan.selected, ["Firewall Status"]);
    }

    #[test]
    fn test_explicit_path_must_load() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_config(Some(&missing), dir.path()).is_err());

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[scan\nworkers = ").unwrap();
        assert!(load_config(Some(&broken), dir.path()).is_err());
    }

    #[test]
    fn test_apply_module_flags() {
        let config: AuditConfig = toml::from_str(
            "[modules.\"Antivirus Status\"]\nenabled = false\n\n[modules.\"Made Up\"]\nenabled = false\n",
        )
        .unwrap();
        let mut engine =
            ComplianceEngine::with_default_probes(FakeQuery::new().arc(), config.policy);
        config.apply_module_flags(&mut engine);
        assert_eq!(engine.is_module_enabled("Antivirus Status"), Some(false));
        assert_eq!(engine.is_module_enabled("Firewall Status"), Some(true));
        assert_eq!(engine.is_module_enabled("Made Up"), None);
    }
}
