//! Windows Firewall profile check

use super::parse::json_records;
use super::{degraded, Probe, ProbeResult, SystemQuery};
use crate::models::{CheckOutcome, CheckStatus, Severity};
use serde::Deserialize;
use std::sync::Arc;

const NAME: &str = "Firewall Status";
const DESCRIPTION: &str =
    "Verifies whether the Windows Firewall is enabled for Domain, Private, and Public profiles.";
const MARKER: &str = "Checking Windows Firewall status...";
// Enabled is a GpoBoolean; NotConfigured counts as off
const SCRIPT: &str = "Get-NetFirewallProfile | Select-Object Name, @{n='Enabled';e={$_.Enabled -eq 'True'}} \
| ConvertTo-Json -Compress";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ProfileRecord {
    name: String,
    #[serde(default)]
    enabled: bool,
}

/// Enabled state of each firewall profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FirewallEvidence {
    pub domain: bool,
    pub private: bool,
    pub public: bool,
}

impl FirewallEvidence {
    fn parse(output: &str) -> ProbeResult<Self> {
        let mut evidence = Self::default();
        for profile in json_records::<ProfileRecord>(output)? {
            match profile.name.to_ascii_lowercase().as_str() {
                "domain" => evidence.domain = profile.enabled,
                "private" => evidence.private = profile.enabled,
                "public" => evidence.public = profile.enabled,
                _ => {}
            }
        }
        Ok(evidence)
    }

    fn enabled_count(&self) -> usize {
        [self.domain, self.private, self.public]
            .iter()
            .filter(|on| **on)
            .count()
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "Enabled"
    } else {
        "Disabled"
    }
}

pub(crate) fn evaluate(evidence: &FirewallEvidence) -> CheckOutcome {
    let (status, score, severity, recommendation) = match evidence.enabled_count() {
        3 => (
            CheckStatus::Pass,
            100,
            Severity::Low,
            "All firewall profiles are enabled. System is compliant.",
        ),
        2 => (
            CheckStatus::Warning,
            67,
            Severity::Medium,
            "One or more firewall profiles are disabled. Enable all profiles for maximum security.",
        ),
        1 => (
            CheckStatus::Fail,
            33,
            Severity::High,
            "Multiple firewall profiles are disabled. This poses a significant security risk. Enable all profiles immediately.",
        ),
        _ => (
            CheckStatus::Fail,
            0,
            Severity::Critical,
            "Windows Firewall is completely disabled. This is a critical security risk. Enable the firewall immediately.",
        ),
    };

    CheckOutcome::builder(NAME, DESCRIPTION)
        .status(status)
        .score(score)
        .severity(severity)
        .recommendation(recommendation)
        .detail(MARKER)
        .detail(format!("Domain Profile: {}", on_off(evidence.domain)))
        .detail(format!("Private Profile: {}", on_off(evidence.private)))
        .detail(format!("Public Profile: {}", on_off(evidence.public)))
        .build()
}

pub struct FirewallProbe {
    query: Arc<dyn SystemQuery>,
}

impl FirewallProbe {
    pub fn new(query: Arc<dyn SystemQuery>) -> Self {
        Self { query }
    }

    fn gather(&self) -> ProbeResult<FirewallEvidence> {
        FirewallEvidence::parse(&self.query.run(SCRIPT)?)
    }
}

impl Probe for FirewallProbe {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn run(&self) -> CheckOutcome {
        match self.gather() {
            Ok(evidence) => evaluate(&evidence),
            Err(e) => degraded(NAME, DESCRIPTION, MARKER, &e),
        }
    }
}
