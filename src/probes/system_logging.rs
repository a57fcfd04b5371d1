//! Event log service and audit policy check

use super::parse::{is_running, leading_int};
use super::{degraded, Probe, ProbeResult, SystemQuery};
use crate::models::{CheckOutcome, CheckStatus, Severity};
use std::sync::Arc;

const NAME: &str = "System Logging Verification";
const DESCRIPTION: &str =
    "Checks if Windows Event Logging is active for security and audit tracking.";
const MARKER: &str = "Checking Windows Event Logging configuration...";
const SERVICE_SCRIPT: &str = "Get-Service -Name EventLog | Select-Object -ExpandProperty Status";
const AUDITPOL_SCRIPT: &str = "auditpol /get /category:*";
const LOG_SIZE_SCRIPT: &str =
    "(Get-EventLog -LogName Security -ErrorAction SilentlyContinue).MaximumKilobytes";

/// Audit categories that earn points, as they appear in `auditpol` headers
const CATEGORIES: [(&str, &str); 4] = [
    ("Logon", "Logon Auditing"),
    ("Object Access", "Object Access Auditing"),
    ("Policy Change", "Policy Change Auditing"),
    ("Account Management", "Account Management Auditing"),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct LoggingEvidence {
    pub service_running: bool,
    /// Indexed like `CATEGORIES`
    pub audited: [bool; 4],
    pub security_log_kb: Option<i64>,
}

/// Which tracked categories have at least one audited subcategory
///
/// Category headers are unindented; subcategory lines are indented and end
/// with their setting (`No Auditing`, `Success`, `Failure`, or both).
fn parse_auditpol(output: &str) -> [bool; 4] {
    let mut audited = [false; 4];
    let mut current: Option<usize> = None;

    for line in output.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        if !line.starts_with(char::is_whitespace) {
            current = CATEGORIES
                .iter()
                .position(|(header, _)| line.starts_with(header));
            continue;
        }
        if let Some(idx) = current {
            if line.ends_with("Success") || line.ends_with("Failure") {
                audited[idx] = true;
            }
        }
    }
    audited
}

fn score(e: &LoggingEvidence) -> u8 {
    if !e.service_running {
        return 0;
    }
    20 + 20 * e.audited.iter().filter(|a| **a).count() as u8
}

pub(crate) fn evaluate(e: &LoggingEvidence) -> CheckOutcome {
    let score = score(e);
    let (status, severity, recommendation) = match score {
        90.. => (
            CheckStatus::Pass,
            Severity::Low,
            "Event logging is properly configured. System is compliant.",
        ),
        60..=89 => (
            CheckStatus::Warning,
            Severity::Medium,
            "Event logging is partially configured. Enable all recommended audit policies for comprehensive security monitoring.",
        ),
        20..=59 => (
            CheckStatus::Warning,
            Severity::Medium,
            "Event logging service is running but audit policies need improvement. Enable logon, object access, policy change, and account management auditing.",
        ),
        _ => (
            CheckStatus::Fail,
            Severity::High,
            "Event logging is not properly configured. Enable the Event Log service and configure audit policies for security monitoring.",
        ),
    };

    let mut builder = CheckOutcome::builder(NAME, DESCRIPTION)
        .status(status)
        .score(score)
        .severity(severity)
        .recommendation(recommendation)
        .detail(MARKER)
        .detail(format!(
            "Event Log Service: {}",
            if e.service_running { "Running" } else { "Stopped" }
        ));
    for ((_, label), on) in CATEGORIES.iter().zip(e.audited) {
        builder = builder.detail(format!(
            "{label}: {}",
            if on { "Enabled" } else { "Disabled" }
        ));
    }
    if let Some(kb) = e.security_log_kb {
        builder = builder.detail(format!("Security Log Size: {kb} KB"));
    }
    builder.build()
}

pub struct SystemLoggingProbe {
    query: Arc<dyn SystemQuery>,
}

impl SystemLoggingProbe {
    pub fn new(query: Arc<dyn SystemQuery>) -> Self {
        Self { query }
    }

    fn gather(&self) -> ProbeResult<LoggingEvidence> {
        let service_running = is_running(&self.query.run(SERVICE_SCRIPT)?);
        // auditpol needs elevation; without it every category reads as unaudited
        let audited = self
            .query
            .run(AUDITPOL_SCRIPT)
            .map(|out| parse_auditpol(&out))
            .unwrap_or_default();
        let security_log_kb = self
            .query
            .run(LOG_SIZE_SCRIPT)
            .ok()
            .as_deref()
            .and_then(leading_int);

        Ok(LoggingEvidence {
            service_running,
            audited,
            security_log_kb,
        })
    }
}

impl Probe for SystemLoggingProbe {
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
