//! Automatic update configuration check

use super::parse::{is_running, leading_int};
use super::{degraded, Probe, ProbeResult, SystemQuery};
use crate::models::{CheckOutcome, CheckStatus, Severity};
use std::sync::Arc;

const NAME: &str = "Windows Update Status";
const DESCRIPTION: &str = "Checks if automatic updates and patch management are enabled.";
const MARKER: &str = "Checking Windows Update configuration...";

const AU_KEY: &str =
    "HKEY_LOCAL_MACHINE\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\WindowsUpdate\\Auto Update";
const SERVICE_SCRIPT: &str = "Get-Service -Name wuauserv | Select-Object -ExpandProperty Status";
const PENDING_SCRIPT: &str = "(New-Object -ComObject Microsoft.Update.Session).CreateUpdateSearcher().Search('IsInstalled=0').Updates.Count";

/// Lowest score a host with working automatic updates can get
const AUTO_UPDATE_FLOOR: u32 = 70;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct UpdateEvidence {
    /// `AUOptions`: 0 disabled, 2 download, 3 install, 4 auto install
    pub level: i64,
    pub service_running: bool,
    pub pending: u32,
}

impl UpdateEvidence {
    fn auto_update(&self) -> bool {
        self.level >= 2
    }
}

fn score(e: &UpdateEvidence) -> u8 {
    if e.auto_update() && e.service_running {
        let penalty = if e.pending > 10 { 20 } else { e.pending * 2 };
        100u32.saturating_sub(penalty).max(AUTO_UPDATE_FLOOR) as u8
    } else if e.service_running {
        50
    } else {
        0
    }
}

pub(crate) fn evaluate(e: &UpdateEvidence) -> CheckOutcome {
    let score = score(e);
    let (status, severity, recommendation) = match score {
        90.. => (
            CheckStatus::Pass,
            Severity::Low,
            "Windows Update is properly configured. Consider installing pending updates if any.",
        ),
        70..=89 => (
            CheckStatus::Warning,
            Severity::Medium,
            "Windows Update is enabled but has pending updates. Install updates to maintain security.",
        ),
        50..=69 => (
            CheckStatus::Warning,
            Severity::Medium,
            "Windows Update service is running but automatic updates are not fully configured. Enable automatic installation of updates.",
        ),
        _ => (
            CheckStatus::Fail,
            Severity::High,
            "Windows Update is disabled or not functioning. Enable automatic updates immediately to ensure system security.",
        ),
    };

    CheckOutcome::builder(NAME, DESCRIPTION)
        .status(status)
        .score(score)
        .severity(severity)
        .recommendation(recommendation)
        .detail(MARKER)
        .detail(format!(
            "Automatic Updates: {}",
            if e.auto_update() { "Enabled" } else { "Disabled" }
        ))
        .detail(format!(
            "Update Level: {} (0=Disabled, 2=Download, 3=Install, 4=Auto Install)",
            e.level
        ))
        .detail(format!(
            "Windows Update Service: {}",
            if e.service_running { "Running" } else { "Stopped" }
        ))
        .detail(format!("Pending Updates: {}", e.pending))
        .build()
}

pub struct WindowsUpdateProbe {
    query: Arc<dyn SystemQuery>,
}

impl WindowsUpdateProbe {
    pub fn new(query: Arc<dyn SystemQuery>) -> Self {
        Self { query }
    }

    fn gather(&self) -> ProbeResult<UpdateEvidence> {
        let level = self
            .query
            .registry_value(AU_KEY, "AUOptions")?
            .as_deref()
            .and_then(leading_int)
            .unwrap_or(0);
        let service_running = is_running(&self.query.run(SERVICE_SCRIPT)?);

        // The update searcher is slow and often blocked; treat failure as none pending
        let pending = self
            .query
            .run(PENDING_SCRIPT)
            .ok()
            .as_deref()
            .and_then(leading_int)
            .map_or(0, |n| n.clamp(0, i64::from(u32::MAX)) as u32);

        Ok(UpdateEvidence {
            level,
            service_running,
            pending,
        })
    }
}

impl Probe for WindowsUpdateProbe {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::tests::FakeQuery;

    fn evidence(level: i64, service_running: bool, pending: u32) -> UpdateEvidence {
        UpdateEvidence { level, service_running, pending }
    }

    #[test]
    fn test_pending_penalty_and_floor() {
        assert_eq!(score(&evidence(4, true, 0)), 100);
        assert_eq!(score(&evidence(4, true, 3)), 94);
        assert_eq!(score(&evidence(4, true, 10)), 80);
        assert_eq!(score(&evidence(4, true, 50)), 80);
        assert_eq!(score(&evidence(1, true, 0)), 50);
        assert_eq!(score(&evidence(4, false, 0)), 0);
    }

    #[test]
    fn test_status_bands() {
        let o = evaluate(&evidence(4, true, 6));
        assert_eq!((o.score(), o.status(), o.severity()), (88, CheckStatus::Warning, Severity::Medium));
        let o = evaluate(&evidence(0, true, 0));
        assert_eq!((o.status(), o.severity()), (CheckStatus::Warning, Severity::Medium));
        assert!(o.recommendation().contains("not fully configured"));
        let o = evaluate(&evidence(0, false, 0));
        assert_eq!((o.status(), o.severity()), (CheckStatus::Fail, Severity::High));
    }

    #[test]
    fn test_probe_reads_registry_service_and_pending() {
        let q = FakeQuery::new()
            .with("'AUOptions'", "4")
            .with("wuauserv", "Running\r\n")
            .with("Updates.Count", "2");
        let o = WindowsUpdateProbe::new(q.arc()).run();
        assert_eq!(o.score(), 96);
        assert_eq!(o.status(), CheckStatus::Pass);
        assert_eq!(o.details()[4], "Pending Updates: 2");
    }

    #[test]
    fn test_pending_query_failure_is_not_fatal() {
        let q = FakeQuery::new()
            .with("'AUOptions'", "4")
            .with("wuauserv", "Running")
            .failing("Updates.Count", "COM object unavailable");
        let o = WindowsUpdateProbe::new(q.arc()).run();
        assert_eq!(o.score(), 100);
    }
}
