//! Installed application audit

use super::parse::json_records;
use super::{degraded, Band, Probe, ProbeResult, StatusPolicy, SystemQuery};
use crate::models::{CheckOutcome, CheckStatus, Severity};
use serde::Deserialize;
use std::sync::Arc;

const NAME: &str = "Installed Software Audit";
const DESCRIPTION: &str =
    "Lists all installed applications and flags potentially risky or outdated ones.";
const MARKER: &str = "Auditing installed software...";
const SCRIPT: &str = "Get-ItemProperty HKLM:\\Software\\Microsoft\\Windows\\CurrentVersion\\Uninstall\\* \
    | Where-Object {$_.DisplayName -ne $null} \
    | Select-Object DisplayName, Publisher \
    | Sort-Object DisplayName | ConvertTo-Json -Compress";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AppRecord {
    display_name: Option<String>,
    publisher: Option<String>,
}

/// Substrings that mark an application as potentially risky
const RISKY_KEYWORDS: [&str; 10] = [
    "torrent",
    "crack",
    "keygen",
    "serial",
    "hack",
    "cracked",
    "p2p",
    "file sharing",
    "remote desktop",
    "vnc",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SoftwareEvidence {
    pub total: usize,
    /// Keywords seen in at least one application, in keyword order
    pub risky: Vec<&'static str>,
}

impl SoftwareEvidence {
    fn parse(output: &str) -> ProbeResult<Self> {
        let apps: Vec<String> = json_records::<AppRecord>(output)?
            .into_iter()
            .filter_map(|r| {
                let name = r.display_name?;
                Some(format!("{} {}", name, r.publisher.unwrap_or_default()).to_lowercase())
            })
            .collect();

        let risky = RISKY_KEYWORDS
            .iter()
            .copied()
            .filter(|kw| apps.iter().any(|app| app.contains(kw)))
            .collect();

        Ok(Self {
            total: apps.len(),
            risky,
        })
    }
}

fn score(e: &SoftwareEvidence) -> u8 {
    let mut penalty = e.risky.len() * 15;
    if e.total > 200 {
        penalty += 20;
    } else if e.total > 100 {
        penalty += 10;
    }
    100usize.saturating_sub(penalty) as u8
}

pub(crate) fn evaluate(e: &SoftwareEvidence, policy: &StatusPolicy) -> CheckOutcome {
    let score = score(e);
    let (status, severity, recommendation) = match policy.band(score) {
        Band::Pass => (
            CheckStatus::Pass,
            Severity::Low,
            "Installed software appears compliant. Regularly review and update applications.",
        ),
        Band::Warning => (
            CheckStatus::Warning,
            Severity::Medium,
            "Some potentially risky software detected. Review and remove unnecessary or unauthorized applications.",
        ),
        Band::Fail => (
            CheckStatus::Fail,
            Severity::High,
            "Multiple potentially risky software applications detected. Conduct a thorough software audit and remove unauthorized applications immediately.",
        ),
    };

    let mut builder = CheckOutcome::builder(NAME, DESCRIPTION)
        .status(status)
        .score(score)
        .severity(severity)
        .recommendation(recommendation)
        .detail(MARKER)
        .detail(format!("Total Installed Applications: {}", e.total));
    builder = if e.risky.is_empty() {
        builder.detail("No obviously risky software detected.")
    } else {
        builder
            .detail(format!(
                "Potentially Risky Software Detected: {} types",
                e.risky.len()
            ))
            .detail(format!("Keywords found: {}", e.risky.join(", ")))
    };
    builder
        .detail("Note: This is a basic audit. Review installed software manually for security compliance.")
        .build()
}

pub struct InstalledSoftwareProbe {
    query: Arc<dyn SystemQuery>,
    policy: StatusPolicy,
}

impl InstalledSoftwareProbe {
    pub fn new(query: Arc<dyn SystemQuery>, policy: StatusPolicy) -> Self {
        Self { query, policy }
    }

    fn gather(&self) -> ProbeResult<SoftwareEvidence> {
        SoftwareEvidence::parse(&self.query.run(SCRIPT)?)
    }
}

impl Probe for InstalledSoftwareProbe {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn run(&self) -> CheckOutcome {
        match self.gather() {
            Ok(evidence) => evaluate(&evidence, &self.policy),
            Err(e) => degraded(NAME, DESCRIPTION, MARKER, &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::tests::FakeQuery;

    const APPS: &str = r#"[
        {"DisplayName":"7-Zip 23.01","Publisher":"Igor Pavlov"},
        {"DisplayName":"qBittorrent 4.6","Publisher":"The qBittorrent project"},
        {"DisplayName":"TightVNC","Publisher":null}
    ]"#;

    #[test]
    fn test_keywords_are_counted_once_each() {
        let e = SoftwareEvidence::parse(APPS).unwrap();
        assert_eq!(e.total, 3);
        assert_eq!(e.risky, ["torrent", "vnc"]);
    }

    #[test]
    fn test_probe_penalises_risky_software() {
        let probe = InstalledSoftwareProbe::new(
            FakeQuery::new().with("Uninstall", APPS).arc(),
            StatusPolicy::default(),
        );
        let o = probe.run();
        assert_eq!(o.score(), 70);
        assert_eq!(o.status(), CheckStatus::Warning);
        assert_eq!(o.details()[3], "Keywords found: torrent, vnc");
    }

    #[test]
    fn test_app_count_penalties() {
        let many = |total| SoftwareEvidence { total, risky: Vec::new() };
        assert_eq!(score(&many(100)), 100);
        assert_eq!(score(&many(101)), 90);
        assert_eq!(score(&many(201)), 80);
    }

    #[test]
    fn test_score_floors_at_zero() {
        let e = SoftwareEvidence { total: 300, risky: RISKY_KEYWORDS.to_vec() };
        let o = evaluate(&e, &StatusPolicy::default());
        assert_eq!(o.score(), 0);
        assert_eq!((o.status(), o.severity()), (CheckStatus::Fail, Severity::High));
    }

    #[test]
    fn test_clean_host_passes() {
        let o = evaluate(&SoftwareEvidence { total: 40, risky: vec![] }, &StatusPolicy::default());
        assert_eq!(o.status(), CheckStatus::Pass);
        assert_eq!(o.details()[2], "No obviously risky software detected.");
    }
}
