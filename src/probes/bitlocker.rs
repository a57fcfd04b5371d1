//! BitLocker drive encryption check

use super::parse::json_records;
use super::{degraded, Probe, ProbeError, ProbeResult, SystemQuery};
use crate::models::{CheckOutcome, CheckStatus, Severity};
use serde::Deserialize;
use std::sync::Arc;

const NAME: &str = "Disk Encryption (BitLocker)";
const DESCRIPTION: &str = "Verifies encryption status for system drives.";
const MARKER: &str = "Checking BitLocker encryption status...";
const CMDLET: &str = "Get-BitLockerVolume";
const SCRIPT: &str = "Get-BitLockerVolume | Select-Object MountPoint, @{n='VolumeType';e={\"$($_.VolumeType)\"}}, \
EncryptionPercentage | ConvertTo-Json -Compress";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VolumeRecord {
    mount_point: Option<String>,
    #[serde(default)]
    volume_type: String,
    encryption_percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Volume {
    pub mount_point: String,
    pub system: bool,
    pub encryption_percent: Option<i64>,
}

impl Volume {
    fn fully_encrypted(&self) -> bool {
        self.encryption_percent == Some(100)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EncryptionEvidence {
    /// Edition without BitLocker (the cmdlet is missing)
    Unavailable,
    Volumes(Vec<Volume>),
}

fn parse_volumes(output: &str) -> ProbeResult<Vec<Volume>> {
    Ok(json_records::<VolumeRecord>(output)?
        .into_iter()
        .filter_map(|r| {
            let mount_point = r.mount_point?;
            let system = mount_point.eq_ignore_ascii_case("C:")
                || mount_point.contains("System")
                || r.volume_type.eq_ignore_ascii_case("OperatingSystem");
            Some(Volume {
                mount_point,
                system,
                // Truncated so 99.9% never reads as fully encrypted
                encryption_percent: r.encryption_percentage.map(|pct| pct as i64),
            })
        })
        .collect())
}

/// Whether output is an error message rather than a JSON document
fn is_json(output: &str) -> bool {
    output.trim_start().starts_with(['[', '{'])
}

pub(crate) fn evaluate(evidence: &EncryptionEvidence) -> CheckOutcome {
    let builder = CheckOutcome::builder(NAME, DESCRIPTION).detail(MARKER);

    let volumes = match evidence {
        EncryptionEvidence::Unavailable => {
            return builder
                .status(CheckStatus::NotApplicable)
                .score(0)
                .severity(Severity::Medium)
                .recommendation(
                    "BitLocker is not available on this Windows edition. Consider upgrading to Windows Pro/Enterprise/Education or using third-party encryption software.",
                )
                .detail("BitLocker is not available on this system.")
                .detail("BitLocker requires Windows Pro, Enterprise, or Education edition.")
                .build();
        }
        EncryptionEvidence::Volumes(v) => v,
    };

    let encrypted = volumes.iter().filter(|v| v.fully_encrypted()).count();
    let system_encrypted = volumes.iter().any(|v| v.system && v.fully_encrypted());
    let all_encrypted = encrypted == volumes.len();

    let (status, score, severity, recommendation) = if system_encrypted && all_encrypted {
        (
            CheckStatus::Pass,
            100,
            Severity::Low,
            "All drives are encrypted with BitLocker. System is compliant.",
        )
    } else if system_encrypted {
        (
            CheckStatus::Warning,
            70,
            Severity::Medium,
            "System drive is encrypted but other drives are not. Enable BitLocker on all drives for complete protection.",
        )
    } else {
        (
            CheckStatus::Fail,
            20,
            Severity::High,
            "System drive is not encrypted. Enable BitLocker encryption immediately to protect sensitive data.",
        )
    };

    let mut builder = builder
        .status(status)
        .score(score)
        .severity(severity)
        .recommendation(recommendation)
        .detail(format!("Total Drives Checked: {}", volumes.len()))
        .detail(format!("Fully Encrypted Drives: {encrypted}"))
        .detail(format!(
            "System Drive (C:) Encrypted: {}",
            if system_encrypted { "Yes" } else { "No" }
        ));
    for v in volumes {
        builder = builder.detail(match v.encryption_percent {
            Some(pct) => format!("  - {} {pct}% encrypted", v.mount_point),
            None => format!("  - {} encryption unknown", v.mount_point),
        });
    }
    builder.build()
}

pub struct BitLockerProbe {
    query: Arc<dyn SystemQuery>,
}

impl BitLockerProbe {
    pub fn new(query: Arc<dyn SystemQuery>) -> Self {
        Self { query }
    }

    fn gather(&self) -> ProbeResult<EncryptionEvidence> {
        match self.query.run(SCRIPT) {
            Ok(out) if !is_json(&out) && out.contains(CMDLET) => {
                Ok(EncryptionEvidence::Unavailable)
            }
            Ok(out) => Ok(EncryptionEvidence::Volumes(parse_volumes(&out)?)),
            // PowerShell names the unknown cmdlet when the module is absent
            Err(ProbeError::NonZeroExit { output, .. }) if output.contains(CMDLET) => {
                Ok(EncryptionEvidence::Unavailable)
            }
            Err(e) => Err(e),
        }
    }
}

impl Probe for BitLockerProbe {
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

    const TWO_DRIVES: &str = r#"[{"MountPoint":"C:","VolumeType":"OperatingSystem","EncryptionPercentage":100},{"MountPoint":"D:","VolumeType":"Data","EncryptionPercentage":0}]"#;

    #[test]
    fn test_system_drive_only_warns() {
        let probe = BitLockerProbe::new(FakeQuery::new().with(CMDLET, TWO_DRIVES).arc());
        let o = probe.run();
        assert_eq!((o.status(), o.score(), o.severity()), (CheckStatus::Warning, 70, Severity::Medium));
        assert_eq!(o.details()[1], "Total Drives Checked: 2");
        assert_eq!(o.details()[3], "System Drive (C:) Encrypted: Yes");
        assert_eq!(o.details()[5], "  - D: 0% encrypted");
    }

    #[test]
    fn test_all_encrypted_passes_and_none_fails() {
        let all = EncryptionEvidence::Volumes(vec![Volume {
            mount_point: "C:".into(),
            system: true,
            encryption_percent: Some(100),
        }]);
        assert_eq!(evaluate(&all).score(), 100);

        let none = EncryptionEvidence::Volumes(
            parse_volumes(r#"{"MountPoint":"C:","EncryptionPercentage":35.5}"#).unwrap(),
        );
        let o = evaluate(&none);
        assert_eq!((o.status(), o.score(), o.severity()), (CheckStatus::Fail, 20, Severity::High));
    }

    #[test]
    fn test_missing_cmdlet_is_not_applicable() {
        let err = "Get-BitLockerVolume : The term 'Get-BitLockerVolume' is not recognized as the name of a cmdlet";
        let probe = BitLockerProbe::new(FakeQuery::new().failing(CMDLET, err).arc());
        let o = probe.run();
        assert_eq!(o.status(), CheckStatus::NotApplicable);
        assert_eq!(o.score(), 0);
        assert_eq!(o.severity(), Severity::Medium);
        assert!(!o.status().is_issue());
    }

    #[test]
    fn test_access_denied_degrades() {
        let probe = BitLockerProbe::new(FakeQuery::new().failing(CMDLET, "Access is denied.").arc());
        let o = probe.run();
        assert_eq!(o.status(), CheckStatus::Fail);
        assert_eq!(o.severity(), Severity::High);
    }

    #[test]
    fn test_partial_percentage_is_not_full_encryption() {
        let volumes =
            parse_volumes(r#"{"MountPoint":"E:","VolumeType":"Data","EncryptionPercentage":99.9}"#)
                .unwrap();
        assert_eq!(volumes[0].encryption_percent, Some(99));
        assert!(!volumes[0].system);
        assert!(!volumes[0].fully_encrypted());
    }

    #[test]
    fn test_cmdlet_error_on_stdout_is_not_applicable() {
        let out = "The term 'Get-BitLockerVolume' is not recognized";
        let probe = BitLockerProbe::new(FakeQuery::new().with(CMDLET, out).arc());
        assert_eq!(probe.run().status(), CheckStatus::NotApplicable);
    }
}
