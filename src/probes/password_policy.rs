//! Local password policy review
//!
//! Scoring follows common NIST/ISO guidance:
//!
//! ```text
//! Criterion        Full (+25)      Partial (+15)     Issue
//! ---------        ----------      -------------     -----
//! Min length       >= 8            >= 6              < 6
//! Complexity       enabled         -                 disabled
//! Max age          1..=90 days     not configured    > 90 days
//! History          >= 12           >= 1              0
//! ```
//!
//! The status comes from the configured [`StatusPolicy`]; a failing policy is
//! `High` severity once three or more criteria are issues.

use super::parse::{labelled_value, leading_int};
use super::{degraded, Band, Probe, ProbeResult, StatusPolicy, SystemQuery};
use crate::models::{CheckOutcome, CheckStatus, Severity};
use std::sync::Arc;

const NAME: &str = "Password Policy Review";
const DESCRIPTION: &str = "Evaluates password length, complexity, and expiration settings.";
const MARKER: &str = "Checking password policy settings...";

const NETLOGON_KEY: &str = "HKEY_LOCAL_MACHINE\\SYSTEM\\CurrentControlSet\\Services\\Netlogon\\Parameters";
const POLICIES_KEY: &str =
    "HKEY_LOCAL_MACHINE\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Policies\\System";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PasswordPolicy {
    pub min_length: u32,
    pub complexity: bool,
    /// Days; 0 when not configured
    pub max_age: u32,
    pub min_age: u32,
    pub history: u32,
}

fn as_count(value: Option<String>) -> u32 {
    value
        .as_deref()
        .and_then(leading_int)
        .map_or(0, |n| n.clamp(0, i64::from(u32::MAX)) as u32)
}

fn configured(value: u32, unit: &str) -> String {
    if value > 0 {
        format!("{value}{unit}")
    } else {
        "Not configured".to_string()
    }
}

pub(crate) fn evaluate(p: &PasswordPolicy, policy: &StatusPolicy) -> CheckOutcome {
    let mut score: u32 = 0;
    let mut issues = 0;

    match p.min_length {
        8.. => score += 25,
        6..=7 => score += 15,
        _ => issues += 1,
    }

    if p.complexity {
        score += 25;
    } else {
        issues += 1;
    }

    match p.max_age {
        0 => score += 15,
        1..=90 => score += 25,
        _ => issues += 1,
    }

    match p.history {
        12.. => score += 25,
        1..=11 => score += 15,
        _ => issues += 1,
    }

    let score = score.min(100) as u8;
    let (status, severity, recommendation) = match policy.band(score) {
        Band::Pass => (
            CheckStatus::Pass,
            Severity::Low,
            "Password policy meets security standards. System is compliant.",
        ),
        Band::Warning => (
            CheckStatus::Warning,
            Severity::Medium,
            "Password policy needs improvement. Consider increasing minimum length to 8+ characters, enabling complexity, and setting appropriate age limits.",
        ),
        Band::Fail => (
            CheckStatus::Fail,
            if issues >= 3 { Severity::High } else { Severity::Medium },
            "Password policy does not meet security standards. Configure minimum length (8+), enable complexity requirements, and set password expiration (max 90 days).",
        ),
    };

    CheckOutcome::builder(NAME, DESCRIPTION)
        .status(status)
        .score(score)
        .severity(severity)
        .recommendation(recommendation)
        .detail(MARKER)
        .detail(format!(
            "Minimum Password Length: {}",
            configured(p.min_length, "")
        ))
        .detail(format!(
            "Complexity Required: {}",
            if p.complexity { "Yes" } else { "No" }
        ))
        .detail(format!("Maximum Password Age: {}", configured(p.max_age, " days")))
        .detail(format!("Minimum Password Age: {}", configured(p.min_age, " days")))
        .detail(format!(
            "Password History: {}",
            configured(p.history, " passwords")
        ))
        .build()
}

pub struct PasswordPolicyProbe {
    query: Arc<dyn SystemQuery>,
    policy: StatusPolicy,
}

impl PasswordPolicyProbe {
    pub fn new(query: Arc<dyn SystemQuery>, policy: StatusPolicy) -> Self {
        Self { query, policy }
    }

    fn gather(&self) -> ProbeResult<PasswordPolicy> {
        let q = &self.query;
        let mut min_length = as_count(q.registry_value(NETLOGON_KEY, "MinimumPasswordLength")?);
        if min_length == 0 {
            min_length = as_count(q.registry_value(POLICIES_KEY, "MinimumPasswordLength")?);
        }

        // `net accounts` reflects the effective local policy when the
        // registry carries nothing
        if min_length == 0 {
            if let Ok(out) = q.run("net accounts") {
                min_length = as_count(
                    labelled_value(&out, "Minimum password length").map(str::to_string),
                );
            }
        }

        Ok(PasswordPolicy {
            min_length,
            complexity: q
                .registry_value(POLICIES_KEY, "PasswordComplexity")?
                .is_some_and(|v| v == "1"),
            max_age: as_count(q.registry_value(NETLOGON_KEY, "MaximumPasswordAge")?),
            min_age: as_count(q.registry_value(NETLOGON_KEY, "MinimumPasswordAge")?),
            history: as_count(q.registry_value(NETLOGON_KEY, "PasswordHistoryLength")?),
        })
    }
}

impl Probe for PasswordPolicyProbe {
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

    #[test]
    fn test_strong_policy_passes() {
        let p = PasswordPolicy {
            min_length: 12,
            complexity: true,
            max_age: 60,
            min_age: 1,
            history: 24,
        };
        let o = evaluate(&p, &StatusPolicy::default());
        assert_eq!(o.score(), 100);
        assert_eq!(o.status(), CheckStatus::Pass);
        assert_eq!(o.details()[3], "Maximum Password Age: 60 days");
        assert_eq!(o.details()[4], "Minimum Password Age: 1 days");
    }

    #[test]
    fn test_unconfigured_policy_fails_high() {
        // Only the unset max age earns points
        let o = evaluate(&PasswordPolicy::default(), &StatusPolicy::default());
        assert_eq!(o.score(), 15);
        assert_eq!(o.status(), CheckStatus::Fail);
        assert_eq!(o.severity(), Severity::High);
        assert_eq!(o.details()[1], "Minimum Password Length: Not configured");
    }

    #[test]
    fn test_two_issues_fail_medium() {
        let p = PasswordPolicy {
            min_length: 8,
            complexity: false,
            max_age: 120,
            min_age: 0,
            history: 12,
        };
        let o = evaluate(&p, &StatusPolicy::default());
        assert_eq!(o.score(), 50);
        assert_eq!(o.status(), CheckStatus::Fail);
        assert_eq!(o.severity(), Severity::Medium);
    }

    #[test]
    fn test_custom_policy_thresholds() {
        let p = PasswordPolicy {
            min_length: 8,
            complexity: true,
            max_age: 0,
            min_age: 0,
            history: 5,
        };
        // 25 + 25 + 15 + 15
        let strict = StatusPolicy { pass_threshold: 95, warning_threshold: 85 };
        assert_eq!(evaluate(&p, &strict).status(), CheckStatus::Fail);
        assert_eq!(evaluate(&p, &StatusPolicy::default()).status(), CheckStatus::Warning);
    }

    #[test]
    fn test_net_accounts_fallback_for_min_length() {
        let q = FakeQuery::new()
            .with("net accounts", "Minimum password length:    7\nMaximum password age (days):  42\n")
            .with("'PasswordComplexity'", "1")
            .with("'PasswordHistoryLength'", "12");
        let o = PasswordPolicyProbe::new(q.arc(), StatusPolicy::default()).run();
        assert_eq!(o.details()[1], "Minimum Password Length: 7");
        // 15 + 25 + 15 + 25
        assert_eq!(o.score(), 80);
        assert_eq!(o.status(), CheckStatus::Warning);
    }
}
