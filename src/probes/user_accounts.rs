//! Local account review

use super::parse::json_records;
use super::{degraded, Band, Probe, ProbeResult, StatusPolicy, SystemQuery};
use crate::models::{CheckOutcome, CheckStatus, Severity};
use serde::Deserialize;
use std::sync::Arc;

const NAME: &str = "User Account Review";
const DESCRIPTION: &str = "Lists local accounts and identifies unnecessary or admin-level users.";
const MARKER: &str = "Reviewing local user accounts...";
const USERS_SCRIPT: &str = "Get-LocalUser | Select-Object Name, Enabled | ConvertTo-Json -Compress";
const ADMINS_SCRIPT: &str =
    "Get-LocalGroupMember -Group 'Administrators' | Select-Object Name | ConvertTo-Json -Compress";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UserRecord {
    #[serde(default)]
    enabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MemberRecord {
    name: Option<String>,
}

/// Administrators allowed before the score drops
const ADMIN_ALLOWANCE: usize = 2;
const MAX_USERS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct AccountEvidence {
    pub total: usize,
    pub enabled: usize,
    pub disabled: usize,
    /// Every member of the local Administrators group
    pub admins: Vec<String>,
}

impl AccountEvidence {
    fn parse(users: &str, admins: &str) -> ProbeResult<Self> {
        let users = json_records::<UserRecord>(users)?;
        let enabled = users.iter().filter(|u| u.enabled).count();
        Ok(Self {
            total: users.len(),
            enabled,
            disabled: users.len() - enabled,
            admins: json_records::<MemberRecord>(admins)?
                .into_iter()
                .filter_map(|m| m.name)
                .collect(),
        })
    }

    /// Admin members other than the built-in Administrator
    fn extra_admins(&self) -> impl Iterator<Item = &str> {
        self.admins
            .iter()
            .map(String::as_str)
            .filter(|name| !name.contains("Administrator"))
    }
}

fn score(e: &AccountEvidence) -> u8 {
    let mut penalty = 0;
    if e.admins.len() > ADMIN_ALLOWANCE {
        penalty += (e.admins.len() - ADMIN_ALLOWANCE) * 10;
    }
    if e.disabled > 0 {
        penalty += 10;
    }
    if e.total > MAX_USERS {
        penalty += 10;
    }
    100usize.saturating_sub(penalty) as u8
}

pub(crate) fn evaluate(e: &AccountEvidence, policy: &StatusPolicy) -> CheckOutcome {
    let score = score(e);
    let (status, severity, recommendation) = match policy.band(score) {
        Band::Pass => (
            CheckStatus::Pass,
            Severity::Low,
            "User account configuration is appropriate. System is compliant.",
        ),
        Band::Warning => (
            CheckStatus::Warning,
            Severity::Medium,
            "Review user accounts. Consider removing unnecessary accounts and limiting administrator access.",
        ),
        Band::Fail => (
            CheckStatus::Fail,
            Severity::High,
            "User account configuration needs attention. Reduce the number of administrator accounts and remove unused accounts.",
        ),
    };

    let mut builder = CheckOutcome::builder(NAME, DESCRIPTION)
        .status(status)
        .score(score)
        .severity(severity)
        .recommendation(recommendation)
        .detail(MARKER)
        .detail(format!("Total Local Users: {}", e.total))
        .detail(format!("Enabled Users: {}", e.enabled))
        .detail(format!("Disabled Users: {}", e.disabled))
        .detail(format!("Administrator Accounts: {}", e.admins.len()));

    let extra: Vec<&str> = e.extra_admins().collect();
    if !extra.is_empty() {
        builder = builder.detail("Admin Accounts (excluding built-in Administrator):");
        for name in extra {
            builder = builder.detail(format!("  - {name}"));
        }
    }
    builder.build()
}

pub struct UserAccountProbe {
    query: Arc<dyn SystemQuery>,
    policy: StatusPolicy,
}

impl UserAccountProbe {
    pub fn new(query: Arc<dyn SystemQuery>, policy: StatusPolicy) -> Self {
        Self { query, policy }
    }

    fn gather(&self) -> ProbeResult<AccountEvidence> {
        let users = self.query.run(USERS_SCRIPT)?;
        let admins = self.query.run(ADMINS_SCRIPT)?;
        AccountEvidence::parse(&users, &admins)
    }
}

impl Probe for UserAccountProbe {
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

    const USERS: &str = r#"[{"Name":"Administrator","Enabled":false},{"Name":"alice","Enabled":true},{"Name":"Guest","Enabled":false}]"#;

    const ADMINS: &str = r#"[{"Name":"HOST\\Administrator"},{"Name":"HOST\\alice"}]"#;

    #[test]
    fn test_parse_counts_users_and_admins() {
        let e = AccountEvidence::parse(USERS, ADMINS).unwrap();
        assert_eq!((e.total, e.enabled, e.disabled), (3, 1, 2));
        assert_eq!(e.admins.len(), 2);
        assert_eq!(e.extra_admins().collect::<Vec<_>>(), ["HOST\\alice"]);
    }

    #[test]
    fn test_disabled_accounts_cost_ten() {
        let o = UserAccountProbe::new(
            FakeQuery::new()
                .with("Get-LocalUser", USERS)
                .with("Get-LocalGroupMember", ADMINS)
                .arc(),
            StatusPolicy::default(),
        )
        .run();
        assert_eq!(o.score(), 90);
        assert_eq!(o.status(), CheckStatus::Pass);
        assert_eq!(o.details().last().map(String::as_str), Some("  - HOST\\alice"));
    }

    #[test]
    fn test_many_admins_and_users_fail() {
        let e = AccountEvidence {
            total: 12,
            enabled: 12,
            disabled: 0,
            admins: (0..6).map(|i| format!("admin{i}")).collect(),
        };
        // 100 - 40 - 10
        let o = evaluate(&e, &StatusPolicy::default());
        assert_eq!(o.score(), 50);
        assert_eq!(o.status(), CheckStatus::Fail);
        assert_eq!(o.severity(), Severity::High);
    }

    #[test]
    fn test_score_floors_at_zero() {
        let e = AccountEvidence {
            total: 40,
            enabled: 30,
            disabled: 10,
            admins: (0..20).map(|i| format!("admin{i}")).collect(),
        };
        assert_eq!(score(&e), 0);
    }

    #[test]
    fn test_single_user_and_admin_objects() {
        let e = AccountEvidence::parse(
            r#"{"Name":"alice","Enabled":true}"#,
            r#"{"Name":"HOST\\Administrator"}"#,
        )
        .unwrap();
        assert_eq!((e.total, e.enabled, e.disabled), (1, 1, 0));
        assert_eq!(e.admins, ["HOST\\Administrator"]);
        assert_eq!(e.extra_admins().count(), 0);
    }
}
