//! SMB share exposure check

use super::parse::json_records;
use super::{degraded, Band, Probe, ProbeResult, StatusPolicy, SystemQuery};
use crate::models::{CheckOutcome, CheckStatus, Severity};
use serde::Deserialize;
use std::sync::Arc;

const NAME: &str = "Network Shares Check";
const DESCRIPTION: &str = "Identifies open network shares and their permissions.";
const MARKER: &str = "Checking network shares...";
const SHARES_SCRIPT: &str = "Get-SmbShare | Select-Object Name, Path | ConvertTo-Json -Compress";
// Enum columns are stringified so the JSON carries names, not ordinals
const ACCESS_SCRIPT: &str = "Get-SmbShare | ForEach-Object { $share = $_.Name; Get-SmbShareAccess -Name $share \
    | Select-Object @{n='Share';e={$share}}, AccountName, @{n='AccessControlType';e={\"$($_.AccessControlType)\"}} } \
    | ConvertTo-Json -Compress";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ShareRecord {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AccessRecord {
    #[serde(default)]
    account_name: String,
    access_control_type: Option<String>,
}

impl AccessRecord {
    fn is_public_allow(&self) -> bool {
        let allowed = self
            .access_control_type
            .as_deref()
            .map_or(true, |t| t.eq_ignore_ascii_case("Allow"));
        allowed && PUBLIC_ACCOUNTS.iter().any(|p| self.account_name.contains(p))
    }
}

/// Accounts that make a share reachable by any user
const PUBLIC_ACCOUNTS: [&str; 2] = ["Everyone", "Authenticated Users"];
const MAX_CUSTOM_SHARES: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ShareEvidence {
    pub shares: Vec<String>,
    /// Allow-grants to a public account
    pub public_grants: usize,
}

impl ShareEvidence {
    fn parse(shares: &str, access: &str) -> ProbeResult<Self> {
        let public_grants = json_records::<AccessRecord>(access)?
            .iter()
            .filter(|r| r.is_public_allow())
            .count();

        Ok(Self {
            shares: json_records::<ShareRecord>(shares)?
                .into_iter()
                .map(|r| r.name)
                .filter(|n| !n.is_empty())
                .collect(),
            public_grants,
        })
    }

    /// Default administrative shares such as `C$` and `ADMIN$`
    fn admin_shares(&self) -> usize {
        self.shares.iter().filter(|s| s.ends_with('$')).count()
    }

    fn custom_shares(&self) -> usize {
        self.shares.len() - self.admin_shares()
    }
}

fn score(e: &ShareEvidence) -> u8 {
    let mut penalty = e.public_grants * 20;
    if e.custom_shares() > MAX_CUSTOM_SHARES {
        penalty += 10;
    }
    100usize.saturating_sub(penalty) as u8
}

pub(crate) fn evaluate(e: &ShareEvidence, policy: &StatusPolicy) -> CheckOutcome {
    let score = score(e);
    let (status, severity, recommendation) = match policy.band(score) {
        Band::Pass => (
            CheckStatus::Pass,
            Severity::Low,
            "Network shares are properly configured. System is compliant.",
        ),
        Band::Warning => (
            CheckStatus::Warning,
            Severity::Medium,
            "Some network shares have public access. Review share permissions and restrict access to authorized users only.",
        ),
        Band::Fail => (
            CheckStatus::Fail,
            Severity::High,
            "Network shares have excessive public access. This poses a security risk. Immediately restrict share permissions to authorized users only.",
        ),
    };

    let mut builder = CheckOutcome::builder(NAME, DESCRIPTION)
        .status(status)
        .score(score)
        .severity(severity)
        .recommendation(recommendation)
        .detail(MARKER)
        .detail(format!("Total Network Shares: {}", e.shares.len()))
        .detail(format!("Admin Shares (hidden): {}", e.admin_shares()))
        .detail(format!("Shares with Public Access: {}", e.public_grants));
    if !e.shares.is_empty() {
        builder = builder.detail("Share Names:");
        for name in &e.shares {
            builder = builder.detail(format!("  - {name}"));
        }
    }
    builder.build()
}

pub struct NetworkSharesProbe {
    query: Arc<dyn SystemQuery>,
    policy: StatusPolicy,
}

impl NetworkSharesProbe {
    pub fn new(query: Arc<dyn SystemQuery>, policy: StatusPolicy) -> Self {
        Self { query, policy }
    }

    fn gather(&self) -> ProbeResult<ShareEvidence> {
        let shares = self.query.run(SHARES_SCRIPT)?;
        let access = self.query.run(ACCESS_SCRIPT)?;
        ShareEvidence::parse(&shares, &access)
    }
}

impl Probe for NetworkSharesProbe {
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
