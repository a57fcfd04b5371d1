//! Antivirus / endpoint protection check via Security Center

use super::parse::json_records;
use super::{degraded, Probe, ProbeResult, SystemQuery};
use crate::models::{CheckOutcome, CheckStatus, Severity};
use serde::Deserialize;
use std::sync::Arc;

const NAME: &str = "Antivirus Status";
const DESCRIPTION: &str =
    "Detects if an antivirus or endpoint protection software is active and updated.";
const MARKER: &str = "Checking antivirus status...";
const SCRIPT: &str = "Get-CimInstance -Namespace root/SecurityCenter2 -ClassName AntiVirusProduct \
    | Select-Object -First 1 displayName, productState | ConvertTo-Json -Compress";

/// Bit 12 of `productState`: real-time protection on
const STATE_ENABLED: i64 = 0x1000;
/// Bit 4 of `productState`, read as signatures current. Windows itself uses
/// this bit of the signature byte to flag out-of-date definitions.
const STATE_UP_TO_DATE: i64 = 0x10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AntivirusProduct {
    pub name: String,
    pub enabled: bool,
    pub up_to_date: bool,
}

impl AntivirusProduct {
    fn from_state(name: &str, state: i64) -> Self {
        Self {
            name: name.to_string(),
            enabled: state & STATE_ENABLED != 0,
            up_to_date: state & STATE_UP_TO_DATE != 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductRecord {
    display_name: Option<String>,
    #[serde(default)]
    product_state: i64,
}

/// First registered product, if any
fn parse(output: &str) -> ProbeResult<Option<AntivirusProduct>> {
    Ok(json_records::<ProductRecord>(output)?
        .into_iter()
        .next()
        .map(|record| {
            AntivirusProduct::from_state(
                record.display_name.as_deref().unwrap_or("Unknown"),
                record.product_state,
            )
        }))
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

pub(crate) fn evaluate(product: Option<&AntivirusProduct>) -> CheckOutcome {
    let builder = CheckOutcome::builder(NAME, DESCRIPTION).detail(MARKER);

    let Some(av) = product else {
        return builder
            .status(CheckStatus::Fail)
            .score(0)
            .severity(Severity::Critical)
            .recommendation(
                "No antivirus software detected. Install and enable antivirus protection immediately.",
            )
            .detail("No antivirus product detected in Security Center.")
            .build();
    };

    let (status, score, severity, recommendation) = match (av.enabled, av.up_to_date) {
        (true, true) => (
            CheckStatus::Pass,
            100,
            Severity::Low,
            "Antivirus is installed, enabled, and up-to-date. System is compliant.",
        ),
        (true, false) => (
            CheckStatus::Warning,
            70,
            Severity::Medium,
            "Antivirus is installed and enabled but may not be up-to-date. Update your antivirus definitions.",
        ),
        (false, _) => (
            CheckStatus::Fail,
            40,
            Severity::High,
            "Antivirus is installed but disabled. Enable your antivirus software immediately.",
        ),
    };

    builder
        .status(status)
        .score(score)
        .severity(severity)
        .recommendation(recommendation)
        .detail(format!("Antivirus Product: {}", av.name))
        .detail(format!(
            "Status: {}",
            if av.enabled { "Enabled" } else { "Disabled" }
        ))
        .detail(format!("Up-to-date: {}", yes_no(av.up_to_date)))
        .build()
}

pub struct AntivirusProbe {
    query: Arc<dyn SystemQuery>,
}

impl AntivirusProbe {
    pub fn new(query: Arc<dyn SystemQuery>) -> Self {
        Self { query }
    }

    fn gather(&self) -> ProbeResult<Option<AntivirusProduct>> {
        parse(&self.query.run(SCRIPT)?)
    }
}

impl Probe for AntivirusProbe {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn run(&self) -> CheckOutcome {
        match self.gather() {
            Ok(product) => evaluate(product.as_ref()),
            Err(e) => degraded(NAME, DESCRIPTION, MARKER, &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::tests::FakeQuery;

    #[test]
    fn test_defender_enabled_and_current_passes() {
        // 0x61010: enabled and up to date
        let out = r#"{"displayName":"Windows Defender","productState":397328}"#;
        let probe = AntivirusProbe::new(FakeQuery::new().with("SecurityCenter2", out).arc());
        let o = probe.run();
        assert_eq!(o.status(), CheckStatus::Pass);
        assert_eq!(o.score(), 100);
        assert!(o.details().iter().any(|d| d == "Antivirus Product: Windows Defender"));
    }

    #[test]
    fn test_state_bits() {
        let stale = AntivirusProduct::from_state("AV", 0x1000);
        assert!(stale.enabled && !stale.up_to_date);
        let o = evaluate(Some(&stale));
        assert_eq!((o.status(), o.score(), o.severity()), (CheckStatus::Warning, 70, Severity::Medium));

        let off = AntivirusProduct::from_state("AV", 0x10);
        let o = evaluate(Some(&off));
        assert_eq!((o.status(), o.score(), o.severity()), (CheckStatus::Fail, 40, Severity::High));
    }

    #[test]
    fn test_no_product_is_critical() {
        let probe = AntivirusProbe::new(FakeQuery::new().arc());
        let o = probe.run();
        assert_eq!(o.status(), CheckStatus::Fail);
        assert_eq!(o.score(), 0);
        assert_eq!(o.severity(), Severity::Critical);
        assert_eq!(o.details()[1], "No antivirus product detected in Security Center.");
    }

    #[test]
    fn test_first_of_several_products_is_used() {
        let out = r#"[{"displayName":"Vendor AV","productState":4096},{"displayName":"Other","productState":0}]"#;
        let product = parse(out).unwrap().unwrap();
        assert_eq!(product.name, "Vendor AV");
        assert!(product.enabled && !product.up_to_date);

        let unnamed = parse(r#"{"productState":16}"#).unwrap().unwrap();
        assert_eq!(unnamed.name, "Unknown");
        assert!(!unnamed.enabled);
    }
}
