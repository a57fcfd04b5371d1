//! Core data models for HostAudit
//!
//! These models are used throughout the codebase for representing
//! probe verdicts and the severities and statuses attached to them.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Highest score a probe or scan can report
pub const MAX_SCORE: u8 = 100;

/// Deserialize a 0-100 score; larger values are rejected, not clamped
pub(crate) fn deserialize_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let score = u8::deserialize(deserializer)?;
    if score > MAX_SCORE {
        return Err(D::Error::custom(format!(
            "score {score} is out of range 0-{MAX_SCORE}"
        )));
    }
    Ok(score)
}

/// Severity levels for compliance issues
///
/// The discriminant is the fixed ordinal used for bucketing and ordering;
/// higher is worse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum Severity {
    #[default]
    Low = 20,
    Medium = 40,
    High = 60,
    Critical = 80,
}

impl Severity {
    /// All severities, lowest first
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    /// Numeric ordinal (20/40/60/80)
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Aggregation weight: Critical 4, High 3, Medium 2, Low 1
    pub fn weight(self) -> u32 {
        match self {
            Severity::Critical => 4,
            Severity::High => 3,
            Severity::Medium => 2,
            Severity::Low => 1,
        }
    }

    /// Look up a severity by its numeric ordinal
    pub fn from_value(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.value() == value)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
            Severity::Critical => write!(f, "Critical"),
        }
    }
}

/// Verdict of a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CheckStatus {
    Pass,
    Fail,
    Warning,
    #[default]
    #[serde(rename = "Not Applicable")]
    NotApplicable,
}

impl CheckStatus {
    /// Whether this status belongs in the "top issues" view
    pub fn is_issue(self) -> bool {
        matches!(self, CheckStatus::Fail | CheckStatus::Warning)
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckStatus::Pass => write!(f, "Pass"),
            CheckStatus::Fail => write!(f, "Fail"),
            CheckStatus::Warning => write!(f, "Warning"),
            CheckStatus::NotApplicable => write!(f, "Not Applicable"),
        }
    }
}

/// One probe's verdict
///
/// Built once per scan through [`OutcomeBuilder`] and read-only afterwards:
/// fields are private and only exposed through accessors. Field order here
/// is the JSON report field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    module_name: String,
    description: String,
    status: CheckStatus,
    severity: Severity,
    #[serde(deserialize_with = "deserialize_score")]
    score: u8,
    recommendation: String,
    details: Vec<String>,
}

impl CheckOutcome {
    /// Start building an outcome for `module_name`
    pub fn builder(module_name: impl Into<String>, description: impl Into<String>) -> OutcomeBuilder {
        OutcomeBuilder {
            outcome: CheckOutcome {
                module_name: module_name.into(),
                description: description.into(),
                status: CheckStatus::default(),
                severity: Severity::default(),
                score: 0,
                recommendation: String::new(),
                details: Vec::new(),
            },
        }
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> CheckStatus {
        self.status
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Probe-local compliance score, 0-100
    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn recommendation(&self) -> &str {
        &self.recommendation
    }

    /// Evidence lines in insertion order
    pub fn details(&self) -> &[String] {
        &self.details
    }

    /// Copy of this outcome keyed under a different module name
    pub(crate) fn rekeyed(&self, module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            ..self.clone()
        }
    }
}

/// Builder used by probes while they gather evidence
#[derive(Debug, Clone)]
pub struct OutcomeBuilder {
    outcome: CheckOutcome,
}

impl OutcomeBuilder {
    pub fn status(mut self, status: CheckStatus) -> Self {
        self.outcome.status = status;
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.outcome.severity = severity;
        self
    }

    /// Set the score, clamped to 100
    pub fn score(mut self, score: u8) -> Self {
        self.outcome.score = score.min(MAX_SCORE);
        self
    }

    pub fn recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.outcome.recommendation = recommendation.into();
        self
    }

    pub fn detail(mut self, line: impl Into<String>) -> Self {
        self.outcome.details.push(line.into());
        self
    }

    pub fn details<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outcome.details.extend(lines.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> CheckOutcome {
        self.outcome
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal outcome for tests elsewhere in the crate
    pub(crate) fn outcome(name: &str, score: u8, severity: Severity, status: CheckStatus) -> CheckOutcome {
        CheckOutcome::builder(name, format!("{name} description"))
            .status(status)
            .severity(severity)
            .score(score)
            .recommendation("Do the thing.")
            .detail(format!("Checking {name}..."))
            .build()
    }

    #[test]
    fn test_severity_values_and_weights() {
        assert_eq!(Severity::Low.value(), 20);
        assert_eq!(Severity::Critical.value(), 80);
        assert_eq!(Severity::Critical.weight(), 4);
        assert_eq!(Severity::Low.weight(), 1);
        assert!(Severity::High > Severity::Medium);
        assert_eq!(Severity::from_value(60), Some(Severity::High));
        assert_eq!(Severity::from_value(50), None);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(CheckStatus::NotApplicable.to_string(), "Not Applicable");
        assert!(CheckStatus::Warning.is_issue());
        assert!(!CheckStatus::Pass.is_issue());
    }

    #[test]
    fn test_builder_clamps_score_and_keeps_detail_order() {
        let o = CheckOutcome::builder("X", "desc")
            .score(250)
            .detail("first")
            .details(["second", "third"])
            .build();
        assert_eq!(o.score(), 100);
        assert_eq!(o.details(), ["first", "second", "third"]);
        assert_eq!(o.status(), CheckStatus::NotApplicable);
    }

    #[test]
    fn test_serde_field_names() {
        let o = outcome("Firewall Status", 67, Severity::Medium, CheckStatus::NotApplicable);
        let v = serde_json::to_value(&o).unwrap();
        assert_eq!(v["moduleName"], "Firewall Status");
        assert_eq!(v["status"], "Not Applicable");
        assert_eq!(v["severity"], "Medium");
        assert_eq!(v["score"], 67);
    }

    #[test]
    fn test_deserialize_rejects_score_above_100() {
        let json = r#"{"moduleName":"X","description":"d","status":"Pass","severity":"Low","score":250,"recommendation":"","details":[]}"#;
        let err = serde_json::from_str::<CheckOutcome>(json).unwrap_err();
        assert!(err.to_string().contains("out of range"));

        let ok: CheckOutcome = serde_json::from_str(&json.replace("250", "100")).unwrap();
        assert_eq!(ok.score(), 100);
    }
}
