//! JSON reporter
//!
//! Pretty-printed with two-space indentation. Field order follows the struct
//! declarations, so parsing a report back into [`JsonReport`] and rendering
//! it again reproduces the same bytes.

use super::{ReportContext, ReportError};
use crate::models::{deserialize_score, CheckOutcome};
use serde::{Deserialize, Serialize};

/// Serialized form of a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonReport {
    pub report_version: String,
    #[serde(deserialize_with = "deserialize_score")]
    pub overall_score: u8,
    pub modules: Vec<CheckOutcome>,
}

impl JsonReport {
    pub fn from_context(ctx: &ReportContext<'_>) -> Self {
        Self {
            report_version: ctx.header.version.clone(),
            overall_score: ctx.overall_score,
            modules: ctx.outcomes.to_vec(),
        }
    }

    /// Parse a previously rendered report
    pub fn parse(json: &str) -> Result<Self, ReportError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render with a trailing newline
    pub fn to_json(&self) -> Result<String, ReportError> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }
}

/// Render report as JSON
pub fn render(ctx: &ReportContext<'_>) -> Result<String, ReportError> {
    JsonReport::from_context(ctx).to_json()
}
