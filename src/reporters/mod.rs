//! Report rendering for scan results
//!
//! Supports three output formats:
//! - `summary` - Plain-text module results
//! - `detailed` - Summary plus top issues, severity buckets and worst-first order
//! - `json` - Machine-readable JSON

mod json;
mod text;

pub use json::JsonReport;

use crate::engine::ComplianceEngine;
use crate::models::CheckOutcome;
use anyhow::anyhow;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to write report to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode JSON report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Summary,
    Detailed,
    Json,
}

impl FromStr for ReportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" | "text" | "txt" => Ok(ReportFormat::Summary),
            "detailed" | "detail" => Ok(ReportFormat::Detailed),
            "json" => Ok(ReportFormat::Json),
            _ => Err(anyhow!(
                "Unknown format '{}'. Valid formats: summary, detailed, json",
                s
            )),
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Summary => write!(f, "summary"),
            ReportFormat::Detailed => write!(f, "detailed"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

/// Tool identity printed in report headers
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReportHeader {
    #[serde(default = "default_tool_name")]
    pub tool_name: String,
    /// Printed as `v<version>` and as the JSON `reportVersion`
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_tool_name() -> String {
    "Windows Compliance Tool".to_string()
}

fn default_version() -> String {
    "2.0".to_string()
}

impl Default for ReportHeader {
    fn default() -> Self {
        Self {
            tool_name: default_tool_name(),
            version: default_version(),
        }
    }
}

/// Everything a reporter needs: header, overall score and outcomes in
/// registry order
#[derive(Debug, Clone, Copy)]
pub struct ReportContext<'a> {
    pub header: &'a ReportHeader,
    pub overall_score: u8,
    pub outcomes: &'a [CheckOutcome],
}

impl<'a> ReportContext<'a> {
    pub fn new(header: &'a ReportHeader, overall_score: u8, outcomes: &'a [CheckOutcome]) -> Self {
        Self {
            header,
            overall_score,
            outcomes,
        }
    }

    /// Context over the engine's latest scan
    pub fn from_engine(header: &'a ReportHeader, engine: &'a ComplianceEngine) -> Self {
        Self::new(header, engine.overall_score(), engine.results())
    }
}

pub fn render_summary_text(ctx: &ReportContext<'_>) -> String {
    text::render_summary(ctx)
}

pub fn render_detailed_text(ctx: &ReportContext<'_>) -> String {
    text::render_detailed(ctx)
}

pub fn render_json(ctx: &ReportContext<'_>) -> Result<String, ReportError> {
    json::render(ctx)
}

/// Render a report in the given format
pub fn render(ctx: &ReportContext<'_>, format: ReportFormat) -> Result<String, ReportError> {
    match format {
        ReportFormat::Summary => Ok(render_summary_text(ctx)),
        ReportFormat::Detailed => Ok(render_detailed_text(ctx)),
        ReportFormat::Json => render_json(ctx),
    }
}

/// Render and write a report to `path`, without retry
pub fn write_report(
    ctx: &ReportContext<'_>,
    format: ReportFormat,
    path: &Path,
) -> Result<(), ReportError> {
    let rendered = render(ctx, format)?;
    std::fs::write(path, rendered).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Wrote {} report to {}", format, path.display());
    Ok(())
}

/// Recommended file extension for a format
pub fn file_extension(format: ReportFormat) -> &'static str {
    match format {
        ReportFormat::Summary | ReportFormat::Detailed => "txt",
        ReportFormat::Json => "json",
    }
}
