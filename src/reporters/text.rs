//! Plain-text reporters
//!
//! Output is uncolored so it can be written to files unchanged.

use super::ReportContext;
use crate::models::CheckOutcome;
use crate::organizer::{group_by_severity, rank_top_issues, reorder_worst_first};

const RULE: &str = "========================================";
const THIN_RULE: &str = "----------------------------------------";

fn header(ctx: &ReportContext<'_>, title: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("{RULE}\n"));
    out.push_str(&format!(
        "{} v{}\n",
        ctx.header.tool_name, ctx.header.version
    ));
    out.push_str(&format!("{title}\n"));
    out.push_str(&format!("{RULE}\n\n"));
    out.push_str(&format!(
        "Overall Compliance Score: {}%\n\n",
        ctx.overall_score
    ));
    out
}

/// One module block; the details section is omitted when there are none
fn module_block(o: &CheckOutcome) -> String {
    let mut out = String::new();
    out.push_str(&format!("Module: {}\n", o.module_name()));
    out.push_str(&format!("Status: {}\n", o.status()));
    out.push_str(&format!("Score: {}%\n", o.score()));
    out.push_str(&format!("Severity: {}\n", o.severity()));
    out.push_str(&format!("Description: {}\n", o.description()));
    out.push_str(&format!("Recommendation: {}\n", o.recommendation()));
    if !o.details().is_empty() {
        out.push_str("Details:\n");
        for line in o.details() {
            out.push_str(&format!("  {line}\n"));
        }
    }
    out
}

fn worst_first_lines(outcomes: &[&CheckOutcome]) -> String {
    outcomes
        .iter()
        .map(|o| format!("- {} ({})\n", o.module_name(), o.score()))
        .collect()
}

/// Header, overall score and every module in registry order
pub fn render_summary(ctx: &ReportContext<'_>) -> String {
    let mut out = header(ctx, "Compliance Audit Report");
    out.push_str("Module Results:\n");
    out.push_str(&format!("{THIN_RULE}\n"));
    for o in ctx.outcomes {
        out.push('\n');
        out.push_str(&module_block(o));
    }
    out
}

/// Summary content preceded by the derived views: top issues, severity
/// buckets (highest first) and the worst-first reordering
pub fn render_detailed(ctx: &ReportContext<'_>) -> String {
    let mut out = header(ctx, "Detailed Compliance Audit Report");

    out.push_str("-- Top Issues (most severe first) --\n");
    let top = rank_top_issues(ctx.outcomes);
    if top.is_empty() {
        out.push_str("No failing or warning modules.\n");
    }
    for (i, o) in top.iter().enumerate() {
        out.push_str(&format!(
            "{}) Module: {} -- Severity: {}\n",
            i + 1,
            o.module_name(),
            o.severity().value()
        ));
    }
    out.push('\n');

    out.push_str("-- Modules by Severity (highest first) --\n");
    for (severity, bucket) in group_by_severity(ctx.outcomes).iter_high_to_low() {
        let names: Vec<&str> = bucket.iter().map(|o| o.module_name()).collect();
        out.push_str(&format!(
            "Severity {}: {},\n",
            severity.value(),
            names.join(", ")
        ));
    }
    out.push('\n');

    out.push_str("-- Worst Score First --\n");
    out.push_str("Original order (as scanned):\n");
    let scanned: Vec<&CheckOutcome> = ctx.outcomes.iter().collect();
    out.push_str(&worst_first_lines(&scanned));
    if !ctx.outcomes.is_empty() {
        out.push_str("\nAfter moving worst issue to front:\n");
        out.push_str(&worst_first_lines(&reorder_worst_first(ctx.outcomes)));
    }
    out.push('\n');

    out.push_str(&format!("{RULE}\n"));
    out.push_str("Detailed Module Results:\n");
    out.push_str(&format!("{RULE}\n"));
    for o in ctx.outcomes {
        out.push('\n');
        out.push_str(&module_block(o));
    }
    out
}
