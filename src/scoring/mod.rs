//! Severity-Weighted Compliance Scoring
//!
//! The overall score is a weighted mean of the probe-local scores, where the
//! weight comes from each outcome's severity.
//!
//! # Scoring Formula
//!
//! ```text
//! Overall = floor( Σ(score_i × weight_i) / Σ(weight_i) )
//!
//! Weights:
//!   Critical: 4
//!   High:     3
//!   Medium:   2
//!   Low:      1
//! ```
//!
//! An empty outcome set scores 0.
//!
//! # Example
//!
//! ```text
//! Firewall  score 100, Low      → 100 × 1 = 100
//! Antivirus score   0, Critical →   0 × 4 =   0
//! Overall = floor(100 / 5) = 20
//! ```

use crate::models::{CheckOutcome, Severity};
use serde::Serialize;

/// Compute the overall score for a set of outcomes
pub fn overall_score(outcomes: &[CheckOutcome]) -> u8 {
    let (weighted, total) = outcomes.iter().fold((0u32, 0u32), |(w, t), o| {
        let weight = o.severity().weight();
        (w + u32::from(o.score()) * weight, t + weight)
    });
    if total == 0 {
        return 0;
    }
    // Every score is <= 100, so the mean is too
    (weighted / total) as u8
}

/// One outcome's share of the overall score
#[derive(Debug, Clone, Serialize)]
pub struct Contribution {
    pub module_name: String,
    pub score: u8,
    pub severity: Severity,
    pub weight: u32,
    pub weighted_score: u32,
}

/// Full breakdown of how the overall score was computed
#[derive(Debug, Clone, Serialize)]
pub struct ScoreBreakdown {
    pub overall_score: u8,
    pub weighted_sum: u32,
    pub total_weight: u32,
    pub contributions: Vec<Contribution>,
}

impl ScoreBreakdown {
    pub fn from_outcomes(outcomes: &[CheckOutcome]) -> Self {
        let contributions: Vec<Contribution> = outcomes
            .iter()
            .map(|o| {
                let weight = o.severity().weight();
                Contribution {
                    module_name: o.module_name().to_string(),
                    score: o.score(),
                    severity: o.severity(),
                    weight,
                    weighted_score: u32::from(o.score()) * weight,
                }
            })
            .collect();

        Self {
            overall_score: overall_score(outcomes),
            weighted_sum: contributions.iter().map(|c| c.weighted_score).sum(),
            total_weight: contributions.iter().map(|c| c.weight).sum(),
            contributions,
        }
    }

    /// Plain-text explanation, one line per module plus the formula
    pub fn explain(&self) -> String {
        let mut out = String::from("Score breakdown (score x weight):\n");
        for c in &self.contributions {
            out.push_str(&format!(
                "  {:<32} {:>3} x {} ({}) = {}\n",
                c.module_name, c.score, c.weight, c.severity, c.weighted_score
            ));
        }
        if self.total_weight == 0 {
            out.push_str("  No modules scanned; overall score is 0\n");
        } else {
            out.push_str(&format!(
                "  Overall = floor({} / {}) = {}\n",
                self.weighted_sum, self.total_weight, self.overall_score
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::outcome;
    use crate::models::CheckStatus;

    #[test]
    fn test_empty_scores_zero() {
        assert_eq!(overall_score(&[]), 0);
    }

    #[test]
    fn test_critical_gap_outweighs_low_pass() {
        let outcomes = vec![
            outcome("F", 100, Severity::Low, CheckStatus::Pass),
            outcome("AV", 0, Severity::Critical, CheckStatus::Fail),
        ];
        assert_eq!(overall_score(&outcomes), 20);
    }

    #[test]
    fn test_truncating_division() {
        // (67*2 + 33*3) / 5 = 233 / 5 = 46.6 -> 46
        let outcomes = vec![
            outcome("A", 67, Severity::Medium, CheckStatus::Warning),
            outcome("B", 33, Severity::High, CheckStatus::Fail),
        ];
        assert_eq!(overall_score(&outcomes), 46);
    }

    #[test]
    fn test_bounds() {
        let all_max: Vec<_> = Severity::ALL
            .iter()
            .map(|s| outcome(&s.to_string(), 100, *s, CheckStatus::Pass))
            .collect();
        assert_eq!(overall_score(&all_max), 100);
        let all_min: Vec<_> = Severity::ALL
            .iter()
            .map(|s| outcome(&s.to_string(), 0, *s, CheckStatus::Fail))
            .collect();
        assert_eq!(overall_score(&all_min), 0);
    }

    #[test]
    fn test_breakdown_matches_score() {
        let outcomes = vec![
            outcome("F", 100, Severity::Low, CheckStatus::Pass),
            outcome("AV", 0, Severity::Critical, CheckStatus::Fail),
        ];
        let b = ScoreBreakdown::from_outcomes(&outcomes);
        assert_eq!(b.overall_score, 20);
        assert_eq!(b.weighted_sum, 100);
        assert_eq!(b.total_weight, 5);
        assert_eq!(b.contributions[1].weight, 4);
        assert!(b.explain().contains("floor(100 / 5) = 20"));
    }

    #[test]
    fn test_breakdown_empty() {
        let b = ScoreBreakdown::from_outcomes(&[]);
        assert_eq!(b.overall_score, 0);
        assert!(b.explain().contains("No modules scanned"));
    }
}
