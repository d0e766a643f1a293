//! Progress derivation.
//!
//! Progress is not one global formula. Each phase contributes its own rule,
//! applied explicitly right after the mutation that changes completion:
//!
//! - research approval is a fixed checkpoint
//! - editing progress is the share of resolved suggestions

use crate::model::{Phase, ProjectRecord};

/// Progress checkpoint reached when a research suggestion is approved.
pub const RESEARCH_CHECKPOINT: u8 = 25;

/// A phase-local progress rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressRule {
    /// A research suggestion was approved.
    ResearchApproved,
    /// Editing suggestions were resolved: `resolved` out of `total`.
    EditingResolution { resolved: usize, total: usize },
}

impl ProgressRule {
    /// Phase the rule belongs to.
    pub fn phase(&self) -> Phase {
        match self {
            Self::ResearchApproved => Phase::Research,
            Self::EditingResolution { .. } => Phase::Editing,
        }
    }
}

/// Pure progress calculations.
pub struct ProgressCalculator;

impl ProgressCalculator {
    /// New progress value for `record` after `rule` fires.
    pub fn compute_progress(record: &ProjectRecord, rule: ProgressRule) -> u8 {
        Self::evaluate(record.progress, rule)
    }

    /// New progress value given the `current` one.
    pub fn evaluate(current: u8, rule: ProgressRule) -> u8 {
        match rule {
            ProgressRule::ResearchApproved => RESEARCH_CHECKPOINT,
            ProgressRule::EditingResolution { resolved, total } => {
                Self::resolution_percent(resolved, total).unwrap_or(current)
            }
        }
    }

    /// `round(100 * resolved / total)` clamped to 0..=100, or `None` when
    /// there is nothing to resolve.
    pub fn resolution_percent(resolved: usize, total: usize) -> Option<u8> {
        if total == 0 {
            return None;
        }
        let percent = (resolved as f64 / total as f64 * 100.0).round();
        Some(percent.clamp(0.0, 100.0) as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_research_checkpoint_ignores_prior_value() {
        for current in [0, 10, 25, 80, 100] {
            assert_eq!(ProgressCalculator::evaluate(current, ProgressRule::ResearchApproved), 25);
        }
    }

    #[test]
    fn test_editing_ratio_rounds() {
        let rule = |resolved, total| ProgressRule::EditingResolution { resolved, total };
        assert_eq!(ProgressCalculator::evaluate(0, rule(1, 2)), 50);
        assert_eq!(ProgressCalculator::evaluate(0, rule(1, 3)), 33);
        assert_eq!(ProgressCalculator::evaluate(0, rule(2, 3)), 67);
        assert_eq!(ProgressCalculator::evaluate(0, rule(0, 4)), 0);
        assert_eq!(ProgressCalculator::evaluate(0, rule(4, 4)), 100);
    }

    #[test]
    fn test_editing_ratio_is_clamped() {
        let rule = ProgressRule::EditingResolution { resolved: 9, total: 3 };
        assert_eq!(ProgressCalculator::evaluate(0, rule), 100);
    }

    #[test]
    fn test_no_suggestions_leaves_progress_unchanged() {
        let rule = ProgressRule::EditingResolution { resolved: 0, total: 0 };
        assert_eq!(ProgressCalculator::evaluate(42, rule), 42);
        assert_eq!(ProgressCalculator::resolution_percent(0, 0), None);
    }

    #[test]
    fn test_rules_are_tagged_by_phase() {
        assert_eq!(ProgressRule::ResearchApproved.phase(), Phase::Research);
        assert_eq!(
            ProgressRule::EditingResolution { resolved: 0, total: 1 }.phase(),
            Phase::Editing
        );
    }
}
