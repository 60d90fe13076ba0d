//! TMP zone targets and the DAR goal.
//!
//! Zone targets use the *unweighted* DAR averaged over the most recent
//! cycles, reduced by a fixed factor. The factor carries no regulatory
//! weight of its own and is exposed as a parameter.

use serde::Serialize;

use crate::analyzers::types::CycleSummary;
use crate::analyzers::utility::mean;
use crate::cycle::SurveyCycle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetParams {
    /// Number of most recent cycles averaged.
    pub window: usize,
    /// Multiplier applied to the window average (0.95 = 5% reduction).
    pub reduction_factor: f64,
    /// Weighted DAR the program aims for.
    pub dar_goal: f64,
}

impl Default for TargetParams {
    fn default() -> Self {
        Self {
            window: 3,
            reduction_factor: 0.95,
            dar_goal: 0.40,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TmpTarget {
    pub cycles: Vec<SurveyCycle>,
    pub average_unweighted_dar: f64,
    pub recommended_target: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalGap {
    pub cycle: SurveyCycle,
    pub weighted_dar: f64,
    pub goal: f64,
    /// Positive while the cycle is above the goal.
    pub gap: f64,
}

/// Recommended TMP target from the last `params.window` summary rows.
///
/// `None` when fewer rows are available or none of them has an unweighted DAR.
pub fn tmp_target(summaries: &[CycleSummary], params: &TargetParams) -> Option<TmpTarget> {
    if params.window == 0 || summaries.len() < params.window {
        return None;
    }
    let recent = &summaries[summaries.len() - params.window..];
    let average = mean(recent.iter().filter_map(|s| s.ratios.unweighted_dar))?;

    Some(TmpTarget {
        cycles: recent.iter().map(|s| s.cycle.clone()).collect(),
        average_unweighted_dar: average,
        recommended_target: average * params.reduction_factor,
    })
}

/// Distance of the latest cycle's weighted DAR from the goal.
pub fn goal_gap(summaries: &[CycleSummary], params: &TargetParams) -> Option<GoalGap> {
    let latest = summaries.last()?;
    let weighted_dar = latest.ratios.weighted_dar?;
    Some(GoalGap {
        cycle: latest.cycle.clone(),
        weighted_dar,
        goal: params.dar_goal,
        gap: weighted_dar - params.dar_goal,
    })
}
