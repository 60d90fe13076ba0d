//! Environmental impact of the drive-alone reduction since the first cycle.

use serde::Serialize;

use crate::analyzers::types::CycleSummary;
use crate::cycle::SurveyCycle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactParams {
    pub workdays_per_year: f64,
    pub fleet_mpg: f64,
    /// The estimate is only produced when the summary has more cycles than this.
    pub min_history: usize,
}

impl Default for ImpactParams {
    fn default() -> Self {
        Self {
            workdays_per_year: 250.0,
            fleet_mpg: 25.0,
            min_history: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactEstimate {
    pub baseline_cycle: SurveyCycle,
    pub latest_cycle: SurveyCycle,
    pub daily_trips_reduced: f64,
    pub annual_trips_reduced: f64,
    pub annual_vmt_reduced: f64,
    pub gallons_saved: f64,
}

/// Trips, VMT and fuel saved by the latest cycle relative to a counterfactual
/// where the first cycle's weighted DAR still held.
///
/// `None` with too little history or when an input ratio is undefined.
pub fn estimate_impact(summaries: &[CycleSummary], params: &ImpactParams) -> Option<ImpactEstimate> {
    if summaries.len() <= params.min_history || params.fleet_mpg <= 0.0 {
        return None;
    }
    let baseline = summaries.first()?;
    let latest = summaries.last()?;

    let counterfactual_dar = baseline.ratios.weighted_dar?;
    let actual_dar = latest.ratios.weighted_dar?;
    let commute_vmt = latest.totals.avg_vmt_per_employee?;

    let daily_trips_reduced = latest.totals.total_employees * (counterfactual_dar - actual_dar);
    let annual_vmt_reduced = daily_trips_reduced * commute_vmt * params.workdays_per_year;

    Some(ImpactEstimate {
        baseline_cycle: baseline.cycle.clone(),
        latest_cycle: latest.cycle.clone(),
        daily_trips_reduced,
        annual_trips_reduced: daily_trips_reduced * params.workdays_per_year,
        annual_vmt_reduced,
        gallons_saved: annual_vmt_reduced / params.fleet_mpg,
    })
}
