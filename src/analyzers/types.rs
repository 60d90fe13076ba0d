//! Data types produced by the cycle metrics pipeline.
//!
//! Ratios that cannot be computed (zero denominator, absent baseline) are
//! `None`. They serialize as `null` in JSON and as an empty CSV cell.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::cycle::SurveyCycle;
use crate::record::{Location, WorksiteRecord};

/// The selection a report is computed for. Also the summary cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CycleFilter {
    pub cycles: BTreeSet<SurveyCycle>,
    pub locations: BTreeSet<Location>,
}

impl CycleFilter {
    pub fn new(
        cycles: impl IntoIterator<Item = SurveyCycle>,
        locations: impl IntoIterator<Item = Location>,
    ) -> Self {
        Self {
            cycles: cycles.into_iter().collect(),
            locations: locations.into_iter().collect(),
        }
    }

    pub fn matches(&self, record: &WorksiteRecord) -> bool {
        self.cycles.contains(&record.cycle) && self.locations.contains(&record.location)
    }

    /// Comma-separated cycle labels, for messages.
    pub fn describe_cycles(&self) -> String {
        join(self.cycles.iter())
    }

    /// Comma-separated location codes, for messages.
    pub fn describe_locations(&self) -> String {
        join(self.locations.iter())
    }
}

fn join<T: std::fmt::Display>(items: impl Iterator<Item = T>) -> String {
    items.map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}

/// Sums and means of one survey cycle's worksite records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleTotals {
    pub worksites: usize,
    pub total_employees: f64,
    pub yearly_vmt: f64,
    pub yearly_ghg_tons: f64,
    pub telework_days: f64,

    pub bus_trips: f64,
    pub train_trips: f64,
    pub carpool_trips: f64,
    pub vanpool_trips: f64,
    pub walk_trips: f64,
    pub bike_trips: f64,
    pub drive_alone_trips: f64,
    pub total_weekly_trips: f64,

    pub surveys_returned: f64,

    pub avg_vmt_per_employee: Option<f64>,
    pub avg_response_rate: Option<f64>,
    /// Mean of the site-level drive-alone rates.
    pub avg_site_dar: Option<f64>,
}

/// Mode shares in percent (0–100) of total weekly trips.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModeShares {
    pub drive_alone: Option<f64>,
    pub transit: Option<f64>,
    pub carpool: Option<f64>,
    pub active: Option<f64>,
    pub telework: Option<f64>,
}

/// Official ratio metrics of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivedRatios {
    /// Drive-alone trips over total weekly trips. The primary official metric.
    pub weighted_dar: Option<f64>,
    pub unweighted_dar: Option<f64>,
    pub ndat: Option<f64>,
    pub mode_shares: ModeShares,
    pub da_trips_per_day: Option<f64>,
    pub overall_response_rate: Option<f64>,
}

/// Change of weighted DAR against earlier cycles in the same summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BaselineDeltas {
    pub from_1993: Option<f64>,
    pub from_2007: Option<f64>,
    pub from_prior: Option<f64>,
    pub from_five_cycles: Option<f64>,
}

/// One summary row per surveyed cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleSummary {
    pub cycle: SurveyCycle,
    pub totals: CycleTotals,
    pub ratios: DerivedRatios,
    pub deltas: BaselineDeltas,
}

/// Output of the pipeline: chronologically ordered summaries plus the
/// records that survived the filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub summaries: Vec<CycleSummary>,
    #[serde(skip)]
    pub records: Vec<WorksiteRecord>,
}

impl CycleReport {
    pub fn latest(&self) -> Option<&CycleSummary> {
        self.summaries.last()
    }

    pub fn first(&self) -> Option<&CycleSummary> {
        self.summaries.first()
    }

    pub fn find(&self, cycle: &SurveyCycle) -> Option<&CycleSummary> {
        self.summaries.iter().find(|s| &s.cycle == cycle)
    }

    /// Filtered records belonging to one cycle.
    pub fn records_for<'a>(
        &'a self,
        cycle: &'a SurveyCycle,
    ) -> impl Iterator<Item = &'a WorksiteRecord> + 'a {
        self.records.iter().filter(move |r| &r.cycle == cycle)
    }
}
