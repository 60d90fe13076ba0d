use serde::Serialize;

use crate::analyzers::types::CycleSummary;
use crate::analyzers::utility::pct_change;
use crate::cycle::SurveyCycle;

/// Key indicators of the latest cycle, compared against the first cycle of
/// the same summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadlineKpis {
    pub baseline_cycle: SurveyCycle,
    pub latest_cycle: SurveyCycle,

    pub avg_vmt_per_employee: Option<f64>,
    pub vmt_change_pct: Option<f64>,

    pub weighted_dar: Option<f64>,
    pub unweighted_dar: Option<f64>,
    pub dar_change_pct: Option<f64>,
    pub ndat: Option<f64>,

    pub total_employees: f64,
    pub employee_change_pct: Option<f64>,

    pub worksites: usize,
    pub worksite_change: i64,

    pub da_trips_per_day: Option<f64>,
    pub overall_response_rate: Option<f64>,
    pub change_from_2007: Option<f64>,
    pub change_from_five_cycles: Option<f64>,
}

pub fn headline_kpis(summaries: &[CycleSummary]) -> Option<HeadlineKpis> {
    let baseline = summaries.first()?;
    let latest = summaries.last()?;

    let change = |current: Option<f64>, base: Option<f64>| pct_change(current?, base?);

    Some(HeadlineKpis {
        baseline_cycle: baseline.cycle.clone(),
        latest_cycle: latest.cycle.clone(),
        avg_vmt_per_employee: latest.totals.avg_vmt_per_employee,
        vmt_change_pct: change(
            latest.totals.avg_vmt_per_employee,
            baseline.totals.avg_vmt_per_employee,
        ),
        weighted_dar: latest.ratios.weighted_dar,
        unweighted_dar: latest.ratios.unweighted_dar,
        dar_change_pct: change(latest.ratios.weighted_dar, baseline.ratios.weighted_dar),
        ndat: latest.ratios.ndat,
        total_employees: latest.totals.total_employees,
        employee_change_pct: pct_change(
            latest.totals.total_employees,
            baseline.totals.total_employees,
        ),
        worksites: latest.totals.worksites,
        worksite_change: latest.totals.worksites as i64 - baseline.totals.worksites as i64,
        da_trips_per_day: latest.ratios.da_trips_per_day,
        overall_response_rate: latest.ratios.overall_response_rate,
        change_from_2007: latest.deltas.from_2007,
        change_from_five_cycles: latest.deltas.from_five_cycles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::aggregate::summarize;
    use crate::analyzers::types::CycleFilter;
    use crate::record::Location;
    use crate::record::fixtures::worksite;

    #[test]
    fn test_headline_against_first_cycle() {
        let mut records = vec![
            worksite("2019/2020", Location::Downtown, "A"),
            worksite("2023/2024", Location::Downtown, "A"),
            worksite("2023/2024", Location::Downtown, "B"),
        ];
        records[1].vmt_per_employee = 8.0;
        records[2].vmt_per_employee = 8.0;

        let filter = CycleFilter::new(records.iter().map(|r| r.cycle.clone()), Location::ALL);
        let report = summarize(&records, &filter).unwrap();
        let kpis = headline_kpis(&report.summaries).unwrap();

        assert_eq!(kpis.baseline_cycle.label(), "2019/2020");
        assert_eq!(kpis.latest_cycle.label(), "2023/2024");
        assert!((kpis.vmt_change_pct.unwrap() + 20.0).abs() < 1e-9);
        assert!((kpis.employee_change_pct.unwrap() - 100.0).abs() < 1e-9);
        assert_eq!(kpis.worksite_change, 1);
        assert!(kpis.dar_change_pct.unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_headline_empty_summary() {
        assert_eq!(headline_kpis(&[]), None);
    }
}
