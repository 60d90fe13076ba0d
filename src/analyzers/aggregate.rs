use std::collections::BTreeMap;

use tracing::debug;

use crate::analyzers::deltas::derive_baseline_deltas;
use crate::analyzers::types::{
    BaselineDeltas, CycleFilter, CycleReport, CycleSummary, CycleTotals, DerivedRatios, ModeShares,
};
use crate::analyzers::utility::{mean, ratio, sum};
use crate::cycle::SurveyCycle;
use crate::error::MetricsError;
use crate::record::WorksiteRecord;

/// Runs the whole pipeline: filter, group by cycle, derive ratios and
/// baseline deltas.
///
/// Pure: identical inputs give identical reports.
pub fn summarize(
    records: &[WorksiteRecord],
    filter: &CycleFilter,
) -> Result<CycleReport, MetricsError> {
    let filtered = filter_records(records, filter)?;

    let mut summaries: Vec<CycleSummary> = aggregate_by_cycle(&filtered)
        .into_iter()
        .map(|(cycle, totals)| {
            let ratios = derive_ratios(&totals);
            CycleSummary {
                cycle,
                totals,
                ratios,
                deltas: BaselineDeltas::default(),
            }
        })
        .collect();

    let deltas = derive_baseline_deltas(&summaries);
    for (summary, deltas) in summaries.iter_mut().zip(deltas) {
        summary.deltas = deltas;
    }

    debug!(
        cycles = summaries.len(),
        records = filtered.len(),
        "Cycle summary computed"
    );

    Ok(CycleReport {
        summaries,
        records: filtered,
    })
}

/// Keeps the records whose cycle and location are both selected.
///
/// # Errors
///
/// [`MetricsError::EmptyResult`] when nothing matches.
pub fn filter_records(
    records: &[WorksiteRecord],
    filter: &CycleFilter,
) -> Result<Vec<WorksiteRecord>, MetricsError> {
    let filtered: Vec<WorksiteRecord> = records
        .iter()
        .filter(|r| filter.matches(r))
        .cloned()
        .collect();

    if filtered.is_empty() {
        return Err(MetricsError::EmptyResult {
            cycles: filter.describe_cycles(),
            locations: filter.describe_locations(),
        });
    }

    Ok(filtered)
}

/// Groups records by cycle in chronological order and totals each group.
pub fn aggregate_by_cycle(records: &[WorksiteRecord]) -> Vec<(SurveyCycle, CycleTotals)> {
    let mut groups: BTreeMap<&SurveyCycle, Vec<&WorksiteRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(&record.cycle).or_default().push(record);
    }

    groups
        .into_iter()
        .map(|(cycle, group)| (cycle.clone(), total_group(&group)))
        .collect()
}

fn total_group(group: &[&WorksiteRecord]) -> CycleTotals {
    macro_rules! total {
        ($field:ident) => {
            sum(group.iter().map(|r| r.$field))
        };
    }

    macro_rules! average {
        ($field:ident) => {
            mean(group.iter().map(|r| r.$field))
        };
    }

    CycleTotals {
        worksites: group.len(),
        total_employees: total!(total_employees),
        yearly_vmt: total!(yearly_vmt),
        yearly_ghg_tons: total!(yearly_ghg_tons),
        telework_days: total!(telework_days),
        bus_trips: total!(bus_trips),
        train_trips: total!(train_trips),
        carpool_trips: total!(carpool_trips),
        vanpool_trips: total!(vanpool_trips),
        walk_trips: total!(walk_trips),
        bike_trips: total!(bike_trips),
        drive_alone_trips: total!(drive_alone_trips),
        total_weekly_trips: total!(total_weekly_trips),
        surveys_returned: total!(surveys_returned),
        avg_vmt_per_employee: average!(vmt_per_employee),
        avg_response_rate: average!(response_rate),
        avg_site_dar: average!(drive_alone_rate),
    }
}

/// Computes the official ratio metrics of one aggregated cycle.
pub fn derive_ratios(totals: &CycleTotals) -> DerivedRatios {
    let trips = totals.total_weekly_trips;
    let share = |part: f64| ratio(part, trips).map(|r| r * 100.0);

    let weighted_dar = ratio(totals.drive_alone_trips, trips);

    DerivedRatios {
        weighted_dar,
        unweighted_dar: totals.avg_site_dar,
        ndat: weighted_dar.map(|w| 1.0 - w),
        mode_shares: ModeShares {
            drive_alone: weighted_dar.map(|w| w * 100.0),
            transit: share(totals.bus_trips + totals.train_trips),
            carpool: share(totals.carpool_trips + totals.vanpool_trips),
            active: share(totals.walk_trips + totals.bike_trips),
            telework: share(totals.telework_days),
        },
        da_trips_per_day: weighted_dar.map(|w| totals.total_employees * w),
        overall_response_rate: ratio(totals.surveys_returned, totals.total_employees),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Location;
    use crate::record::fixtures::{worksite, worksite_with_trips};

    fn all_of(records: &[WorksiteRecord]) -> CycleFilter {
        CycleFilter::new(records.iter().map(|r| r.cycle.clone()), Location::ALL)
    }

    #[test]
    fn test_weighted_dar_example() {
        let records = vec![
            worksite_with_trips("2021/2022", Location::Downtown, 100.0, 60.0),
            worksite_with_trips("2021/2022", Location::Downtown, 50.0, 20.0),
            worksite_with_trips("2021/2022", Location::OutsideDowntown, 200.0, 150.0),
        ];
        let report = summarize(&records, &all_of(&records)).unwrap();

        assert_eq!(report.summaries.len(), 1);
        let ratios = report.summaries[0].ratios;
        assert_eq!(ratios.weighted_dar, Some(230.0 / 350.0));
        assert!((ratios.weighted_dar.unwrap() - 0.6571).abs() < 1e-4);
    }

    #[test]
    fn test_unweighted_dar_uses_site_rates() {
        let mut a = worksite_with_trips("2021/2022", Location::Downtown, 100.0, 60.0);
        let mut b = worksite_with_trips("2021/2022", Location::Downtown, 50.0, 20.0);
        // reported rates deliberately differ from trips-based rates
        a.drive_alone_rate = 0.5;
        b.drive_alone_rate = 0.3;
        let records = vec![a, b];
        let report = summarize(&records, &all_of(&records)).unwrap();

        let unweighted = report.summaries[0].ratios.unweighted_dar.unwrap();
        assert!((unweighted - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_ndat_complements_weighted_dar() {
        let records = vec![
            worksite_with_trips("2019/2020", Location::Downtown, 300.0, 123.0),
            worksite_with_trips("2021/2022", Location::Downtown, 70.0, 61.0),
            worksite_with_trips("2023/2024", Location::Downtown, 9.0, 1.0),
        ];
        let report = summarize(&records, &all_of(&records)).unwrap();

        for s in &report.summaries {
            let w = s.ratios.weighted_dar.unwrap();
            let ndat = s.ratios.ndat.unwrap();
            assert!((w + ndat - 1.0).abs() <= f64::EPSILON);
            assert!((0.0..=1.0).contains(&w));
        }
    }

    #[test]
    fn test_mode_shares() {
        let records = vec![worksite("2021/2022", Location::Downtown, "Acme")];
        let report = summarize(&records, &all_of(&records)).unwrap();
        let ratios = report.summaries[0].ratios;
        let shares = ratios.mode_shares;

        assert!((shares.drive_alone.unwrap() - ratios.weighted_dar.unwrap() * 100.0).abs() < 1e-9);
        assert!((shares.transit.unwrap() - 15.0).abs() < 1e-9);
        assert!((shares.carpool.unwrap() - 10.0).abs() < 1e-9);
        assert!((shares.active.unwrap() - 5.0).abs() < 1e-9);
        assert!((shares.telework.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_da_trips_and_response_rate() {
        let records = vec![
            worksite("2021/2022", Location::Downtown, "Acme"),
            worksite("2021/2022", Location::OutsideDowntown, "Globex"),
        ];
        let report = summarize(&records, &all_of(&records)).unwrap();
        let s = &report.summaries[0];

        assert_eq!(s.totals.worksites, 2);
        assert_eq!(s.totals.total_employees, 40.0);
        // 40 employees at 60% weighted DAR
        assert!((s.ratios.da_trips_per_day.unwrap() - 24.0).abs() < 1e-9);
        // 24 surveys over 40 employees
        assert!((s.ratios.overall_response_rate.unwrap() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_zero_trips_yield_undefined_ratios() {
        let records = vec![worksite_with_trips("2021/2022", Location::Downtown, 0.0, 0.0)];
        let report = summarize(&records, &all_of(&records)).unwrap();
        let ratios = report.summaries[0].ratios;

        assert_eq!(ratios.weighted_dar, None);
        assert_eq!(ratios.ndat, None);
        assert_eq!(ratios.mode_shares.transit, None);
        assert_eq!(ratios.da_trips_per_day, None);
        // unaffected fields stay usable
        assert!(ratios.unweighted_dar.is_some());
        assert!(ratios.overall_response_rate.is_some());
    }

    #[test]
    fn test_groups_in_chronological_order() {
        let records = vec![
            worksite("2023/2024", Location::Downtown, "A"),
            worksite("1993/1994", Location::Downtown, "B"),
            worksite("2007/2008", Location::Downtown, "C"),
        ];
        let groups = aggregate_by_cycle(&records);
        let labels: Vec<_> = groups.iter().map(|(c, _)| c.label()).collect();
        assert_eq!(labels, vec!["1993/1994", "2007/2008", "2023/2024"]);
    }

    #[test]
    fn test_filter_by_cycle_and_location() {
        let records = vec![
            worksite("2021/2022", Location::Downtown, "A"),
            worksite("2021/2022", Location::OutsideDowntown, "B"),
            worksite("2019/2020", Location::Downtown, "C"),
        ];
        let filter = CycleFilter::new(
            ["2021/2022".parse().unwrap()],
            [Location::Downtown],
        );
        let filtered = filter_records(&records, &filter).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].organization, "A");
    }

    #[test]
    fn test_empty_filter_result() {
        let records = vec![worksite("2021/2022", Location::Downtown, "A")];
        let filter = CycleFilter::new(
            ["2021/2022".parse().unwrap()],
            [Location::OutsideDowntown],
        );
        let err = summarize(&records, &filter).unwrap_err();
        assert!(matches!(err, MetricsError::EmptyResult { .. }));
    }

    #[test]
    fn test_summarize_is_deterministic() {
        let records = vec![
            worksite("2021/2022", Location::Downtown, "A"),
            worksite("2019/2020", Location::OutsideDowntown, "B"),
        ];
        let filter = all_of(&records);
        assert_eq!(
            summarize(&records, &filter).unwrap(),
            summarize(&records, &filter).unwrap()
        );
    }
}
