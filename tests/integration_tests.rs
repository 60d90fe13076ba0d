use std::io::Write;
use std::time::Duration;

use ctr_dashboard::analyzers::compliance::{DEFAULT_RESPONSE_THRESHOLD, response_compliance};
use ctr_dashboard::analyzers::headline::headline_kpis;
use ctr_dashboard::analyzers::impact::{ImpactParams, estimate_impact};
use ctr_dashboard::analyzers::targets::{TargetParams, goal_gap, tmp_target};
use ctr_dashboard::analyzers::types::CycleFilter;
use ctr_dashboard::analyzers::worksites::rank_worksites;
use ctr_dashboard::dashboard::Dashboard;
use ctr_dashboard::error::{DashboardError, MetricsError};
use ctr_dashboard::output::{render_summary_table, write_export};
use ctr_dashboard::parser::parse_records;
use ctr_dashboard::record::Location;
use ctr_dashboard::session::{CredentialStore, Session};
use flate2::Compression;
use flate2::write::GzEncoder;

const SAMPLE: &[u8] = include_bytes!("fixtures/ctr_sample.csv");

fn close(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-9
}

fn session() -> Session {
    CredentialStore::default()
        .with_user("analyst", "commute")
        .sign_in("analyst", "commute", chrono::Duration::minutes(30))
        .expect("Failed to sign in")
}

fn dashboard() -> Dashboard {
    Dashboard::from_bytes(SAMPLE, Duration::from_secs(60)).expect("Failed to load sample")
}

#[test]
fn test_full_pipeline() {
    let mut dashboard = dashboard();
    let filter = dashboard.default_filter();
    let report = dashboard.report(&session(), &filter).unwrap();

    let labels: Vec<&str> = report.summaries.iter().map(|s| s.cycle.label()).collect();
    assert_eq!(
        labels,
        [
            "1993/1994",
            "2007/2008",
            "2015/2016",
            "2017/2018",
            "2019/2020",
            "2021/2022"
        ]
    );

    let latest = report.latest().unwrap();
    assert_eq!(latest.totals.worksites, 2);
    assert!(close(latest.ratios.weighted_dar.unwrap(), 0.40));
    assert!(close(latest.ratios.unweighted_dar.unwrap(), 0.40));
    assert!(close(latest.ratios.ndat.unwrap(), 0.60));
    assert!(close(latest.ratios.overall_response_rate.unwrap(), 0.57));
    assert!(close(latest.totals.avg_vmt_per_employee.unwrap(), 10.0));

    assert!(close(latest.deltas.from_1993.unwrap(), -0.40));
    assert!(close(latest.deltas.from_2007.unwrap(), -0.30));
    assert!(close(latest.deltas.from_prior.unwrap(), -0.10));
    assert!(close(latest.deltas.from_five_cycles.unwrap(), -0.40));

    let first = report.first().unwrap();
    assert_eq!(first.deltas.from_prior, None);
    assert!(close(first.deltas.from_1993.unwrap(), 0.0));
}

#[test]
fn test_blank_cells_are_skipped_in_sums() {
    let records = parse_records(SAMPLE).unwrap();
    assert_eq!(records.len(), 12);

    let mut dashboard = dashboard();
    let filter = dashboard.default_filter();
    let report = dashboard.report(&session(), &filter).unwrap();
    let cycle = "2019/2020".parse().unwrap();

    assert!(close(report.find(&cycle).unwrap().totals.yearly_ghg_tons, 32.0));
}

#[test]
fn test_location_filter_and_missing_baseline() {
    let mut dashboard = dashboard();
    let session = session();

    let downtown = CycleFilter::new(dashboard.catalog().all(), [Location::Downtown]);
    let report = dashboard.report(&session, &downtown).unwrap();
    let latest = report.latest().unwrap();
    assert!(close(latest.ratios.weighted_dar.unwrap(), 0.30));
    assert!(close(latest.deltas.from_1993.unwrap(), -0.40));

    let recent = CycleFilter::new(
        ["2019/2020".parse().unwrap(), "2021/2022".parse().unwrap()],
        Location::ALL,
    );
    let report = dashboard.report(&session, &recent).unwrap();
    let latest = report.latest().unwrap();
    assert_eq!(latest.deltas.from_1993, None);
    assert_eq!(latest.deltas.from_2007, None);
    assert_eq!(latest.deltas.from_five_cycles, None);
    assert!(close(latest.deltas.from_prior.unwrap(), -0.10));
}

#[test]
fn test_unknown_cycle_yields_empty_result() {
    let mut dashboard = dashboard();
    let filter = CycleFilter::new(["2025/2026".parse().unwrap()], Location::ALL);

    assert!(matches!(
        dashboard.report(&session(), &filter),
        Err(DashboardError::Metrics(MetricsError::EmptyResult { .. }))
    ));
}

#[test]
fn test_gzip_dataset_matches_plain() {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(SAMPLE).unwrap();
    let compressed = encoder.finish().unwrap();

    // blank cells parse as NaN, so compare debug output rather than PartialEq
    assert_eq!(
        format!("{:?}", parse_records(&compressed).unwrap()),
        format!("{:?}", parse_records(SAMPLE).unwrap())
    );
}

#[test]
fn test_targets_compliance_and_impact() {
    let mut dashboard = dashboard();
    let filter = dashboard.default_filter();
    let report = dashboard.report(&session(), &filter).unwrap();

    let params = TargetParams::default();
    let target = tmp_target(&report.summaries, &params).unwrap();
    assert_eq!(target.cycles.len(), 3);
    assert!(close(target.average_unweighted_dar, (0.55 + 0.50 + 0.40) / 3.0));
    assert!(close(
        target.recommended_target,
        target.average_unweighted_dar * 0.95
    ));

    let gap = goal_gap(&report.summaries, &params).unwrap();
    assert!(gap.gap.abs() < 1e-9);

    let compliance = response_compliance(&report, DEFAULT_RESPONSE_THRESHOLD).unwrap();
    assert_eq!(compliance.cycle.label(), "2021/2022");
    assert_eq!(compliance.total_sites, 2);
    assert_eq!(compliance.sites_meeting_threshold, 1);

    let impact = estimate_impact(&report.summaries, &ImpactParams::default()).unwrap();
    assert!((impact.daily_trips_reduced - 40.0).abs() < 1e-6);
    assert!((impact.annual_vmt_reduced - 100_000.0).abs() < 1e-6);
    assert!((impact.gallons_saved - 4_000.0).abs() < 1e-6);

    let headline = headline_kpis(&report.summaries).unwrap();
    assert_eq!(headline.baseline_cycle.label(), "1993/1994");
    assert_eq!(headline.worksite_change, 0);
    assert!(close(headline.dar_change_pct.unwrap(), -50.0));
}

#[test]
fn test_worksite_ranking() {
    let records = parse_records(SAMPLE).unwrap();
    let cycle = "2021/2022".parse().unwrap();
    let ranking = rank_worksites(&records, &cycle, 1);

    assert_eq!(ranking.top[0].organization, "Harbor Medical Center");
    assert_eq!(ranking.bottom[0].organization, "Eastside Logistics");
    assert!(close(ranking.median_dar.unwrap(), 0.40));
}

#[test]
fn test_export_and_table() {
    let mut dashboard = dashboard();
    let filter = dashboard.default_filter();
    let report = dashboard.report(&session(), &filter).unwrap();

    let mut buf = Vec::new();
    write_export(&mut buf, &report.summaries).unwrap();
    let csv = String::from_utf8(buf).unwrap();
    let mut lines = csv.lines();

    assert_eq!(
        lines.next().unwrap(),
        "Survey_Cycle,Worksites,Total_Employees,Weighted_DAR,Unweighted_DAR,NDAT,\
         Avg_VMT_per_Employee,DA_Trips_PerDay,Overall_Response_Rate,Total_Weekly_Trips"
    );
    assert_eq!(lines.count(), 6);

    let table = render_summary_table(&report.summaries);
    assert!(table.contains("1993/1994"));
    assert!(table.contains("2021/2022"));
}
