//! Output formatting and persistence for cycle reports.
//!
//! Supports the CSV summary export, JSON serialization and plain-text tables.

use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;
use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::analyzers::compliance::ResponseCompliance;
use crate::analyzers::headline::HeadlineKpis;
use crate::analyzers::impact::ImpactEstimate;
use crate::analyzers::targets::{GoalGap, TmpTarget};
use crate::analyzers::types::CycleSummary;
use crate::analyzers::worksites::{WorksiteRanking, WorksiteStanding};

/// One row of the summary export. Undefined ratios are written as empty cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "Survey_Cycle")]
    pub cycle: String,
    #[serde(rename = "Worksites")]
    pub worksites: usize,
    #[serde(rename = "Total_Employees")]
    pub total_employees: f64,
    #[serde(rename = "Weighted_DAR")]
    pub weighted_dar: Option<f64>,
    #[serde(rename = "Unweighted_DAR")]
    pub unweighted_dar: Option<f64>,
    #[serde(rename = "NDAT")]
    pub ndat: Option<f64>,
    #[serde(rename = "Avg_VMT_per_Employee")]
    pub avg_vmt_per_employee: Option<f64>,
    #[serde(rename = "DA_Trips_PerDay")]
    pub da_trips_per_day: Option<f64>,
    #[serde(rename = "Overall_Response_Rate")]
    pub overall_response_rate: Option<f64>,
    #[serde(rename = "Total_Weekly_Trips")]
    pub total_weekly_trips: f64,
}

impl From<&CycleSummary> for ExportRow {
    fn from(s: &CycleSummary) -> Self {
        ExportRow {
            cycle: s.cycle.to_string(),
            worksites: s.totals.worksites,
            total_employees: s.totals.total_employees,
            weighted_dar: s.ratios.weighted_dar,
            unweighted_dar: s.ratios.unweighted_dar,
            ndat: s.ratios.ndat,
            avg_vmt_per_employee: s.totals.avg_vmt_per_employee,
            da_trips_per_day: s.ratios.da_trips_per_day,
            overall_response_rate: s.ratios.overall_response_rate,
            total_weekly_trips: s.totals.total_weekly_trips,
        }
    }
}

/// File name the export is saved under on `date`.
pub fn default_export_name(date: NaiveDate) -> String {
    format!("ctr_official_summary_{}.csv", date.format("%Y%m%d"))
}

/// Writes one export row per summary, with a header.
pub fn write_export<W: Write>(writer: W, summaries: &[CycleSummary]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);
    for summary in summaries {
        writer.serialize(ExportRow::from(summary))?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the export to `path`, replacing any existing file.
pub fn export_to_path(path: &str, summaries: &[CycleSummary]) -> Result<()> {
    debug!(path, rows = summaries.len(), "Writing summary export");
    let file = File::create(path)?;
    write_export(file, summaries)?;
    info!(path, rows = summaries.len(), "Summary exported");
    Ok(())
}

/// Logs any report value using Rust's debug pretty-print format.
pub fn print_pretty<T: std::fmt::Debug>(value: &T) {
    debug!("{:#?}", value);
}

pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// `0.123` for ratios, `n/a` when undefined.
pub fn fmt_ratio(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.3}"))
}

/// `12.3%` from a 0–1 fraction.
pub fn fmt_pct(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.1}%", v * 100.0))
}

/// `+0.012` for signed deltas.
pub fn fmt_delta(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:+.3}"))
}

/// `12,345` with thousands separators and no decimals.
pub fn fmt_count(value: f64) -> String {
    if !value.is_finite() {
        return "n/a".to_string();
    }
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0 {
        out.insert(0, '-');
    }
    out
}

fn fmt_decimal(value: Option<f64>, places: usize) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.places$}"))
}

/// Plain-text version of the export table.
pub fn render_summary_table(summaries: &[CycleSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10} {:>9} {:>10} {:>8} {:>8} {:>8} {:>8} {:>10} {:>8} {:>8} {:>12}",
        "Cycle",
        "Worksites",
        "Employees",
        "W-DAR",
        "U-DAR",
        "NDAT",
        "VMT/Emp",
        "DA/Day",
        "Resp",
        "vs Prior",
        "Weekly Trips"
    );
    for s in summaries {
        let _ = writeln!(
            out,
            "{:<10} {:>9} {:>10} {:>8} {:>8} {:>8} {:>8} {:>10} {:>8} {:>8} {:>12}",
            s.cycle.label(),
            s.totals.worksites,
            fmt_count(s.totals.total_employees),
            fmt_ratio(s.ratios.weighted_dar),
            fmt_ratio(s.ratios.unweighted_dar),
            fmt_ratio(s.ratios.ndat),
            fmt_decimal(s.totals.avg_vmt_per_employee, 2),
            s.ratios
                .da_trips_per_day
                .map_or_else(|| "n/a".to_string(), fmt_count),
            fmt_ratio(s.ratios.overall_response_rate),
            fmt_delta(s.deltas.from_prior),
            fmt_count(s.totals.total_weekly_trips),
        );
    }
    out
}

/// Mode shares per cycle, in percent of weekly trips.
pub fn render_mode_shares(summaries: &[CycleSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10} {:>11} {:>8} {:>8} {:>8} {:>9}",
        "Cycle", "Drive alone", "Transit", "Carpool", "Active", "Telework"
    );
    for s in summaries {
        let shares = s.ratios.mode_shares;
        let _ = writeln!(
            out,
            "{:<10} {:>11} {:>8} {:>8} {:>8} {:>9}",
            s.cycle.label(),
            fmt_decimal(shares.drive_alone, 1),
            fmt_decimal(shares.transit, 1),
            fmt_decimal(shares.carpool, 1),
            fmt_decimal(shares.active, 1),
            fmt_decimal(shares.telework, 1),
        );
    }
    out
}

fn render_standings(out: &mut String, title: &str, rows: &[WorksiteStanding]) {
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "  {:<40} {:>7} {:>8} {:>10}", "Organization", "DAR", "VMT/Emp", "Employees");
    for row in rows {
        let _ = writeln!(
            out,
            "  {:<40} {:>7} {:>8.2} {:>10}",
            row.organization,
            fmt_pct(Some(row.drive_alone_rate)),
            row.vmt_per_employee,
            fmt_count(row.total_employees),
        );
    }
}

pub fn render_ranking(ranking: &WorksiteRanking) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Worksite performance, {}", ranking.cycle);
    render_standings(&mut out, "Top performers (lowest DAR)", &ranking.top);
    render_standings(&mut out, "Needs support (highest DAR)", &ranking.bottom);
    let _ = writeln!(out, "Median site DAR: {}", fmt_pct(ranking.median_dar));
    out
}

pub fn render_headline(kpis: &HeadlineKpis) -> String {
    let mut out = String::new();
    let pct = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{v:+.1}%"));
    let _ = writeln!(
        out,
        "Latest cycle {} vs. baseline {}",
        kpis.latest_cycle, kpis.baseline_cycle
    );
    let _ = writeln!(
        out,
        "  VMT per employee   {} ({} from baseline)",
        fmt_decimal(kpis.avg_vmt_per_employee, 2),
        pct(kpis.vmt_change_pct)
    );
    let _ = writeln!(
        out,
        "  Weighted DAR       {} ({} from baseline)",
        fmt_pct(kpis.weighted_dar),
        pct(kpis.dar_change_pct)
    );
    let _ = writeln!(out, "  Unweighted DAR     {}", fmt_pct(kpis.unweighted_dar));
    let _ = writeln!(out, "  NDAT               {}", fmt_pct(kpis.ndat));
    let _ = writeln!(
        out,
        "  Employees covered  {} ({} from baseline)",
        fmt_count(kpis.total_employees),
        pct(kpis.employee_change_pct)
    );
    let _ = writeln!(
        out,
        "  Worksites          {} ({:+} from baseline)",
        kpis.worksites, kpis.worksite_change
    );
    let _ = writeln!(
        out,
        "  DA trips per day   {}",
        kpis.da_trips_per_day
            .map_or_else(|| "n/a".to_string(), fmt_count)
    );
    let _ = writeln!(out, "  Response rate      {}", fmt_pct(kpis.overall_response_rate));
    let _ = writeln!(out, "  Change from 2007   {}", fmt_delta(kpis.change_from_2007));
    let _ = writeln!(out, "  Change, 5 cycles   {}", fmt_delta(kpis.change_from_five_cycles));
    out
}

pub fn render_targets(
    target: Option<&TmpTarget>,
    goal: Option<&GoalGap>,
    compliance: Option<&ResponseCompliance>,
    impact: Option<&ImpactEstimate>,
) -> String {
    let mut out = String::new();

    match target {
        Some(t) => {
            let cycles: Vec<_> = t.cycles.iter().map(|c| c.label()).collect();
            let _ = writeln!(out, "TMP zone target ({})", cycles.join(", "));
            let _ = writeln!(
                out,
                "  Average unweighted DAR  {}",
                fmt_pct(Some(t.average_unweighted_dar))
            );
            let _ = writeln!(
                out,
                "  Recommended target      {}",
                fmt_pct(Some(t.recommended_target))
            );
        }
        None => {
            let _ = writeln!(out, "TMP zone target: not enough cycles selected");
        }
    }

    if let Some(g) = goal {
        let _ = writeln!(
            out,
            "DAR goal {}: {} in {} ({} to go)",
            fmt_pct(Some(g.goal)),
            fmt_pct(Some(g.weighted_dar)),
            g.cycle,
            fmt_delta(Some(g.gap))
        );
    }

    if let Some(c) = compliance {
        let _ = writeln!(out, "Survey compliance, {}", c.cycle);
        let _ = writeln!(
            out,
            "  Overall response rate   {}",
            fmt_pct(c.overall_response_rate)
        );
        let _ = writeln!(
            out,
            "  Sites meeting {}      {}/{}",
            fmt_pct(Some(c.threshold)),
            c.sites_meeting_threshold,
            c.total_sites
        );
        let _ = writeln!(out, "  Surveys returned        {}", fmt_count(c.surveys_returned));
    }

    match impact {
        Some(i) => {
            let _ = writeln!(
                out,
                "Environmental impact, {} vs. {}",
                i.latest_cycle, i.baseline_cycle
            );
            let _ = writeln!(out, "  Annual trips reduced    {}", fmt_count(i.annual_trips_reduced));
            let _ = writeln!(out, "  Annual VMT reduced      {}", fmt_count(i.annual_vmt_reduced));
            let _ = writeln!(out, "  Gallons saved           {}", fmt_count(i.gallons_saved));
        }
        None => {
            let _ = writeln!(out, "Environmental impact: needs more than five cycles");
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::aggregate::summarize;
    use crate::analyzers::types::CycleFilter;
    use crate::record::Location;
    use crate::record::fixtures::{worksite, worksite_with_trips};
    use std::fs;
    use std::path::Path;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", std::env::temp_dir().display(), name)
    }

    fn summaries() -> Vec<CycleSummary> {
        let records = vec![
            worksite("2019/2020", Location::Downtown, "A"),
            worksite_with_trips("2021/2022", Location::Downtown, 0.0, 0.0),
        ];
        let filter = CycleFilter::new(records.iter().map(|r| r.cycle.clone()), Location::ALL);
        summarize(&records, &filter).unwrap().summaries
    }

    #[test]
    fn test_export_columns_and_rows() {
        let mut buf = Vec::new();
        write_export(&mut buf, &summaries()).unwrap();
        let content = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = content.lines().collect();

        assert_eq!(
            lines[0],
            "Survey_Cycle,Worksites,Total_Employees,Weighted_DAR,Unweighted_DAR,NDAT,Avg_VMT_per_Employee,DA_Trips_PerDay,Overall_Response_Rate,Total_Weekly_Trips"
        );
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("2019/2020,1,20.0,0.6,"));
    }

    #[test]
    fn test_export_undefined_ratio_is_empty_cell() {
        let mut buf = Vec::new();
        write_export(&mut buf, &summaries()).unwrap();
        let content = String::from_utf8(buf).unwrap();
        let row = content.lines().nth(2).unwrap();

        // weighted DAR and NDAT are undefined without trips
        assert!(row.starts_with("2021/2022,1,20.0,,0.6,,"));
    }

    #[test]
    fn test_export_to_path_overwrites() {
        let path = temp_path("ctr_dashboard_test_export.csv");
        let _ = fs::remove_file(&path);

        export_to_path(&path, &summaries()).unwrap();
        export_to_path(&path, &summaries()).unwrap();

        assert!(Path::new(&path).exists());
        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.contains("Survey_Cycle")).count();
        assert_eq!(header_count, 1);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_default_export_name() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();
        assert_eq!(default_export_name(date), "ctr_official_summary_20260203.csv");
    }

    #[test]
    fn test_formatters() {
        assert_eq!(fmt_ratio(Some(0.65714)), "0.657");
        assert_eq!(fmt_ratio(None), "n/a");
        assert_eq!(fmt_pct(Some(0.4)), "40.0%");
        assert_eq!(fmt_delta(Some(-0.05)), "-0.050");
        assert_eq!(fmt_delta(Some(0.012)), "+0.012");
        assert_eq!(fmt_count(1234567.4), "1,234,567");
        assert_eq!(fmt_count(999.0), "999");
        assert_eq!(fmt_count(-4321.0), "-4,321");
    }

    #[test]
    fn test_render_summary_table_has_row_per_cycle() {
        let table = render_summary_table(&summaries());
        assert_eq!(table.lines().count(), 3);
        assert!(table.contains("2019/2020"));
        assert!(table.contains("n/a"));
    }

    #[test]
    fn test_to_json_uses_null_for_undefined() {
        let json = to_json(&summaries()).unwrap();
        assert!(json.contains("\"weighted_dar\": null"));
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&summaries());
    }
}
