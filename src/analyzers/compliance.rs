use serde::Serialize;

use crate::analyzers::types::CycleReport;
use crate::cycle::SurveyCycle;

/// Minimum site response rate for survey compliance.
pub const DEFAULT_RESPONSE_THRESHOLD: f64 = 0.50;

/// Survey response compliance of a report's latest cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseCompliance {
    pub cycle: SurveyCycle,
    pub threshold: f64,
    pub sites_meeting_threshold: usize,
    pub total_sites: usize,
    pub overall_response_rate: Option<f64>,
    pub surveys_returned: f64,
}

/// Counts sites of the latest cycle whose response rate reaches `threshold`.
///
/// Only the latest cycle is assessed; earlier cycles are not.
pub fn response_compliance(report: &CycleReport, threshold: f64) -> Option<ResponseCompliance> {
    let latest = report.latest()?;

    let mut total_sites = 0;
    let mut sites_meeting_threshold = 0;
    for record in report.records_for(&latest.cycle) {
        total_sites += 1;
        if record.response_rate >= threshold {
            sites_meeting_threshold += 1;
        }
    }

    Some(ResponseCompliance {
        cycle: latest.cycle.clone(),
        threshold,
        sites_meeting_threshold,
        total_sites,
        overall_response_rate: latest.ratios.overall_response_rate,
        surveys_returned: latest.totals.surveys_returned,
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
    fn test_compliance_counts_latest_cycle_only() {
        let mut records = vec![
            worksite("2019/2020", Location::Downtown, "Old"),
            worksite("2021/2022", Location::Downtown, "A"),
            worksite("2021/2022", Location::Downtown, "B"),
            worksite("2021/2022", Location::OutsideDowntown, "C"),
        ];
        records[0].response_rate = 0.9;
        records[1].response_rate = 0.5;
        records[2].response_rate = 0.49;
        records[3].response_rate = 0.8;

        let filter = CycleFilter::new(records.iter().map(|r| r.cycle.clone()), Location::ALL);
        let report = summarize(&records, &filter).unwrap();
        let compliance = response_compliance(&report, DEFAULT_RESPONSE_THRESHOLD).unwrap();

        assert_eq!(compliance.cycle.label(), "2021/2022");
        assert_eq!(compliance.total_sites, 3);
        assert_eq!(compliance.sites_meeting_threshold, 2);
        assert_eq!(compliance.surveys_returned, 36.0);
    }
}
