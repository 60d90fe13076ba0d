use serde::Serialize;

use crate::analyzers::utility::median;
use crate::cycle::SurveyCycle;
use crate::record::WorksiteRecord;

/// Rows shown per side of the performance table.
pub const DEFAULT_RANKING_LIMIT: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorksiteStanding {
    pub organization: String,
    pub drive_alone_rate: f64,
    pub vmt_per_employee: f64,
    pub total_employees: f64,
}

/// Best and worst worksites of one cycle by site-level DAR.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorksiteRanking {
    pub cycle: SurveyCycle,
    /// Lowest DAR first.
    pub top: Vec<WorksiteStanding>,
    /// Highest DAR first.
    pub bottom: Vec<WorksiteStanding>,
    pub median_dar: Option<f64>,
}

/// Ranks the worksites of `cycle` by reported drive-alone rate.
///
/// Sites without a rate are left out. Ties keep dataset order.
pub fn rank_worksites<'a>(
    records: impl IntoIterator<Item = &'a WorksiteRecord>,
    cycle: &SurveyCycle,
    limit: usize,
) -> WorksiteRanking {
    let mut sites: Vec<&WorksiteRecord> = records
        .into_iter()
        .filter(|r| &r.cycle == cycle && r.drive_alone_rate.is_finite())
        .collect();
    sites.sort_by(|a, b| a.drive_alone_rate.total_cmp(&b.drive_alone_rate));

    let top = sites.iter().take(limit).map(|r| standing(r)).collect();

    // stable reverse: highest first, ties still in dataset order
    let mut descending = sites.clone();
    descending.sort_by(|a, b| b.drive_alone_rate.total_cmp(&a.drive_alone_rate));
    let bottom = descending.iter().take(limit).map(|r| standing(r)).collect();

    WorksiteRanking {
        cycle: cycle.clone(),
        top,
        bottom,
        median_dar: median(sites.iter().map(|r| r.drive_alone_rate)),
    }
}

fn standing(record: &WorksiteRecord) -> WorksiteStanding {
    WorksiteStanding {
        organization: record.organization.clone(),
        drive_alone_rate: record.drive_alone_rate,
        vmt_per_employee: record.vmt_per_employee,
        total_employees: record.total_employees,
    }
}
