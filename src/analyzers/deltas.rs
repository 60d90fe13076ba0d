use crate::analyzers::types::{BaselineDeltas, CycleSummary};
use crate::cycle::{FRAMEWORK_BASELINE, PROGRAM_BASELINE};

/// How many positions back the long-range comparison looks.
pub const LONG_RANGE_LAG: usize = 5;

/// Computes the weighted-DAR deltas of every summary row.
///
/// `summaries` must be in chronological order. "Prior" and "five cycles
/// back" are positions within `summaries`, so a filtered-out cycle shifts
/// them. A baseline cycle missing from `summaries` leaves its delta `None`.
pub fn derive_baseline_deltas(summaries: &[CycleSummary]) -> Vec<BaselineDeltas> {
    let dar: Vec<Option<f64>> = summaries.iter().map(|s| s.ratios.weighted_dar).collect();

    let baseline = |label: &str| {
        summaries
            .iter()
            .position(|s| s.cycle.is(label))
            .map(|i| dar[i])
    };
    let from_1993 = baseline(PROGRAM_BASELINE);
    let from_2007 = baseline(FRAMEWORK_BASELINE);

    (0..summaries.len())
        .map(|i| BaselineDeltas {
            from_1993: from_1993.and_then(|base| diff(dar[i], base)),
            from_2007: from_2007.and_then(|base| diff(dar[i], base)),
            from_prior: lagged(&dar, i, 1),
            from_five_cycles: lagged(&dar, i, LONG_RANGE_LAG),
        })
        .collect()
}

fn lagged(dar: &[Option<f64>], index: usize, lag: usize) -> Option<f64> {
    let earlier = index.checked_sub(lag)?;
    diff(dar[index], dar[earlier])
}

fn diff(current: Option<f64>, base: Option<f64>) -> Option<f64> {
    Some(current? - base?)
}
