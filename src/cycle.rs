//! Survey cycle identifiers and the chronological cycle catalog.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SchemaError;
use crate::record::WorksiteRecord;

/// Cycle the CTR program started with.
pub const PROGRAM_BASELINE: &str = "1993/1994";

/// First cycle of the current state CTR framework.
pub const FRAMEWORK_BASELINE: &str = "2007/2008";

/// A survey cycle such as `2021/2022`.
///
/// Cycles order chronologically by start year, then end year, so that
/// "prior cycle" is a positional notion rather than calendar arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SurveyCycle {
    label: String,
    start_year: u16,
    end_year: u16,
}

impl SurveyCycle {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn start_year(&self) -> u16 {
        self.start_year
    }

    pub fn end_year(&self) -> u16 {
        self.end_year
    }

    /// Returns `true` if this cycle has the given label.
    pub fn is(&self, label: &str) -> bool {
        self.label == label
    }
}

impl FromStr for SurveyCycle {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        let invalid = || SchemaError::InvalidCycle(label.to_string());

        let (start, end) = label.split_once('/').ok_or_else(invalid)?;
        if start.len() != 4 || end.len() != 4 {
            return Err(invalid());
        }
        let start_year: u16 = start.parse().map_err(|_| invalid())?;
        let end_year: u16 = end.parse().map_err(|_| invalid())?;
        if end_year < start_year {
            return Err(invalid());
        }

        Ok(SurveyCycle {
            label: label.to_string(),
            start_year,
            end_year,
        })
    }
}

impl Ord for SurveyCycle {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.start_year, self.end_year, &self.label).cmp(&(
            other.start_year,
            other.end_year,
            &other.label,
        ))
    }
}

impl PartialOrd for SurveyCycle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SurveyCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl Serialize for SurveyCycle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label)
    }
}

impl<'de> Deserialize<'de> for SurveyCycle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The distinct cycles of a dataset in chronological order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleCatalog {
    cycles: Vec<SurveyCycle>,
}

impl CycleCatalog {
    pub fn from_records(records: &[WorksiteRecord]) -> Self {
        let distinct: BTreeSet<SurveyCycle> = records.iter().map(|r| r.cycle.clone()).collect();
        Self {
            cycles: distinct.into_iter().collect(),
        }
    }

    pub fn cycles(&self) -> &[SurveyCycle] {
        &self.cycles
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    pub fn latest(&self) -> Option<&SurveyCycle> {
        self.cycles.last()
    }

    pub fn contains(&self, cycle: &SurveyCycle) -> bool {
        self.cycles.binary_search(cycle).is_ok()
    }

    /// Every cycle in the catalog, as a selection.
    pub fn all(&self) -> BTreeSet<SurveyCycle> {
        self.cycles.iter().cloned().collect()
    }
}
