use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::cycle::SurveyCycle;
use crate::error::SchemaError;

/// Location category of a worksite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Location {
    #[serde(rename = "DT")]
    Downtown,
    #[serde(rename = "ODT")]
    OutsideDowntown,
}

impl Location {
    pub const ALL: [Location; 2] = [Location::Downtown, Location::OutsideDowntown];

    pub fn code(&self) -> &'static str {
        match self {
            Location::Downtown => "DT",
            Location::OutsideDowntown => "ODT",
        }
    }
}

impl FromStr for Location {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "DT" | "dt" => Ok(Location::Downtown),
            "ODT" | "odt" => Ok(Location::OutsideDowntown),
            other => Err(SchemaError::InvalidLocation(other.to_string())),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Location {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One employer worksite in one survey cycle, as found in the cleaned dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorksiteRecord {
    #[serde(rename = "Survey_Cycle")]
    pub cycle: SurveyCycle,
    #[serde(rename = "Location")]
    pub location: Location,
    #[serde(rename = "Organization_Name")]
    pub organization: String,

    #[serde(rename = "Total_Employees", deserialize_with = "blank_as_nan")]
    pub total_employees: f64,
    #[serde(rename = "VMT_per_Employee", deserialize_with = "blank_as_nan")]
    pub vmt_per_employee: f64,
    /// Site-level rate as reported by the employer, not recomputed from trips.
    #[serde(rename = "Drive_Alone_Rate", deserialize_with = "blank_as_nan")]
    pub drive_alone_rate: f64,

    // weekly trips by mode
    #[serde(rename = "Weekly_Bus_Trips", deserialize_with = "blank_as_nan")]
    pub bus_trips: f64,
    #[serde(rename = "Weekly_Train_Trips", deserialize_with = "blank_as_nan")]
    pub train_trips: f64,
    #[serde(rename = "Weekly_Carpool_Trips", deserialize_with = "blank_as_nan")]
    pub carpool_trips: f64,
    #[serde(rename = "Weekly_Vanpool_Trips", deserialize_with = "blank_as_nan")]
    pub vanpool_trips: f64,
    #[serde(rename = "Weekly_Walk_Trips", deserialize_with = "blank_as_nan")]
    pub walk_trips: f64,
    #[serde(rename = "Weekly_Bike_Trips", deserialize_with = "blank_as_nan")]
    pub bike_trips: f64,
    #[serde(rename = "Weekly_Drive_Alone_Trips", deserialize_with = "blank_as_nan")]
    pub drive_alone_trips: f64,
    #[serde(rename = "Total_Weekly_Trips", deserialize_with = "blank_as_nan")]
    pub total_weekly_trips: f64,
    #[serde(rename = "Weekly_Telework_Days", deserialize_with = "blank_as_nan")]
    pub telework_days: f64,

    // yearly impact
    #[serde(rename = "Yearly_Total_VMT", deserialize_with = "blank_as_nan")]
    pub yearly_vmt: f64,
    #[serde(rename = "Yearly_GHG_Metric_Tons", deserialize_with = "blank_as_nan")]
    pub yearly_ghg_tons: f64,

    // survey response
    #[serde(rename = "Surveys_Returned", deserialize_with = "blank_as_nan")]
    pub surveys_returned: f64,
    #[serde(rename = "Response_Rate", deserialize_with = "blank_as_nan")]
    pub response_rate: f64,
}

/// Blank numeric cells read as NaN and are skipped by the aggregates.
fn blank_as_nan<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(f64::NAN);
    }
    raw.parse().map_err(serde::de::Error::custom)
}

/// Columns every dataset must carry.
pub const REQUIRED_COLUMNS: [&str; 19] = [
    "Survey_Cycle",
    "Location",
    "Organization_Name",
    "Total_Employees",
    "VMT_per_Employee",
    "Drive_Alone_Rate",
    "Weekly_Bus_Trips",
    "Weekly_Train_Trips",
    "Weekly_Carpool_Trips",
    "Weekly_Vanpool_Trips",
    "Weekly_Walk_Trips",
    "Weekly_Bike_Trips",
    "Weekly_Drive_Alone_Trips",
    "Total_Weekly_Trips",
    "Weekly_Telework_Days",
    "Yearly_Total_VMT",
    "Yearly_GHG_Metric_Tons",
    "Surveys_Returned",
    "Response_Rate",
];

/// A data-quality problem found on a single record. Reported, never fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordIssue {
    ModeTripsExceedTotal { mode_trips: f64, total_trips: f64 },
    RateOutOfRange { field: &'static str, value: f64 },
    NegativeCount { field: &'static str, value: f64 },
}

impl fmt::Display for RecordIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordIssue::ModeTripsExceedTotal {
                mode_trips,
                total_trips,
            } => write!(
                f,
                "per-mode trips ({mode_trips}) exceed total weekly trips ({total_trips})"
            ),
            RecordIssue::RateOutOfRange { field, value } => {
                write!(f, "{field} = {value} is outside [0, 1]")
            }
            RecordIssue::NegativeCount { field, value } => write!(f, "{field} = {value} is negative"),
        }
    }
}

impl WorksiteRecord {
    /// Sum of the seven per-mode weekly trip counts.
    pub fn mode_trips(&self) -> f64 {
        self.bus_trips
            + self.train_trips
            + self.carpool_trips
            + self.vanpool_trips
            + self.walk_trips
            + self.bike_trips
            + self.drive_alone_trips
    }

    /// Checks the invariants the cleaned dataset is expected to hold.
    pub fn validate(&self) -> Vec<RecordIssue> {
        let mut issues = Vec::new();

        for (field, value) in [
            ("Drive_Alone_Rate", self.drive_alone_rate),
            ("Response_Rate", self.response_rate),
        ] {
            if value.is_finite() && !(0.0..=1.0).contains(&value) {
                issues.push(RecordIssue::RateOutOfRange { field, value });
            }
        }

        for (field, value) in [
            ("Total_Employees", self.total_employees),
            ("Weekly_Bus_Trips", self.bus_trips),
            ("Weekly_Train_Trips", self.train_trips),
            ("Weekly_Carpool_Trips", self.carpool_trips),
            ("Weekly_Vanpool_Trips", self.vanpool_trips),
            ("Weekly_Walk_Trips", self.walk_trips),
            ("Weekly_Bike_Trips", self.bike_trips),
            ("Weekly_Drive_Alone_Trips", self.drive_alone_trips),
            ("Total_Weekly_Trips", self.total_weekly_trips),
            ("Surveys_Returned", self.surveys_returned),
        ] {
            if value < 0.0 {
                issues.push(RecordIssue::NegativeCount { field, value });
            }
        }

        let mode_trips = self.mode_trips();
        if mode_trips > self.total_weekly_trips {
            issues.push(RecordIssue::ModeTripsExceedTotal {
                mode_trips,
                total_trips: self.total_weekly_trips,
            });
        }

        issues
    }
}
