//! Error types shared by the parser, the aggregator and the dashboard facade.

use thiserror::Error;

/// The dataset does not have the shape the aggregator needs.
///
/// Always fatal: no summary is produced from a dataset that fails here.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    #[error("required column `{0}` is missing from the dataset")]
    MissingColumn(String),

    #[error("row {row}: {message}")]
    InvalidValue { row: u64, message: String },

    #[error("`{0}` is not a survey cycle label (expected YYYY/YYYY)")]
    InvalidCycle(String),

    #[error("`{0}` is not a known location (expected DT or ODT)")]
    InvalidLocation(String),

    #[error("dataset could not be read: {0}")]
    Unreadable(String),
}

/// Failures of the cycle metrics pipeline.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MetricsError {
    /// The filter matched no records. Expected; the caller should show a "no data" state.
    #[error("no worksite records match cycles [{cycles}] and locations [{locations}]")]
    EmptyResult { cycles: String, locations: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Sign-in and session failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("both username and password are required")]
    MissingField,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("session for `{0}` has expired, sign in again")]
    Expired(String),
}

/// Errors surfaced by [`crate::dashboard::Dashboard`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DashboardError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

impl From<SchemaError> for DashboardError {
    fn from(err: SchemaError) -> Self {
        DashboardError::Metrics(MetricsError::Schema(err))
    }
}
