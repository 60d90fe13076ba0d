//! Cycle metrics aggregation and the analyses built on it.
//!
//! [`aggregate::summarize`] filters worksite records, totals them per survey
//! cycle, derives the official ratios and the baseline deltas. The other
//! modules read the resulting [`types::CycleReport`].

pub mod aggregate;
pub mod compliance;
pub mod deltas;
pub mod headline;
pub mod impact;
pub mod targets;
pub mod types;
pub mod utility;
pub mod worksites;
