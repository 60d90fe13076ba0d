//! The reporting facade: the parsed dataset, its cycle catalog and the
//! summary cache, served to holders of an active session.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::analyzers::aggregate::summarize;
use crate::analyzers::types::{CycleFilter, CycleReport};
use crate::cache::SummaryCache;
use crate::cycle::CycleCatalog;
use crate::error::DashboardError;
use crate::parser::{parse_records, report_issues};
use crate::record::{Location, WorksiteRecord};
use crate::session::Session;

pub struct Dashboard {
    records: Vec<WorksiteRecord>,
    catalog: CycleCatalog,
    cache: SummaryCache,
    fingerprint: Option<String>,
}

/// Whether [`Dashboard::refresh`] replaced the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    Unchanged,
    Reloaded { records: usize },
}

impl Dashboard {
    pub fn new(records: Vec<WorksiteRecord>, cache_ttl: Duration) -> Self {
        let catalog = CycleCatalog::from_records(&records);
        Self {
            records,
            catalog,
            cache: SummaryCache::new(cache_ttl),
            fingerprint: None,
        }
    }

    /// Parses raw dataset bytes into a dashboard.
    pub fn from_bytes(bytes: &[u8], cache_ttl: Duration) -> Result<Self, DashboardError> {
        let mut dashboard = Self::new(Vec::new(), cache_ttl);
        dashboard.refresh(bytes)?;
        Ok(dashboard)
    }

    /// Replaces the dataset if `bytes` differ from what was loaded last.
    ///
    /// A reload clears the summary cache. A dataset that fails to parse leaves
    /// the current one in place.
    pub fn refresh(&mut self, bytes: &[u8]) -> Result<Refresh, DashboardError> {
        let fingerprint = hex::encode(Sha256::digest(bytes));
        if self.fingerprint.as_deref() == Some(fingerprint.as_str()) {
            debug!(%fingerprint, "Dataset unchanged");
            return Ok(Refresh::Unchanged);
        }

        let records = parse_records(bytes)?;
        let flagged = report_issues(&records);

        self.catalog = CycleCatalog::from_records(&records);
        self.records = records;
        self.cache.clear();
        self.fingerprint = Some(fingerprint);

        info!(
            records = self.records.len(),
            cycles = self.catalog.len(),
            flagged,
            "Dataset loaded"
        );
        Ok(Refresh::Reloaded {
            records: self.records.len(),
        })
    }

    pub fn catalog(&self) -> &CycleCatalog {
        &self.catalog
    }

    pub fn records(&self) -> &[WorksiteRecord] {
        &self.records
    }

    /// Every cycle, both locations.
    pub fn default_filter(&self) -> CycleFilter {
        CycleFilter {
            cycles: self.catalog.all(),
            locations: Location::ALL.into_iter().collect(),
        }
    }

    /// The report for `filter`, from cache when still fresh.
    pub fn report(
        &mut self,
        session: &Session,
        filter: &CycleFilter,
    ) -> Result<Arc<CycleReport>, DashboardError> {
        self.report_at(session, filter, Instant::now())
    }

    pub fn report_at(
        &mut self,
        session: &Session,
        filter: &CycleFilter,
        now: Instant,
    ) -> Result<Arc<CycleReport>, DashboardError> {
        session.ensure_active(Utc::now())?;

        if let Some(report) = self.cache.get(filter, now) {
            debug!(user = session.username(), "Summary served from cache");
            return Ok(report);
        }

        let report = Arc::new(summarize(&self.records, filter)?);
        self.cache.insert(filter.clone(), Arc::clone(&report), now);
        debug!(
            user = session.username(),
            cached = self.cache.len(),
            "Summary computed"
        );
        Ok(report)
    }
}
