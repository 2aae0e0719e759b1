//! Per-report guard against overlapping mutations from the same gateway.

use std::sync::Arc;

use dashmap::DashSet;
use pb_core::{AppError, ReportId, Result};

#[derive(Debug, Default, Clone)]
pub(crate) struct InFlight {
    reports: Arc<DashSet<ReportId>>,
}

impl InFlight {
    pub(crate) fn acquire(&self, id: &ReportId) -> Result<InFlightGuard> {
        if !self.reports.insert(id.clone()) {
            return Err(AppError::Conflict(format!(
                "another change to report {id} is still in progress"
            )));
        }
        Ok(InFlightGuard {
            reports: Arc::clone(&self.reports),
            id: id.clone(),
        })
    }
}

/// Releases the report when dropped, including on early error returns.
pub(crate) struct InFlightGuard {
    reports: Arc<DashSet<ReportId>>,
    id: ReportId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.reports.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_conflicts_until_release() {
        let inflight = InFlight::default();
        let id = ReportId::from("r1");
        let guard = inflight.acquire(&id).unwrap();
        assert!(matches!(inflight.acquire(&id), Err(AppError::Conflict(_))));
        assert!(inflight.acquire(&ReportId::from("r2")).is_ok());
        drop(guard);
        assert!(inflight.acquire(&id).is_ok());
    }
}
