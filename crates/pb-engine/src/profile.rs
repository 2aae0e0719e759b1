//! Owner dashboard: the signed-in member's own reports with status counts.

use pb_core::record::{decode_report, field};
use pb_core::{
    AuthorizationError, Direction, Identity, Query, Report, ReportStatus, Result, UserId,
};
use tracing::warn;

use crate::store::{newest_first, ReportStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Lost,
    Found,
}

impl StatusFilter {
    fn accepts(self, status: ReportStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Lost => status == ReportStatus::Lost,
            StatusFilter::Found => status == ReportStatus::Found,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportStats {
    pub total: usize,
    pub lost: usize,
    pub found: usize,
}

impl ReportStats {
    pub fn of<'a>(reports: impl IntoIterator<Item = &'a Report>) -> Self {
        reports
            .into_iter()
            .fold(ReportStats::default(), |mut stats, report| {
                stats.total += 1;
                match report.status {
                    ReportStatus::Lost => stats.lost += 1,
                    ReportStatus::Found => stats.found += 1,
                }
                stats
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OwnerDashboard {
    pub owner: UserId,
    /// Newest first.
    pub reports: Vec<Report>,
}

impl OwnerDashboard {
    pub fn stats(&self) -> ReportStats {
        ReportStats::of(&self.reports)
    }

    pub fn filtered(&self, status: StatusFilter) -> Vec<&Report> {
        self.reports
            .iter()
            .filter(|r| status.accepts(r.status))
            .collect()
    }
}

impl ReportStore {
    /// Loads the reports filed by `identity`, straight from the document store.
    /// The shared snapshot is left untouched.
    pub async fn owned_by(&self, identity: Option<&Identity>) -> Result<OwnerDashboard> {
        let identity = identity.ok_or(AuthorizationError::NotAuthenticated)?;
        let query = Query::new()
            .filter_eq(field::OWNER_ID, identity.id.0.clone())
            .order_by(field::CREATED_AT, Direction::Descending);

        let documents = self.documents().query(self.collection(), &query).await?;
        let mut reports: Vec<Report> = documents
            .iter()
            .filter_map(|doc| {
                decode_report(doc)
                    .map_err(|err| warn!(%err, "skipping malformed report record"))
                    .ok()
            })
            .collect();
        newest_first(&mut reports);

        Ok(OwnerDashboard {
            owner: identity.id.clone(),
            reports,
        })
    }
}
