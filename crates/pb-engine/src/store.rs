//! # Report Store
//!
//! Owns the canonical snapshot of every report and the active filter, and
//! derives the filtered view from the two. The snapshot is only ever
//! replaced wholesale by [`ReportStore::refresh`]; nothing patches it in
//! place.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use pb_core::filter;
use pb_core::record::{decode_report, field};
use pb_core::{Direction, DocumentStore, FilterCriteria, Query, Report, ReportId, Result};
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

/// The filtered view published to readers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportView {
    pub criteria: FilterCriteria,
    /// Size of the full snapshot the view was derived from.
    pub total: usize,
    pub reports: Vec<Report>,
}

#[derive(Default)]
struct StoreState {
    snapshot: Arc<Vec<Report>>,
    criteria: FilterCriteria,
    /// Ticket of the refresh that produced `snapshot`.
    applied: u64,
}

pub struct ReportStore {
    documents: Arc<dyn DocumentStore>,
    collection: String,
    state: RwLock<StoreState>,
    tickets: AtomicU64,
    view_tx: watch::Sender<Arc<ReportView>>,
}

impl ReportStore {
    pub fn new(documents: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        let (view_tx, _) = watch::channel(Arc::new(ReportView::default()));
        Self {
            documents,
            collection: collection.into(),
            state: RwLock::new(StoreState::default()),
            tickets: AtomicU64::new(0),
            view_tx,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub(crate) fn documents(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.documents)
    }

    /// Fetches the whole collection, newest first, and replaces the snapshot.
    ///
    /// On failure the last good snapshot is kept and the error is returned;
    /// there is no automatic retry. Records that cannot be decoded are
    /// skipped. If a refresh that started later has already been applied,
    /// this result is dropped and the newer snapshot is returned instead.
    pub async fn refresh(&self) -> Result<Arc<Vec<Report>>> {
        let ticket = self.tickets.fetch_add(1, Ordering::SeqCst) + 1;
        let query = Query::new().order_by(field::CREATED_AT, Direction::Descending);

        let documents = match self.documents.query(&self.collection, &query).await {
            Ok(docs) => docs,
            Err(err) => {
                warn!(%err, collection = %self.collection, "refresh failed, keeping last snapshot");
                return Err(err);
            }
        };

        let fetched = documents.len();
        let mut reports: Vec<Report> = documents
            .iter()
            .filter_map(|doc| match decode_report(doc) {
                Ok(report) => Some(report),
                Err(err) => {
                    warn!(%err, "skipping malformed report record");
                    None
                }
            })
            .collect();
        newest_first(&mut reports);

        let mut state = self.state.write().await;
        if ticket < state.applied {
            debug!(ticket, applied = state.applied, "dropping stale refresh result");
            return Ok(Arc::clone(&state.snapshot));
        }
        state.applied = ticket;
        state.snapshot = Arc::new(reports);
        self.publish(&state);

        info!(
            collection = %self.collection,
            fetched,
            kept = state.snapshot.len(),
            "report snapshot refreshed"
        );
        Ok(Arc::clone(&state.snapshot))
    }

    /// The current canonical snapshot.
    pub async fn snapshot(&self) -> Arc<Vec<Report>> {
        Arc::clone(&self.state.read().await.snapshot)
    }

    pub async fn find(&self, id: &ReportId) -> Option<Report> {
        self.state
            .read()
            .await
            .snapshot
            .iter()
            .find(|r| &r.id == id)
            .cloned()
    }

    /// Applies `criteria` to the current snapshot without changing the active filter.
    pub async fn get_filtered(&self, criteria: &FilterCriteria) -> Vec<Report> {
        let snapshot = self.snapshot().await;
        filter::apply(&snapshot, criteria)
    }

    /// Replaces the active filter and recomputes the view.
    pub async fn set_criteria(&self, criteria: FilterCriteria) -> Arc<ReportView> {
        let mut state = self.state.write().await;
        state.criteria = criteria;
        self.publish(&state)
    }

    pub async fn reset_criteria(&self) -> Arc<ReportView> {
        self.set_criteria(FilterCriteria::default()).await
    }

    pub async fn criteria(&self) -> FilterCriteria {
        self.state.read().await.criteria.clone()
    }

    /// The most recently derived view.
    pub fn view(&self) -> Arc<ReportView> {
        Arc::clone(&self.view_tx.borrow())
    }

    /// Receives a new view every time the snapshot or the active filter changes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ReportView>> {
        self.view_tx.subscribe()
    }

    fn publish(&self, state: &StoreState) -> Arc<ReportView> {
        let view = Arc::new(ReportView {
            criteria: state.criteria.clone(),
            total: state.snapshot.len(),
            reports: filter::apply(&state.snapshot, &state.criteria),
        });
        // send_replace never fails, even with no live receivers
        self.view_tx.send_replace(Arc::clone(&view));
        view
    }
}

/// Orders by the decoded creation time, newest first, undated last.
///
/// The backend ordering only sees raw field values, which mix RFC 3339
/// strings, epoch millis and `{seconds, nanoseconds}` objects.
pub(crate) fn newest_first(reports: &mut [Report]) {
    reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
