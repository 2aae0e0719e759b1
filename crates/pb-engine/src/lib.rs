//! Client-side state engine for Pawboard.
//!
//! [`ReportStore`] holds the shared report snapshot and the derived,
//! filtered view. [`MutationGateway`] is the only path that writes reports;
//! it refreshes the store after every successful change.

pub mod gateway;
mod inflight;
pub mod profile;
pub mod store;
pub mod uploads;

pub use gateway::{MutationGateway, Receipt, ViewRefresh};
pub use profile::{OwnerDashboard, ReportStats, StatusFilter};
pub use store::{ReportStore, ReportView};
