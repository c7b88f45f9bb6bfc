use std::sync::Arc;

use super::{
    filter_state::FilterState, financial_summary::FinancialSummary, reservation::Reservation,
    reservations_error::ReservationsError,
};

/// Where the reservations currently displayed came from.
#[derive(Debug, Clone, Default)]
pub enum ViewStatus {
    #[default]
    Idle,
    /// Nothing to show yet; a foreground fetch is running.
    Loading,
    /// Cached data, a background refresh is running.
    Cached,
    Fresh,
    /// A refresh failed; the previously displayed reservations are kept.
    Stale(Arc<ReservationsError>),
    /// The foreground fetch failed. The view is empty.
    Failed(Arc<ReservationsError>),
}

/// What the UI renders for the active filter.
#[derive(Debug, Clone, Default)]
pub struct ReservationView {
    /// Filter generation this view belongs to.
    pub generation: u64,
    pub filter: FilterState,
    pub reservations: Vec<Reservation>,
    pub summary: FinancialSummary,
    pub status: ViewStatus,
    pub truncated: bool,
}

impl ViewStatus {
    pub fn error(&self) -> Option<&Arc<ReservationsError>> {
        match self {
            ViewStatus::Stale(e) | ViewStatus::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ViewStatus::Loading)
    }
}

impl ReservationView {
    pub(crate) fn new(
        generation: u64,
        filter: FilterState,
        reservations: Vec<Reservation>,
        status: ViewStatus,
        truncated: bool,
    ) -> Self {
        Self {
            generation,
            summary: FinancialSummary::of(&reservations),
            filter,
            reservations,
            status,
            truncated,
        }
    }
}
