use async_trait::async_trait;

use crate::entities::{FetchParams, JoinedReservations, ReservationsError};

#[async_trait]
pub(crate) trait ReservationsRepository: Send + Sync {
    /// Fetches every page for `params`, then the financial report for the
    /// returned ids, and joins them. Either both fetches succeed or the
    /// whole call fails.
    async fn fetch_joined(
        &self,
        params: &FetchParams,
    ) -> Result<JoinedReservations, ReservationsError>;
}
