use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{
    data::repositories::reservations_repository_impl::ReservationsRepositoryImpl,
    domain::{
        logic::in_flight::InFlightRequests,
        repositories::reservations_repository::ReservationsRepository,
    },
    entities::{FetchParams, JoinedReservations, ReservationsError},
    errors::RequestTimedOut,
};

/// Outcome handed to every caller of a coalesced fetch.
pub type SharedFetchResult = Result<Arc<JoinedReservations>, Arc<ReservationsError>>;

#[async_trait]
pub(crate) trait FetchReservationsUsecase: Send + Sync {
    /// Fetch-and-join for `params`. Concurrent calls with the same canonical
    /// parameters share one round-trip and receive the same result.
    async fn fetch(&self, params: &FetchParams) -> SharedFetchResult;

    /// Forgets pending requests; later calls start fresh ones.
    fn clear_in_flight(&self);
}

pub(crate) struct FetchReservationsUsecaseImpl<
    R = ReservationsRepositoryImpl, // Default.
> where
    R: ReservationsRepository + 'static,
{
    repository: Arc<R>,
    timeout: Duration,
    in_flight: InFlightRequests<SharedFetchResult>,
}

impl<R: ReservationsRepository + 'static> FetchReservationsUsecaseImpl<R> {
    pub(crate) fn new(repository: R, timeout: Duration) -> Self {
        Self {
            repository: Arc::new(repository),
            timeout,
            in_flight: InFlightRequests::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }
}

#[async_trait]
impl<R> FetchReservationsUsecase for FetchReservationsUsecaseImpl<R>
where
    R: ReservationsRepository + 'static,
{
    async fn fetch(&self, params: &FetchParams) -> SharedFetchResult {
        let repository = Arc::clone(&self.repository);
        let timeout = self.timeout;
        let owned_params = params.clone();
        self.in_flight
            .run(params.canonical_key(), move || async move {
                match tokio::time::timeout(timeout, repository.fetch_joined(&owned_params)).await {
                    Ok(Ok(joined)) => Ok(Arc::new(joined)),
                    Ok(Err(e)) => Err(Arc::new(e)),
                    Err(_) => Err(Arc::new(ReservationsError::Network(RequestTimedOut::new(
                        timeout.as_secs(),
                    )))),
                }
            })
            .await
    }

    fn clear_in_flight(&self) {
        self.in_flight.clear();
    }
}
