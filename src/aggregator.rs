use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use chrono::{Days, NaiveDate, Utc};
use fractic_server_error::ServerError;
use tokio::sync::{watch, Mutex};

use crate::{
    config::AggregatorConfig,
    data::{
        datasources::{
            auth_token_provider::AuthTokenProvider,
            cache_store::{CacheStore, FileCacheStore, MemoryCacheStore},
            reservations_api_datasource::ReservationsApiDatasourceImpl,
        },
        repositories::{
            cache_repository_impl::CacheRepositoryImpl,
            reservations_repository_impl::ReservationsRepositoryImpl,
        },
    },
    domain::{
        logic::filter_engine::apply,
        repositories::cache_repository::CacheRepository,
        usecases::fetch_reservations_usecase::{
            FetchReservationsUsecase, FetchReservationsUsecaseImpl, SharedFetchResult,
        },
    },
    entities::{
        CacheKey, FetchParams, FilterState, JoinedReservations, PropertyFilter, ReservationView,
        ReservationsError, ViewStatus,
    },
};

/// Session-scoped reservation aggregator: owns the in-flight request map,
/// the cache and the currently displayed view. Build one per signed-in
/// session and `dispose()` it on sign-out.
///
/// Clones share the same state.
#[derive(Clone)]
pub struct ReservationAggregator {
    inner: Arc<Inner>,
}

struct Inner {
    config: AggregatorConfig,
    usecase: Box<dyn FetchReservationsUsecase>,
    cache: Box<dyn CacheRepository>,
    generation: AtomicU64,
    view: watch::Sender<ReservationView>,
    /// Generation of the last snapshot written per cache key.
    saved_generations: Mutex<HashMap<String, u64>>,
}

impl ReservationAggregator {
    /// HTTP backend plus the cache configured by `cache_dir` (in memory when
    /// unset).
    pub fn new(
        config: AggregatorConfig,
        token_provider: Arc<dyn AuthTokenProvider>,
    ) -> Result<Self, ServerError> {
        let store: Arc<dyn CacheStore> = match &config.cache_dir {
            Some(dir) => Arc::new(FileCacheStore::new(dir)),
            None => Arc::new(MemoryCacheStore::new()),
        };
        Self::with_cache_store(config, token_provider, store)
    }

    pub fn with_cache_store(
        config: AggregatorConfig,
        token_provider: Arc<dyn AuthTokenProvider>,
        store: Arc<dyn CacheStore>,
    ) -> Result<Self, ServerError> {
        let datasource = ReservationsApiDatasourceImpl::new(
            &config.api_base_url,
            config.request_timeout(),
            token_provider,
        )?;
        let repository =
            ReservationsRepositoryImpl::new(datasource, config.page_limit, config.max_pages);
        let usecase = FetchReservationsUsecaseImpl::new(repository, config.request_timeout());
        Ok(Self::from_parts(
            config,
            usecase,
            CacheRepositoryImpl::new(store),
        ))
    }

    pub(crate) fn from_parts(
        config: AggregatorConfig,
        usecase: impl FetchReservationsUsecase + 'static,
        cache: impl CacheRepository + 'static,
    ) -> Self {
        let (view, _) = watch::channel(ReservationView::default());
        Self {
            inner: Arc::new(Inner {
                config,
                usecase: Box::new(usecase),
                cache: Box::new(cache),
                generation: AtomicU64::new(0),
                view,
                saved_generations: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Makes `filter` the active filter and returns its view.
    ///
    /// With a valid cache entry the cached reservations are returned at once
    /// and a background refresh replaces them when it lands. Without one the
    /// call waits for the network. Either way a completion is only published
    /// while `filter` is still the latest request; the returned view always
    /// describes `filter`.
    pub async fn load_view(&self, filter: FilterState) -> ReservationView {
        let generation = self.inner.next_generation();
        let key = self.inner.cache_key(&filter.property_filter);
        tracing::debug!(generation, key = %key, "loading reservation view");

        if let Some(cached) = self.inner.cache.load(&key).await {
            let view = ReservationView::new(
                generation,
                filter.clone(),
                apply(&cached.reservations, &filter),
                ViewStatus::Cached,
                cached.truncated,
            );
            self.inner.publish(view.clone());
            self.spawn_background_refresh(view.clone());
            return view;
        }

        self.inner.publish(ReservationView::new(
            generation,
            filter.clone(),
            Vec::new(),
            ViewStatus::Loading,
            false,
        ));
        let view = match self.inner.fetch_joined(&filter.property_filter).await {
            Ok(joined) => self.fresh_view(generation, filter, joined),
            Err(e) => {
                tracing::warn!(generation, error = %e, "reservation fetch failed");
                ReservationView::new(generation, filter, Vec::new(), ViewStatus::Failed(e), false)
            }
        };
        self.inner.publish(view.clone());
        view
    }

    /// Re-fetches the active filter from the network. The displayed
    /// reservations stay visible until the new ones arrive, and remain if
    /// the fetch fails.
    pub async fn refresh(&self) -> ReservationView {
        let current = self.current_view();
        let generation = self.inner.next_generation();
        let view = match self.inner.fetch_joined(&current.filter.property_filter).await {
            Ok(joined) => self.fresh_view(generation, current.filter, joined),
            Err(e) => {
                tracing::warn!(generation, error = %e, "reservation refresh failed");
                ReservationView::new(
                    generation,
                    current.filter,
                    current.reservations,
                    ViewStatus::Stale(e),
                    current.truncated,
                )
            }
        };
        self.inner.publish(view.clone());
        view
    }

    /// Raw fetch-and-join, de-duplicated against every other request with
    /// the same parameters. Does not touch the view or the cache.
    pub async fn fetch_reservations(&self, params: &FetchParams) -> SharedFetchResult {
        self.inner.usecase.fetch(params).await
    }

    pub fn current_view(&self) -> ReservationView {
        self.inner.view.borrow().clone()
    }

    /// Receives every published view, including background replacements.
    pub fn subscribe(&self) -> watch::Receiver<ReservationView> {
        self.inner.view.subscribe()
    }

    /// Sign-out. Pending completions are ignored from now on, the in-flight
    /// map is emptied and the view is reset.
    pub fn dispose(&self) {
        let generation = self.inner.next_generation();
        self.inner.usecase.clear_in_flight();
        self.inner.view.send_replace(ReservationView {
            generation,
            ..Default::default()
        });
        tracing::info!("reservation aggregator disposed");
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.inner.config
    }

    fn fresh_view(
        &self,
        generation: u64,
        filter: FilterState,
        joined: Arc<JoinedReservations>,
    ) -> ReservationView {
        self.spawn_cache_save(generation, &filter.property_filter, Arc::clone(&joined));
        let reservations = apply(&joined.reservations, &filter);
        ReservationView::new(
            generation,
            filter,
            reservations,
            ViewStatus::Fresh,
            joined.truncated,
        )
    }

    fn spawn_cache_save(
        &self,
        generation: u64,
        property_filter: &PropertyFilter,
        joined: Arc<JoinedReservations>,
    ) {
        let inner = Arc::clone(&self.inner);
        let key = self.inner.cache_key(property_filter);
        tokio::spawn(async move {
            inner.save_to_cache(generation, &key, &joined).await;
        });
    }

    /// Replaces the `cached` view with a network fetch of the same filter.
    fn spawn_background_refresh(&self, cached: ReservationView) {
        let aggregator = self.clone();
        tokio::spawn(async move {
            let ReservationView {
                generation,
                filter,
                reservations,
                truncated,
                ..
            } = cached;
            let view = match aggregator.inner.fetch_joined(&filter.property_filter).await {
                Ok(joined) => aggregator.fresh_view(generation, filter, joined),
                Err(e) => {
                    tracing::warn!(
                        generation,
                        error = %e,
                        "background refresh failed; keeping cached reservations"
                    );
                    ReservationView::new(
                        generation,
                        filter,
                        reservations,
                        ViewStatus::Stale(e),
                        truncated,
                    )
                }
            };
            aggregator.inner.publish(view);
        });
    }
}

impl Inner {
    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn cache_key(&self, property_filter: &PropertyFilter) -> CacheKey {
        CacheKey::new(&self.config.cache_namespace, property_filter)
    }

    async fn fetch_joined(
        &self,
        property_filter: &PropertyFilter,
    ) -> Result<Arc<JoinedReservations>, Arc<ReservationsError>> {
        self.usecase.fetch(&self.fetch_params(property_filter)).await
    }

    /// The window around today configured for every view. Date filters are
    /// applied afterwards, on the joined list.
    fn fetch_params(&self, property_filter: &PropertyFilter) -> FetchParams {
        let today = Utc::now().date_naive();
        let property_ids = match property_filter {
            PropertyFilter::All => self.config.property_ids.clone(),
            PropertyFilter::Property(id) => vec![id.clone()],
        };
        let mut params = FetchParams::new(
            property_ids,
            today
                .checked_sub_days(Days::new(self.config.window_past_days.into()))
                .unwrap_or(NaiveDate::MIN),
            today
                .checked_add_days(Days::new(self.config.window_future_days.into()))
                .unwrap_or(NaiveDate::MAX),
        );
        params.date_anchor = self.config.date_anchor;
        params
    }

    /// Writes `joined` under `key` unless a snapshot from a later request is
    /// already there. Saves are serialized, so the check and the write cannot
    /// interleave with another save.
    async fn save_to_cache(&self, generation: u64, key: &CacheKey, joined: &JoinedReservations) {
        let mut saved = self.saved_generations.lock().await;
        let key_string = key.as_string();
        if saved.get(&key_string).is_some_and(|&latest| latest > generation) {
            tracing::debug!(generation, key = %key, "skipping cache save older than the cached entry");
            return;
        }
        self.cache.save(key, joined).await;
        saved.insert(key_string, generation);
    }

    /// Publishes `view` unless a newer load (or a dispose) has started since
    /// it was requested.
    fn publish(&self, view: ReservationView) -> bool {
        let generation = view.generation;
        let published = self.view.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *current = view;
            true
        });
        if !published {
            tracing::warn!(generation, "discarding stale reservation completion");
        }
        published
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        entities::{Reservation, SortBy},
        test_utils::{raw_reservation, reservation, FakeFailure, FakeReservationsApi},
    };

    fn aggregator(
        api: &FakeReservationsApi,
        store: Arc<MemoryCacheStore>,
    ) -> ReservationAggregator {
        let config = AggregatorConfig::default();
        let repository =
            ReservationsRepositoryImpl::new(api.clone(), config.page_limit, config.max_pages);
        let usecase = FetchReservationsUsecaseImpl::new(repository, config.request_timeout());
        ReservationAggregator::from_parts(config, usecase, CacheRepositoryImpl::new(store))
    }

    fn ids(reservations: &[Reservation]) -> Vec<&str> {
        reservations.iter().map(|r| r.id.as_str()).collect()
    }

    async fn seed_cache(store: &Arc<MemoryCacheStore>, scope: &str, reservations: &[Reservation]) {
        seed_cache_with(
            store,
            scope,
            JoinedReservations {
                reservations: reservations.to_vec(),
                truncated: false,
            },
        )
        .await;
    }

    async fn seed_cache_with(store: &Arc<MemoryCacheStore>, scope: &str, joined: JoinedReservations) {
        let filter: PropertyFilter = scope.parse().unwrap();
        CacheRepositoryImpl::new(store.clone())
            .save(&CacheKey::new("reservations", &filter), &joined)
            .await;
    }

    async fn cached_ids(store: &Arc<MemoryCacheStore>, scope: &str) -> Option<Vec<String>> {
        let filter: PropertyFilter = scope.parse().unwrap();
        CacheRepositoryImpl::new(store.clone())
            .load(&CacheKey::new("reservations", &filter))
            .await
            .map(|joined| joined.reservations.into_iter().map(|r| r.id).collect())
    }

    async fn wait_for_cache(store: &Arc<MemoryCacheStore>, scope: &str, expected: &[&str]) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(ids) = cached_ids(store, scope).await {
                    if ids == expected {
                        return;
                    }
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    fn backend() -> FakeReservationsApi {
        FakeReservationsApi::new(vec![
            raw_reservation(1, "P1", "2025-05-10", "2025-05-12"),
            raw_reservation(2, "P1", "2025-04-27", "2025-04-30"),
            raw_reservation(3, "P2", "2025-06-01", "2025-06-05"),
        ])
    }

    #[tokio::test]
    async fn foreground_fetch_without_cache_publishes_fresh_view_and_caches_it() {
        let api = backend();
        api.set_payout("2", 310.0);
        let store = Arc::new(MemoryCacheStore::new());
        let aggregator = aggregator(&api, store.clone());

        let view = aggregator.load_view(FilterState::for_property("P1")).await;

        assert!(matches!(view.status, ViewStatus::Fresh));
        assert_eq!(ids(&view.reservations), vec!["2", "1"]);
        assert_eq!(view.summary.totals.owner_payout, 310.0);
        assert_eq!(view.summary.reservation_count, 2);
        assert_eq!(ids(&aggregator.current_view().reservations), vec!["2", "1"]);
        wait_for_cache(&store, "P1", &["1", "2"]).await;
    }

    #[tokio::test]
    async fn cache_hit_is_shown_then_replaced_by_background_refresh() {
        let api = backend();
        let store = Arc::new(MemoryCacheStore::new());
        seed_cache(&store, "P1", &[reservation("old", "P1", "2025-04-01", "2025-04-03")]).await;
        let aggregator = aggregator(&api, store.clone());
        let mut views = aggregator.subscribe();

        let view = aggregator.load_view(FilterState::for_property("P1")).await;

        assert!(matches!(view.status, ViewStatus::Cached));
        assert_eq!(ids(&view.reservations), vec!["old"]);

        let refreshed = views
            .wait_for(|v| matches!(v.status, ViewStatus::Fresh))
            .await
            .unwrap()
            .clone();
        assert_eq!(ids(&refreshed.reservations), vec!["2", "1"]);
        wait_for_cache(&store, "P1", &["1", "2"]).await;
    }

    #[tokio::test]
    async fn stale_background_completion_does_not_replace_newer_view() {
        let api = backend();
        let store = Arc::new(MemoryCacheStore::new());
        seed_cache(&store, "P1", &[reservation("old", "P1", "2025-04-01", "2025-04-03")]).await;
        let gate = api.gate("P1");
        let aggregator = aggregator(&api, store.clone());

        let p1 = aggregator.load_view(FilterState::for_property("P1")).await;
        assert!(matches!(p1.status, ViewStatus::Cached));
        let p2 = aggregator.load_view(FilterState::for_property("P2")).await;
        assert_eq!(ids(&p2.reservations), vec!["3"]);

        gate.notify_one();
        // The P1 refresh has landed once its result reaches the cache.
        wait_for_cache(&store, "P1", &["1", "2"]).await;
        tokio::task::yield_now().await;

        let current = aggregator.current_view();
        assert_eq!(current.filter, FilterState::for_property("P2"));
        assert_eq!(ids(&current.reservations), vec!["3"]);
        assert_eq!(current.generation, p2.generation);
    }

    #[tokio::test]
    async fn identical_concurrent_loads_share_one_fetch() {
        let api = backend();
        let gate = api.gate("all");
        let aggregator = aggregator(&api, Arc::new(MemoryCacheStore::new()));

        let release = async {
            while api.page_calls() == 0 {
                tokio::task::yield_now().await;
            }
            gate.notify_one();
        };
        let (first, second, ()) = tokio::join!(
            aggregator.load_view(FilterState::default()),
            aggregator.load_view(FilterState::default()),
            release
        );

        assert_eq!(api.page_calls(), 1);
        assert_eq!(api.report_calls(), 1);
        assert_eq!(first.reservations, second.reservations);
        assert_eq!(aggregator.current_view().generation, second.generation);
    }

    #[tokio::test]
    async fn foreground_failure_surfaces_an_empty_error_view() {
        let api = backend();
        api.fail_with(Some(FakeFailure::Unauthenticated));
        let aggregator = aggregator(&api, Arc::new(MemoryCacheStore::new()));

        let view = aggregator.load_view(FilterState::default()).await;

        assert!(view.reservations.is_empty());
        assert!(view.status.error().unwrap().is_unauthenticated());
        assert!(aggregator.current_view().status.error().is_some());
    }

    #[tokio::test]
    async fn background_failure_keeps_cached_reservations() {
        let api = backend();
        api.fail_with(Some(FakeFailure::Network));
        let store = Arc::new(MemoryCacheStore::new());
        seed_cache(&store, "all", &[reservation("old", "P1", "2025-04-01", "2025-04-03")]).await;
        let aggregator = aggregator(&api, store.clone());
        let mut views = aggregator.subscribe();

        aggregator.load_view(FilterState::default()).await;
        let view = views
            .wait_for(|v| matches!(v.status, ViewStatus::Stale(_)))
            .await
            .unwrap()
            .clone();

        assert_eq!(ids(&view.reservations), vec!["old"]);
        assert_eq!(cached_ids(&store, "all").await, Some(vec!["old".to_string()]));
    }

    #[tokio::test]
    async fn truncated_cache_entry_stays_flagged_after_background_failure() {
        let api = backend();
        api.fail_with(Some(FakeFailure::Network));
        let store = Arc::new(MemoryCacheStore::new());
        seed_cache_with(
            &store,
            "P1",
            JoinedReservations {
                reservations: vec![reservation("old", "P1", "2025-04-01", "2025-04-03")],
                truncated: true,
            },
        )
        .await;
        let aggregator = aggregator(&api, store.clone());
        let mut views = aggregator.subscribe();

        let cached = aggregator.load_view(FilterState::for_property("P1")).await;
        assert!(matches!(cached.status, ViewStatus::Cached));
        assert!(cached.truncated);

        let stale = views
            .wait_for(|v| matches!(v.status, ViewStatus::Stale(_)))
            .await
            .unwrap()
            .clone();
        assert_eq!(ids(&stale.reservations), vec!["old"]);
        assert!(stale.truncated);
    }

    #[tokio::test]
    async fn older_cache_save_does_not_overwrite_a_newer_one() {
        let store = Arc::new(MemoryCacheStore::new());
        let aggregator = aggregator(&backend(), store.clone());
        let key = aggregator.inner.cache_key(&PropertyFilter::Property("P1".to_string()));
        let snapshot = |id: &str| JoinedReservations {
            reservations: vec![reservation(id, "P1", "2025-05-01", "2025-05-03")],
            truncated: false,
        };

        aggregator.inner.save_to_cache(5, &key, &snapshot("newer")).await;
        aggregator.inner.save_to_cache(4, &key, &snapshot("older")).await;
        assert_eq!(cached_ids(&store, "P1").await, Some(vec!["newer".to_string()]));

        aggregator.inner.save_to_cache(6, &key, &snapshot("latest")).await;
        assert_eq!(cached_ids(&store, "P1").await, Some(vec!["latest".to_string()]));
    }

    #[tokio::test]
    async fn refresh_failure_keeps_displayed_reservations() {
        let api = backend();
        let aggregator = aggregator(&api, Arc::new(MemoryCacheStore::new()));
        let filter = FilterState {
            sort_by: SortBy::Revenue,
            ..FilterState::for_property("P2")
        };
        aggregator.load_view(filter.clone()).await;

        api.fail_with(Some(FakeFailure::Network));
        let view = aggregator.refresh().await;

        assert!(matches!(view.status, ViewStatus::Stale(_)));
        assert_eq!(view.filter, filter);
        assert_eq!(ids(&view.reservations), vec!["3"]);
        assert_eq!(api.page_calls(), 2);
    }

    #[tokio::test]
    async fn dispose_resets_view_and_ignores_pending_completions() {
        let api = backend();
        let store = Arc::new(MemoryCacheStore::new());
        seed_cache(&store, "P1", &[reservation("old", "P1", "2025-04-01", "2025-04-03")]).await;
        let gate = api.gate("P1");
        let aggregator = aggregator(&api, store.clone());

        aggregator.load_view(FilterState::for_property("P1")).await;
        aggregator.dispose();
        gate.notify_one();
        wait_for_cache(&store, "P1", &["1", "2"]).await;
        tokio::task::yield_now().await;

        let current = aggregator.current_view();
        assert!(current.reservations.is_empty());
        assert!(matches!(current.status, ViewStatus::Idle));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_backend_times_out_into_error_view() {
        let api = backend();
        api.delay_pages(Duration::from_secs(300));
        let aggregator = aggregator(&api, Arc::new(MemoryCacheStore::new()));

        let view = aggregator.load_view(FilterState::default()).await;

        let err = view.status.error().unwrap();
        assert!(matches!(**err, ReservationsError::Network(_)));
    }

    #[tokio::test]
    async fn fetch_reservations_returns_the_joined_list() {
        let api = backend();
        api.set_payout("3", 99.0);
        let aggregator = aggregator(&api, Arc::new(MemoryCacheStore::new()));
        let params = FetchParams::new(
            vec!["P2".to_string()],
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
        );

        let joined = aggregator.fetch_reservations(&params).await.unwrap();

        assert_eq!(ids(&joined.reservations), vec!["3"]);
        assert_eq!(joined.reservations[0].financials.owner_payout, 99.0);
    }
}
