use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    data::{
        datasources::cache_store::CacheStore,
        models::cached_reservations_model::CachedReservationsModel,
    },
    domain::repositories::cache_repository::CacheRepository,
    entities::{CacheKey, JoinedReservations},
};

pub(crate) struct CacheRepositoryImpl {
    store: Arc<dyn CacheStore>,
}

impl CacheRepositoryImpl {
    pub(crate) fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CacheRepository for CacheRepositoryImpl {
    async fn load(&self, key: &CacheKey) -> Option<JoinedReservations> {
        let key = key.as_string();
        let value = match self.store.load(&key).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                tracing::debug!(key = %key, "cache miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache read failed; treating as miss");
                return None;
            }
        };

        let rehydrated = serde_json::from_value::<CachedReservationsModel>(value)
            .ok()
            .and_then(CachedReservationsModel::rehydrate);
        match rehydrated {
            Some(joined) => {
                tracing::debug!(
                    key = %key,
                    reservations = joined.reservations.len(),
                    truncated = joined.truncated,
                    "cache hit"
                );
                Some(joined)
            }
            None => {
                tracing::warn!(key = %key, "discarding corrupt cache entry");
                None
            }
        }
    }

    async fn save(&self, key: &CacheKey, joined: &JoinedReservations) {
        let key = key.as_string();
        let snapshot = CachedReservationsModel::snapshot(joined, Utc::now());
        let value = match serde_json::to_value(&snapshot) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache snapshot not serializable");
                return;
            }
        };
        if let Err(e) = self.store.save(&key, value).await {
            tracing::warn!(key = %key, error = %e, "cache write failed");
        }
    }
}
