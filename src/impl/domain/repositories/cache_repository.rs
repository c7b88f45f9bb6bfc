use async_trait::async_trait;

use crate::entities::{CacheKey, JoinedReservations};

#[async_trait]
pub(crate) trait CacheRepository: Send + Sync {
    /// `None` on a miss, and on any entry that does not rehydrate cleanly.
    async fn load(&self, key: &CacheKey) -> Option<JoinedReservations>;

    /// Failures are logged, never returned.
    async fn save(&self, key: &CacheKey, joined: &JoinedReservations);
}
