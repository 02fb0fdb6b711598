use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::models::user::PrivateCache;
use crate::repositories::errors::store_errors::StoreError;
use crate::repositories::profile_repository::ProfileRepository;
use crate::repositories::variant_repository::VariantRepository;

/// How long a racing un-upvote waits for its matching upvote to land before
/// overwriting the cache. Reordering longer than this loses; that window is
/// accepted and logged, not closed.
const UPVOTE_RACE_DELAY: Duration = Duration::from_millis(250);

/// Upvote aggregation: the variant's counter moves by atomic increment, the
/// actor's private cache by read-modify-write. The one deliberate wait in
/// the whole system lives here (see `UPVOTE_RACE_DELAY`).
pub struct UpvoteService {
    variants: Arc<dyn VariantRepository + Send + Sync>,
    profiles: Arc<dyn ProfileRepository + Send + Sync>,
    race_delay: Duration,
}

impl UpvoteService {
    pub fn new(
        variants: Arc<dyn VariantRepository + Send + Sync>,
        profiles: Arc<dyn ProfileRepository + Send + Sync>,
    ) -> Self {
        UpvoteService {
            variants,
            profiles,
            race_delay: UPVOTE_RACE_DELAY,
        }
    }

    pub fn with_race_delay(
        variants: Arc<dyn VariantRepository + Send + Sync>,
        profiles: Arc<dyn ProfileRepository + Send + Sync>,
        race_delay: Duration,
    ) -> Self {
        UpvoteService {
            variants,
            profiles,
            race_delay,
        }
    }

    pub async fn upvote(&self, user_id: &str, variant_id: &str) -> Result<(), StoreError> {
        self.variants.add_upvotes(variant_id, 1).await?;
        let mut cache = self.load_cache(user_id).await?;
        if !cache.upvoted_variants.contains(&variant_id.to_string()) {
            cache.upvoted_variants.push(variant_id.to_string());
            self.profiles.put_cache(&cache).await?;
        }
        Ok(())
    }

    pub async fn remove_upvote(&self, user_id: &str, variant_id: &str) -> Result<(), StoreError> {
        self.variants.add_upvotes(variant_id, -1).await?;
        let mut cache = self.load_cache(user_id).await?;
        let before = cache.upvoted_variants.len();
        cache.upvoted_variants.retain(|id| id != variant_id);
        if cache.upvoted_variants.len() != before {
            return self.profiles.put_cache(&cache).await;
        }

        // Nothing came out: this un-upvote overtook its matching upvote.
        // Wait for the upvote to land, then overwrite with it removed.
        warn!(
            "Un-upvote of {} by {} raced ahead of the upvote; retrying after delay",
            variant_id, user_id
        );
        tokio::time::sleep(self.race_delay).await;
        let mut cache = self.load_cache(user_id).await?;
        let before = cache.upvoted_variants.len();
        cache.upvoted_variants.retain(|id| id != variant_id);
        if cache.upvoted_variants.len() != before {
            self.profiles.put_cache(&cache).await?;
        } else {
            warn!(
                "Upvote of {} by {} never arrived within the race window",
                variant_id, user_id
            );
        }
        Ok(())
    }

    async fn load_cache(&self, user_id: &str) -> Result<PrivateCache, StoreError> {
        match self.profiles.get_cache(user_id).await {
            Ok(cache) => Ok(cache),
            Err(StoreError::NotFound) => Ok(PrivateCache::new(user_id)),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::InMemoryStore;

    fn service(store: &Arc<InMemoryStore>) -> UpvoteService {
        UpvoteService::with_race_delay(store.clone(), store.clone(), Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_upvote_bumps_counter_and_cache() {
        let store = Arc::new(InMemoryStore::new());
        let variant_id = store.seed_variant("carol-id", "Carol", "Atomic");
        let service = service(&store);

        service.upvote("alice-id", &variant_id).await.unwrap();

        assert_eq!(store.variant(&variant_id).num_upvotes, 1);
        assert_eq!(store.cache("alice-id").upvoted_variants, vec![variant_id]);
    }

    #[tokio::test]
    async fn test_upvote_twice_keeps_cache_deduplicated() {
        let store = Arc::new(InMemoryStore::new());
        let variant_id = store.seed_variant("carol-id", "Carol", "Atomic");
        let service = service(&store);

        service.upvote("alice-id", &variant_id).await.unwrap();
        service.upvote("alice-id", &variant_id).await.unwrap();

        assert_eq!(store.cache("alice-id").upvoted_variants.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_upvote_clears_cache() {
        let store = Arc::new(InMemoryStore::new());
        let variant_id = store.seed_variant("carol-id", "Carol", "Atomic");
        let service = service(&store);

        service.upvote("alice-id", &variant_id).await.unwrap();
        service.remove_upvote("alice-id", &variant_id).await.unwrap();

        assert_eq!(store.variant(&variant_id).num_upvotes, 0);
        assert!(store.cache("alice-id").upvoted_variants.is_empty());
    }

    #[tokio::test]
    async fn test_racing_removal_gives_the_upvote_time_to_land() {
        let store = Arc::new(InMemoryStore::new());
        let variant_id = store.seed_variant("carol-id", "Carol", "Atomic");
        let service = UpvoteService::with_race_delay(
            store.clone(),
            store.clone(),
            Duration::from_millis(50),
        );

        // Simulate the reordered upvote landing mid-delay.
        let store_for_writer = store.clone();
        let variant_for_writer = variant_id.clone();
        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let mut cache = PrivateCache::new("alice-id");
            cache.upvoted_variants.push(variant_for_writer);
            store_for_writer.replace_cache(cache);
        });

        service.remove_upvote("alice-id", &variant_id).await.unwrap();
        writer.await.unwrap();

        assert!(store.cache("alice-id").upvoted_variants.is_empty());
        // Only the decrement's counter write ran in this simulation.
        assert_eq!(store.variant(&variant_id).num_upvotes, -1);
    }
}
