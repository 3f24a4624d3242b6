use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Holds one value for `ttl`. A zero ttl disables caching.
///
/// Callers arriving during a refresh wait for it and share its result.
pub struct TtlCache<T> {
    ttl: Duration,
    slot: Mutex<Option<(Instant, Arc<T>)>>,
}

impl<T> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        TtlCache {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Returns the stored value while fresh, otherwise runs `refresh`. The
    /// new value is only stored when `keep` accepts it; a rejected value is
    /// returned once and the previous entry is dropped.
    pub async fn get_or_refresh_if<F, Fut, K>(&self, refresh: F, keep: K) -> Arc<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
        K: FnOnce(&T) -> bool,
    {
        if self.ttl.is_zero() {
            return Arc::new(refresh().await);
        }

        let mut slot = self.slot.lock().await;
        if let Some((stored_at, value)) = slot.as_ref() {
            if stored_at.elapsed() < self.ttl {
                return value.clone();
            }
        }
        let value = Arc::new(refresh().await);
        *slot = keep(&value).then(|| (Instant::now(), value.clone()));
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn fill(cache: &TtlCache<usize>, calls: &AtomicUsize) -> usize {
        *cache
            .get_or_refresh_if(|| async { calls.fetch_add(1, Ordering::SeqCst) + 1 }, |_| true)
            .await
    }

    #[tokio::test]
    async fn test_fresh_value_is_reused() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);
        assert_eq!(fill(&cache, &calls).await, 1);
        assert_eq!(fill(&cache, &calls).await, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_always_refreshes() {
        let cache = TtlCache::new(Duration::ZERO);
        let calls = AtomicUsize::new(0);
        assert_eq!(fill(&cache, &calls).await, 1);
        assert_eq!(fill(&cache, &calls).await, 2);
    }

    #[tokio::test]
    async fn test_rejected_value_is_not_stored() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);
        let refresh = || async { calls.fetch_add(1, Ordering::SeqCst) + 1 };

        assert_eq!(*cache.get_or_refresh_if(refresh, |_| false).await, 1);
        assert_eq!(*cache.get_or_refresh_if(refresh, |_| true).await, 2);
        assert_eq!(*cache.get_or_refresh_if(refresh, |_| true).await, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_value_is_refreshed() {
        let cache = TtlCache::new(Duration::from_millis(10));
        let calls = AtomicUsize::new(0);
        assert_eq!(fill(&cache, &calls).await, 1);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(fill(&cache, &calls).await, 2);
    }
}
