use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

// ==============================================================================
// Lazy Cache
// ==============================================================================

/// A lazily filled, re-fillable cache cell.
///
/// Reads of a filled cell never touch the fetch gate. When the cell is empty,
/// callers queue on the gate. The first one through fetches. Callers behind
/// it re-check the cell and return the stored value without fetching again.
/// This bounds concurrent fetches to one. It does not make the fetch a
/// one-time event: [`invalidate`](Self::invalidate) empties the cell and the
/// next reader fetches again.
///
/// A failed fetch leaves the cell empty.
pub struct LazyCache<T> {
    slot: RwLock<Option<Arc<T>>>,
    fetch_gate: Mutex<()>,
}

impl<T> LazyCache<T> {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
            fetch_gate: Mutex::new(()),
        }
    }

    pub async fn get(&self) -> Option<Arc<T>> {
        self.slot.read().await.clone()
    }

    pub async fn get_or_fetch<F, Fut, E>(&self, fetch: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get().await {
            return Ok(value);
        }

        let _gate = self.fetch_gate.lock().await;
        if let Some(value) = self.get().await {
            return Ok(value);
        }

        let value = Arc::new(fetch().await?);
        *self.slot.write().await = Some(Arc::clone(&value));
        Ok(value)
    }

    /// Empty the cell. Waits for an in-flight fetch to finish first, so the
    /// fetched value cannot land after the invalidation.
    pub async fn invalidate(&self) {
        let _gate = self.fetch_gate.lock().await;
        *self.slot.write().await = None;
    }

    /// Empty the cell through exclusive access.
    pub fn clear(&mut self) {
        *self.slot.get_mut() = None;
    }
}

impl<T: Clone> LazyCache<T> {
    /// Modify a filled cell in place. Returns `false` if the cell is empty.
    pub async fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut slot = self.slot.write().await;
        match slot.as_mut() {
            Some(value) => {
                f(Arc::make_mut(value));
                true
            }
            None => false,
        }
    }
}

impl<T> Default for LazyCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    async fn slow_fetch(calls: &AtomicUsize, value: u32) -> Result<u32, String> {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(value)
    }

    #[tokio::test]
    async fn concurrent_first_reads_fetch_once() {
        let cache = LazyCache::new();
        let calls = AtomicUsize::new(0);

        let (a, b) = tokio::join!(
            cache.get_or_fetch(|| slow_fetch(&calls, 1)),
            cache.get_or_fetch(|| slow_fetch(&calls, 2)),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*a.expect("first read"), 1);
        assert_eq!(*b.expect("second read"), 1);
    }

    #[tokio::test]
    async fn invalidate_allows_refetch() {
        let cache = LazyCache::new();
        let calls = AtomicUsize::new(0);

        cache
            .get_or_fetch(|| slow_fetch(&calls, 1))
            .await
            .expect("fetch");
        cache.invalidate().await;
        assert!(cache.get().await.is_none());

        let value = cache
            .get_or_fetch(|| slow_fetch(&calls, 2))
            .await
            .expect("refetch");
        assert_eq!(*value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_cell_empty() {
        let cache: LazyCache<u32> = LazyCache::new();
        let err = cache
            .get_or_fetch(|| async { Err::<u32, _>("offline") })
            .await
            .expect_err("fetch fails");
        assert_eq!(err, "offline");
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn update_only_touches_filled_cell() {
        let mut cache = LazyCache::new();
        assert!(!cache.update(|v: &mut u32| *v += 1).await);

        cache
            .get_or_fetch(|| async { Ok::<_, String>(1u32) })
            .await
            .expect("fetch");
        assert!(cache.update(|v| *v += 1).await);
        assert_eq!(cache.get().await.as_deref(), Some(&2));

        cache.clear();
        assert!(cache.get().await.is_none());
    }
}
