//! Generic bounded object pool with scoped checkout: guaranteed release on
//! every exit path, normal return, early return, or panic unwind. Reused for
//! both the `IndexerCoordinator` pool and the `IndexClient` pool — one
//! pooling mechanism in the core, not two near-duplicates.

use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::IndexSvcError;

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

/// A bounded pool of `T`, created lazily up to `size` items. Checkout blocks
/// until a permit is available.
pub struct Pool<T> {
    semaphore: Arc<Semaphore>,
    idle: Arc<Mutex<Vec<T>>>,
    factory: Factory<T>,
}

impl<T: Send + 'static> Pool<T> {
    pub fn new(size: usize, factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            idle: Arc::new(Mutex::new(Vec::with_capacity(size))),
            factory: Box::new(factory),
        }
    }

    /// Borrow an item, blocking until one is free. The item is returned to
    /// the pool when the guard is dropped, on every exit path (normal
    /// return, early return, or panic unwind).
    pub async fn checkout(&self) -> Result<PoolGuard<T>, IndexSvcError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| IndexSvcError::ResourceUnavailable("pool is closed".into()))?;

        let item = self
            .idle
            .lock()
            .expect("pool idle-list mutex poisoned")
            .pop()
            .unwrap_or_else(|| (self.factory)());

        Ok(PoolGuard {
            item: Some(item),
            idle: self.idle.clone(),
            _permit: permit,
        })
    }

    /// Stop issuing new checkouts; pending and future `checkout()` calls
    /// fail immediately. In-flight guards still release normally.
    pub fn close(&self) {
        self.semaphore.close();
    }
}

/// RAII handle to a pooled item. Dereferences to `T`; returns the item to
/// the pool's idle list on drop.
pub struct PoolGuard<T> {
    item: Option<T>,
    idle: Arc<Mutex<Vec<T>>>,
    _permit: OwnedSemaphorePermit,
}

impl<T> std::ops::Deref for PoolGuard<T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.item.as_ref().expect("item taken only on drop")
    }
}

impl<T> std::ops::DerefMut for PoolGuard<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.item.as_mut().expect("item taken only on drop")
    }
}

impl<T> Drop for PoolGuard<T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.idle.lock().expect("pool idle-list mutex poisoned").push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn checkout_reuses_released_items() {
        let created = Arc::new(AtomicUsize::new(0));
        let created_clone = created.clone();
        let pool: Pool<usize> = Pool::new(1, move || created_clone.fetch_add(1, Ordering::SeqCst));

        {
            let guard = pool.checkout().await.unwrap();
            assert_eq!(*guard, 0);
        }
        {
            let guard = pool.checkout().await.unwrap();
            assert_eq!(*guard, 0); // reused, not recreated
        }
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn checkout_blocks_until_release() {
        let pool: Pool<usize> = Pool::new(1, || 0);
        let guard = pool.checkout().await.unwrap();

        let pool_ref = &pool;
        let blocked = tokio::time::timeout(std::time::Duration::from_millis(50), pool_ref.checkout()).await;
        assert!(blocked.is_err(), "checkout should block while the only item is out");

        drop(guard);
        let ok = tokio::time::timeout(std::time::Duration::from_millis(50), pool_ref.checkout()).await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn closed_pool_rejects_checkout() {
        let pool: Pool<usize> = Pool::new(1, || 0);
        pool.close();
        assert!(pool.checkout().await.is_err());
    }
}
