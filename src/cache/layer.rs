//! Cache layer that orchestrates caching strategies with network fetching.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::generation::{CacheGeneration, Partition};
use super::storage::CacheStorage;
use super::traits::{CacheEntry, CacheResult, RequestKey, StoredResponse};
use crate::error::Result;

/// Cache layer scoped to the current generation.
///
/// This layer sits between the interceptor and the storage backend. Every store
/// call runs on the blocking pool so async callers are never stalled by SQLite.
pub struct CacheLayer<S: CacheStorage> {
  storage: Arc<S>,
  generation: CacheGeneration,
  collected: Arc<AtomicBool>,
}

impl<S: CacheStorage> CacheLayer<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: S, generation: CacheGeneration) -> Self {
    Self::shared(Arc::new(storage), generation)
  }

  /// Create a layer over storage that is already shared.
  pub fn shared(storage: Arc<S>, generation: CacheGeneration) -> Self {
    Self {
      storage,
      generation,
      collected: Arc::new(AtomicBool::new(false)),
    }
  }

  pub fn generation(&self) -> &CacheGeneration {
    &self.generation
  }

  async fn blocking<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&S) -> Result<T> + Send + 'static,
  {
    let storage = Arc::clone(&self.storage);
    tokio::task::spawn_blocking(move || f(&storage)).await?
  }

  /// Look up a key in the current generation.
  pub async fn lookup(&self, partition: Partition, key: &RequestKey) -> Result<Option<CacheEntry>> {
    let name = self.generation.partition(partition);
    let key = key.clone();
    self.blocking(move |s| s.lookup(&name, &key)).await
  }

  /// Store a response in the current generation.
  pub async fn store(
    &self,
    partition: Partition,
    key: &RequestKey,
    response: StoredResponse,
  ) -> Result<()> {
    let name = self.generation.partition(partition);
    let key = key.clone();
    self.blocking(move |s| s.store(&name, &key, &response)).await
  }

  /// Store a set of responses in one transaction.
  pub async fn store_all(
    &self,
    partition: Partition,
    entries: Vec<(RequestKey, StoredResponse)>,
  ) -> Result<()> {
    let name = self.generation.partition(partition);
    self.blocking(move |s| s.store_all(&name, &entries)).await
  }

  pub async fn delete_matching<P>(&self, partition: Partition, predicate: P) -> Result<usize>
  where
    P: Fn(&RequestKey) -> bool + Send + Sync + 'static,
  {
    let name = self.generation.partition(partition);
    self.blocking(move |s| s.delete_matching(&name, &predicate)).await
  }

  pub async fn list_keys(&self, partition: Partition) -> Result<BTreeSet<RequestKey>> {
    let name = self.generation.partition(partition);
    self.blocking(move |s| s.list_keys(&name)).await
  }

  /// Delete every partition that does not belong to the current generation.
  ///
  /// Runs at most once per layer; later calls return `Ok(0)` without touching the store.
  pub async fn collect_stale_generations(&self) -> Result<usize> {
    if self.collected.swap(true, Ordering::SeqCst) {
      return Ok(0);
    }

    let generation = self.generation.clone();
    let result = self
      .blocking(move |s| {
        let mut removed = 0;
        for name in s.partitions()? {
          if !generation.is_current(&name) {
            info!(partition = %name, "deleting stale cache partition");
            removed += s.drop_partition(&name)?;
          }
        }
        Ok(removed)
      })
      .await;

    if result.is_err() {
      // Allow a retry on the next activation
      self.collected.store(false, Ordering::SeqCst);
    }
    result
  }

  /// Lookup that degrades storage failures to a miss.
  async fn lookup_or_miss(&self, partition: Partition, key: &RequestKey) -> Option<CacheEntry> {
    match self.lookup(partition, key).await {
      Ok(entry) => entry,
      Err(e) => {
        warn!(%key, error = %e, "cache lookup failed, treating as miss");
        None
      }
    }
  }

  /// Store that logs failures instead of failing the triggering fetch.
  async fn store_or_log(&self, partition: Partition, key: &RequestKey, response: StoredResponse) {
    if let Err(e) = self.store(partition, key, response).await {
      warn!(%key, error = %e, "failed to cache response");
    }
  }

  /// Cache-first strategy.
  ///
  /// 1. Check cache - on hit, return without touching the network
  /// 2. On miss, fetch from network
  /// 3. Store successful (2xx) responses before returning them
  pub async fn cache_first<F, Fut>(
    &self,
    partition: Partition,
    key: &RequestKey,
    fetcher: F,
  ) -> Result<CacheResult<StoredResponse>>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<StoredResponse>>,
  {
    if let Some(cached) = self.lookup_or_miss(partition, key).await {
      debug!(%key, "cache hit");
      return Ok(CacheResult::from_cache(cached.response, cached.stored_at));
    }

    let response = fetcher().await?;
    if response.is_success() {
      self.store_or_log(partition, key, response.clone()).await;
    }
    Ok(CacheResult::from_network(response))
  }

  /// Serve a fixed stored document, falling back to the network only on a miss.
  ///
  /// The network response is not stored; the document is populated by install.
  pub async fn document_or_fetch<F, Fut>(
    &self,
    partition: Partition,
    document: &RequestKey,
    fetcher: F,
  ) -> Result<CacheResult<StoredResponse>>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<StoredResponse>>,
  {
    match self.lookup_or_miss(partition, document).await {
      Some(cached) => Ok(CacheResult::from_cache(cached.response, cached.stored_at)),
      None => Ok(CacheResult::from_network(fetcher().await?)),
    }
  }

  /// Stale-while-revalidate strategy.
  ///
  /// A cached copy is returned immediately while a background fetch refreshes the
  /// store for next time. Without a cached copy the caller waits on the fetch.
  /// Only HTTP 200 responses are stored.
  pub async fn stale_while_revalidate<F, Fut>(
    &self,
    partition: Partition,
    key: &RequestKey,
    fetcher: F,
  ) -> Result<CacheResult<StoredResponse>>
  where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<StoredResponse>> + Send + 'static,
  {
    if let Some(cached) = self.lookup_or_miss(partition, key).await {
      let layer = self.clone();
      let key = key.clone();
      tokio::spawn(async move {
        match fetcher().await {
          Ok(fresh) if fresh.status == 200 => layer.store_or_log(partition, &key, fresh).await,
          Ok(fresh) => debug!(%key, status = fresh.status, "revalidation not cached"),
          Err(e) => warn!(%key, error = %e, "revalidation failed"),
        }
      });
      return Ok(CacheResult::from_cache(cached.response, cached.stored_at));
    }

    let response = fetcher().await?;
    if response.status == 200 {
      self.store_or_log(partition, key, response.clone()).await;
    }
    Ok(CacheResult::from_network(response))
  }
}

impl<S: CacheStorage> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      generation: self.generation.clone(),
      collected: Arc::clone(&self.collected),
    }
  }
}
