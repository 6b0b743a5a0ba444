use async_trait::async_trait;
use std::sync::Arc;

use super::eviction::evict_translation;
use crate::cache::CacheStorage;
use crate::error::Result;
use crate::intercept::OfflineCache;
use crate::scripture::{DownloadUnit, ScriptureClient};

/// What the download coordinator needs from the outside world
#[async_trait]
pub trait OfflineBackend: Send + Sync + 'static {
  /// Fetch one chapter. Storing it is the interceptor's job.
  async fn fetch_chapter(&self, unit: &DownloadUnit, translation: &str) -> Result<()>;

  /// Delete every cached entry of a translation, returning how many were removed
  async fn evict_translation(&self, translation: &str) -> Result<usize>;
}

/// Backend over the intercepted scripture client and the shared cache
pub struct ScriptureBackend<S: CacheStorage> {
  scripture: ScriptureClient,
  cache: Arc<OfflineCache<S>>,
}

impl<S: CacheStorage> ScriptureBackend<S> {
  pub fn new(scripture: ScriptureClient, cache: Arc<OfflineCache<S>>) -> Self {
    Self { scripture, cache }
  }
}

#[async_trait]
impl<S: CacheStorage> OfflineBackend for ScriptureBackend<S> {
  async fn fetch_chapter(&self, unit: &DownloadUnit, translation: &str) -> Result<()> {
    self.scripture.fetch_chapter(unit, translation).await
  }

  async fn evict_translation(&self, translation: &str) -> Result<usize> {
    evict_translation(self.cache.layer(), self.scripture.base_url(), translation).await
  }
}
