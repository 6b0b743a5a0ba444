//! Startup wiring: stores, interceptor, clients and services.

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use crate::bookmarks::Bookmarks;
use crate::cache::{CacheGeneration, CacheLayer, SqliteStorage};
use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::genai::{Devotions, GeminiClient};
use crate::intercept::{self, Classifier, OfflineCache};
use crate::journal::Journal;
use crate::offline::{DownloadCoordinator, ScriptureBackend, StatusLedger};
use crate::plans::ReadingPlans;
use crate::scripture::{ScriptureClient, NEW_TESTAMENT};

pub type Cache = OfflineCache<SqliteStorage>;
pub type Coordinator = DownloadCoordinator<ScriptureBackend<SqliteStorage>>;

/// Everything a command or the terminal UI needs, built once per process
pub struct AppContext {
  pub config: Config,
  pub cache: Arc<Cache>,
  pub scripture: ScriptureClient,
  pub devotions: Arc<Devotions>,
  pub downloads: Coordinator,
  pub journal: Journal,
  pub bookmarks: Bookmarks,
  pub plans: ReadingPlans,
}

impl AppContext {
  /// Open with the stores in the default data directory
  pub async fn open(config: Config) -> Result<Self> {
    let dir = crate::config::data_dir()?;
    Self::open_in(config, &dir).await
  }

  /// Open with `cache.db` and `state.db` under `dir`
  pub async fn open_in(config: Config, dir: &Path) -> Result<Self> {
    let storage = SqliteStorage::open_at(&dir.join("cache.db"))?;
    let state = Database::open_at(&dir.join("state.db"))?;
    Self::with_stores(config, storage, state).await
  }

  /// Wire services over the given stores.
  ///
  /// Stale cache generations are collected before this returns; the app shell is
  /// fetched in the background.
  pub async fn with_stores(config: Config, storage: SqliteStorage, state: Database) -> Result<Self> {
    let scripture_base = parse_url("scripture base_url", &config.scripture.base_url)?;
    let app_origin = config.cache.origin()?;
    let shell_document = app_origin
      .join("index.html")
      .map_err(|e| Error::Config(format!("Invalid app_origin: {}", e)))?;

    let generation = CacheGeneration::new(config.cache.app_name.clone(), config.cache.generation);
    let layer = CacheLayer::new(storage, generation);
    let upstream = intercept::upstream_client(&config.network)?;
    let cache = Arc::new(OfflineCache::new(
      layer,
      Classifier::new(&scripture_base, &app_origin),
      &shell_document,
      upstream,
    ));

    let http = intercept::intercepted_client(cache.clone(), &config.network)?;
    let scripture = ScriptureClient::new(http.clone(), &config.scripture.base_url)?;

    let gemini = GeminiClient::new(
      http,
      &config.generative.base_url,
      &config.generative.model,
      Config::api_key(),
    )?;
    if !gemini.is_configured() {
      warn!("API key not set, generative features are disabled");
    }
    let devotions = Arc::new(Devotions::new(Arc::new(gemini)));

    let state = Arc::new(state);
    let ledger = StatusLedger::open(state.clone())?;
    let backend = Arc::new(ScriptureBackend::new(scripture.clone(), cache.clone()));
    let downloads = DownloadCoordinator::new(backend, ledger, NEW_TESTAMENT, &config.downloads);

    cache.activate().await?;

    let shell = config.cache.shell_urls()?;
    let installer = cache.clone();
    tokio::spawn(async move {
      if let Err(e) = installer.install(&shell).await {
        warn!(error = %e, "app shell not cached, will retry on next start");
      }
    });

    info!(generation = %cache.layer().generation(), "context ready");
    Ok(Self {
      config,
      cache,
      scripture,
      devotions,
      downloads,
      journal: Journal::new(state.clone()),
      bookmarks: Bookmarks::new(state.clone()),
      plans: ReadingPlans::new(state),
    })
  }

  /// Translation to use when none is given
  pub fn default_translation(&self) -> &str {
    &self.config.scripture.default_translation
  }
}

fn parse_url(what: &str, raw: &str) -> Result<Url> {
  Url::parse(raw).map_err(|e| Error::Config(format!("Invalid {} '{}': {}", what, raw, e)))
}
