//! Bulk download of a translation, one chapter at a time.

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::backend::OfflineBackend;
use super::ledger::StatusLedger;
use super::status::{OfflineStatus, Progress, StatusEvent};
use crate::config::DownloadConfig;
use crate::error::{Error, Result};
use crate::scripture::{download_units, Book};

const EVENT_CAPACITY: usize = 256;

/// Change notification for observers of the offline state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfflineEvent {
  Status {
    translation: String,
    status: OfflineStatus,
  },
  Progress {
    translation: String,
    progress: Progress,
  },
}

/// How a call to [`DownloadCoordinator::start_download`] ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
  /// A run for this translation was already in progress; nothing was done
  AlreadyRunning,
  Completed,
  Cancelled,
  Failed(Error),
}

/// Point-in-time view of every translation's status and progress
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfflineSnapshot {
  pub statuses: BTreeMap<String, OfflineStatus>,
  pub progress: BTreeMap<String, Progress>,
}

impl OfflineSnapshot {
  pub fn status(&self, translation: &str) -> OfflineStatus {
    self.statuses.get(translation).copied().unwrap_or_default()
  }
}

struct Inner<B> {
  backend: Arc<B>,
  ledger: StatusLedger,
  books: &'static [Book],
  unit_timeout: Duration,
  permits: Semaphore,
  tokens: DashMap<String, CancellationToken>,
  progress: DashMap<String, Progress>,
  events: broadcast::Sender<OfflineEvent>,
}

/// Owns the cancellation token of one run and releases it on every exit path.
struct RunGuard<'a> {
  tokens: &'a DashMap<String, CancellationToken>,
  translation: &'a str,
  token: CancellationToken,
}

impl<'a> RunGuard<'a> {
  fn new(tokens: &'a DashMap<String, CancellationToken>, translation: &'a str) -> Self {
    let token = CancellationToken::new();
    tokens.insert(translation.to_string(), token.clone());
    Self {
      tokens,
      translation,
      token,
    }
  }
}

impl Drop for RunGuard<'_> {
  fn drop(&mut self) {
    self.tokens.remove(self.translation);
  }
}

/// Drives downloads and evictions, and keeps the ledger and progress in step.
///
/// Units of one translation are fetched strictly in canonical order. Different
/// translations run concurrently, bounded by `max_concurrent`.
pub struct DownloadCoordinator<B: OfflineBackend> {
  inner: Arc<Inner<B>>,
}

impl<B: OfflineBackend> Clone for DownloadCoordinator<B> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<B: OfflineBackend> DownloadCoordinator<B> {
  pub fn new(
    backend: Arc<B>,
    ledger: StatusLedger,
    books: &'static [Book],
    config: &DownloadConfig,
  ) -> Self {
    let (events, _) = broadcast::channel(EVENT_CAPACITY);
    Self {
      inner: Arc::new(Inner {
        backend,
        ledger,
        books,
        unit_timeout: config.unit_timeout(),
        permits: Semaphore::new(config.max_concurrent.max(1)),
        tokens: DashMap::new(),
        progress: DashMap::new(),
        events,
      }),
    }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<OfflineEvent> {
    self.inner.events.subscribe()
  }

  pub fn snapshot(&self) -> Result<OfflineSnapshot> {
    Ok(OfflineSnapshot {
      statuses: self.inner.ledger.statuses()?,
      progress: self
        .inner
        .progress
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().clone()))
        .collect(),
    })
  }

  pub fn status(&self, translation: &str) -> Result<OfflineStatus> {
    self.inner.ledger.status(translation)
  }

  pub fn progress(&self, translation: &str) -> Option<Progress> {
    self.inner.progress.get(translation).map(|p| p.value().clone())
  }

  /// Whether a run currently holds a cancellation token for `translation`
  pub fn is_running(&self, translation: &str) -> bool {
    self.inner.tokens.contains_key(translation)
  }

  /// Download every unit of `translation`. Resolves when the run ends.
  pub async fn start_download(&self, translation: &str) -> Result<DownloadOutcome> {
    if self.apply(translation, StatusEvent::Started)?.is_none() {
      info!(translation, "download already running");
      return Ok(DownloadOutcome::AlreadyRunning);
    }

    let run = self.run(translation).await;

    let outcome = match run {
      Ok(()) => {
        self.set_progress(translation, Progress::completed());
        self.apply(translation, StatusEvent::Completed)?;
        info!(translation, "download completed");
        DownloadOutcome::Completed
      }
      Err(Error::Cancelled) => {
        self.apply(translation, StatusEvent::Cancelled)?;
        info!(translation, "download cancelled");
        DownloadOutcome::Cancelled
      }
      Err(e) => {
        let last = self.progress(translation).unwrap_or_default();
        self.set_progress(translation, last.failed(&e.to_string()));
        self.apply(translation, StatusEvent::Failed)?;
        error!(translation, error = %e, "download failed");
        DownloadOutcome::Failed(e)
      }
    };
    Ok(outcome)
  }

  /// The sequential unit loop. The token is released before the terminal
  /// status is recorded, so a restart never shares a token with this run.
  async fn run(&self, translation: &str) -> Result<()> {
    let inner = &self.inner;
    let guard = RunGuard::new(&inner.tokens, translation);
    let token = &guard.token;
    self.set_progress(translation, Progress::starting());

    let _permit = tokio::select! {
      _ = token.cancelled() => return Err(Error::Cancelled),
      permit = inner.permits.acquire() => permit.map_err(|_| Error::Cancelled)?,
    };

    let units = download_units(inner.books);
    let total = units.len();
    info!(translation, total, "download started");

    for (index, unit) in units.iter().enumerate() {
      if token.is_cancelled() {
        return Err(Error::Cancelled);
      }

      let fetch = tokio::time::timeout(
        inner.unit_timeout,
        inner.backend.fetch_chapter(unit, translation),
      );
      tokio::select! {
        _ = token.cancelled() => return Err(Error::Cancelled),
        result = fetch => match result {
          Ok(fetched) => fetched?,
          Err(_) => {
            return Err(Error::Network(format!(
              "Timed out fetching {} after {}s",
              unit.reference(),
              inner.unit_timeout.as_secs()
            )))
          }
        },
      }

      self.set_progress(translation, Progress::downloading(unit, index + 1, total));
    }
    Ok(())
  }

  /// Signal a running download to stop. Returns whether a run was signalled.
  pub fn cancel_download(&self, translation: &str) -> bool {
    match self.inner.tokens.get(translation) {
      Some(token) => {
        token.cancel();
        info!(translation, "cancellation requested");
        true
      }
      None => false,
    }
  }

  /// Remove a translation's offline copy.
  ///
  /// Ignored while the translation is downloading. On a failed deletion the
  /// status becomes `error` and the failure is returned.
  pub async fn delete_download(&self, translation: &str) -> Result<OfflineStatus> {
    let current = self.status(translation)?;
    if current == OfflineStatus::Downloading {
      warn!(translation, "delete ignored while downloading");
      return Ok(current);
    }

    match self.inner.backend.evict_translation(translation).await {
      Ok(_) => {
        self.set_progress(translation, Progress::cleared());
        Ok(
          self
            .apply(translation, StatusEvent::Evicted)?
            .unwrap_or(OfflineStatus::NotDownloaded),
        )
      }
      Err(e) => {
        error!(translation, error = %e, "eviction failed");
        self.apply(translation, StatusEvent::EvictionFailed)?;
        Err(e)
      }
    }
  }

  fn apply(&self, translation: &str, event: StatusEvent) -> Result<Option<OfflineStatus>> {
    let next = self.inner.ledger.apply(translation, event)?;
    if let Some(status) = next {
      self.emit(OfflineEvent::Status {
        translation: translation.to_string(),
        status,
      });
    }
    Ok(next)
  }

  fn set_progress(&self, translation: &str, progress: Progress) {
    self
      .inner
      .progress
      .insert(translation.to_string(), progress.clone());
    self.emit(OfflineEvent::Progress {
      translation: translation.to_string(),
      progress,
    });
  }

  fn emit(&self, event: OfflineEvent) {
    // No receivers is fine
    let _ = self.inner.events.send(event);
  }
}
