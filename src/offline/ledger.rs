//! Durable `translation id -> OfflineStatus` map.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use super::status::{OfflineStatus, StatusEvent};
use crate::db::Database;
use crate::error::{Error, Result};

/// Key of the persisted status map in the app-state store
pub const STATUSES_KEY: &str = "offlineStatuses";

struct LedgerState {
  db: Arc<Database>,
  statuses: BTreeMap<String, OfflineStatus>,
}

/// Offline status ledger backed by the app-state database.
///
/// Statuses change only through [`StatusLedger::apply`], so every persisted
/// value is reachable through the transition table.
pub struct StatusLedger {
  state: Mutex<LedgerState>,
}

impl StatusLedger {
  /// Load the ledger. A `downloading` entry cannot have survived a restart and
  /// is reset to `not_downloaded`.
  pub fn open(db: Arc<Database>) -> Result<Self> {
    let mut statuses: BTreeMap<String, OfflineStatus> =
      db.get_json(STATUSES_KEY)?.unwrap_or_default();

    let mut reset = 0;
    for status in statuses.values_mut() {
      if *status == OfflineStatus::Downloading {
        *status = OfflineStatus::NotDownloaded;
        reset += 1;
      }
    }
    if reset > 0 {
      info!(reset, "reset interrupted downloads");
      db.put_json(STATUSES_KEY, &statuses)?;
    }

    Ok(Self {
      state: Mutex::new(LedgerState { db, statuses }),
    })
  }

  fn lock(&self) -> Result<MutexGuard<'_, LedgerState>> {
    self
      .state
      .lock()
      .map_err(|e| Error::Storage(format!("Ledger lock poisoned: {}", e)))
  }

  /// Status of a translation; unknown ids are `not_downloaded`
  pub fn status(&self, translation: &str) -> Result<OfflineStatus> {
    Ok(self.lock()?.statuses.get(translation).copied().unwrap_or_default())
  }

  pub fn statuses(&self) -> Result<BTreeMap<String, OfflineStatus>> {
    Ok(self.lock()?.statuses.clone())
  }

  /// Apply an event and persist the result.
  ///
  /// Returns the new status, or `None` if the event is not valid from the
  /// current status (nothing changes). The in-memory status moves even when
  /// persisting fails; the write error is still returned.
  pub fn apply(&self, translation: &str, event: StatusEvent) -> Result<Option<OfflineStatus>> {
    let mut state = self.lock()?;
    let current = state.statuses.get(translation).copied().unwrap_or_default();
    let Some(next) = current.apply(event) else {
      debug!(translation, %current, ?event, "transition rejected");
      return Ok(None);
    };

    state.statuses.insert(translation.to_string(), next);
    debug!(translation, from = %current, to = %next, "status changed");

    let LedgerState { db, statuses } = &*state;
    db.put_json(STATUSES_KEY, statuses)?;
    Ok(Some(next))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_unknown_translation_defaults_to_not_downloaded() {
    let ledger = StatusLedger::open(Arc::new(Database::in_memory().unwrap())).unwrap();
    assert_eq!(ledger.status("kjv").unwrap(), OfflineStatus::NotDownloaded);
    assert!(ledger.statuses().unwrap().is_empty());
  }

  #[test]
  fn test_rejected_event_changes_nothing() {
    let ledger = StatusLedger::open(Arc::new(Database::in_memory().unwrap())).unwrap();
    assert_eq!(
      ledger.apply("kjv", StatusEvent::Started).unwrap(),
      Some(OfflineStatus::Downloading)
    );
    assert_eq!(ledger.apply("kjv", StatusEvent::Started).unwrap(), None);
    assert_eq!(ledger.apply("kjv", StatusEvent::Evicted).unwrap(), None);
    assert_eq!(ledger.status("kjv").unwrap(), OfflineStatus::Downloading);
  }

  #[test]
  fn test_statuses_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.db");

    {
      let ledger = StatusLedger::open(Arc::new(Database::open_at(&path).unwrap())).unwrap();
      ledger.apply("kjv", StatusEvent::Started).unwrap();
      ledger.apply("kjv", StatusEvent::Completed).unwrap();
      ledger.apply("web", StatusEvent::Started).unwrap();
    }

    let ledger = StatusLedger::open(Arc::new(Database::open_at(&path).unwrap())).unwrap();
    assert_eq!(ledger.status("kjv").unwrap(), OfflineStatus::Downloaded);
    // Interrupted by the restart
    assert_eq!(ledger.status("web").unwrap(), OfflineStatus::NotDownloaded);
  }

  #[test]
  fn test_persisted_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.db");
    let ledger = StatusLedger::open(Arc::new(Database::open_at(&path).unwrap())).unwrap();
    ledger.apply("ylt", StatusEvent::EvictionFailed).unwrap();
    drop(ledger);

    let raw: serde_json::Value = Database::open_at(&path)
      .unwrap()
      .get_json(STATUSES_KEY)
      .unwrap()
      .unwrap();
    assert_eq!(raw, serde_json::json!({ "ylt": "error" }));
  }
}
