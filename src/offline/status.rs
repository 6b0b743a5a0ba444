//! Per-translation offline status and download progress.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::scripture::DownloadUnit;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfflineStatus {
  #[default]
  NotDownloaded,
  Downloading,
  Downloaded,
  Error,
}

/// Something that happened to a translation's offline copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
  Started,
  Completed,
  Failed,
  Cancelled,
  Evicted,
  EvictionFailed,
}

impl OfflineStatus {
  /// Status after `event`, or `None` when the event is not valid from this status.
  pub fn apply(self, event: StatusEvent) -> Option<Self> {
    use OfflineStatus::*;
    use StatusEvent::*;

    match (self, event) {
      (Downloading, Started) => None,
      (_, Started) => Some(Downloading),
      (Downloading, Completed) => Some(Downloaded),
      (Downloading, Failed) => Some(Error),
      (Downloading, Cancelled) => Some(NotDownloaded),
      (Downloading, Evicted | EvictionFailed) => None,
      (_, Evicted) => Some(NotDownloaded),
      (_, EvictionFailed) => Some(Error),
      (_, Completed | Failed | Cancelled) => None,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::NotDownloaded => "not_downloaded",
      Self::Downloading => "downloading",
      Self::Downloaded => "downloaded",
      Self::Error => "error",
    }
  }
}

impl fmt::Display for OfflineStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
  /// 0 to 100
  pub percentage: u8,
  pub details: String,
}

impl Progress {
  pub fn new(percentage: u8, details: impl Into<String>) -> Self {
    Self {
      percentage,
      details: details.into(),
    }
  }

  pub fn starting() -> Self {
    Self::new(0, "Starting...")
  }

  pub fn completed() -> Self {
    Self::new(100, "Completed")
  }

  pub fn cleared() -> Self {
    Self::new(0, "")
  }

  /// Progress after finishing `unit`, the `done`-th of `total`
  pub fn downloading(unit: &DownloadUnit, done: usize, total: usize) -> Self {
    Self::new(
      percentage(done, total),
      format!(
        "Downloading {} {}/{}",
        unit.book, unit.chapter, unit.book_chapters
      ),
    )
  }

  /// Terminal failure, keeping the last percentage reached
  pub fn failed(&self, reason: &str) -> Self {
    Self::new(self.percentage, format!("Download failed: {}", reason))
  }
}

/// Completed share of a run, rounded half up. An empty run is complete.
pub fn percentage(done: usize, total: usize) -> u8 {
  if total == 0 {
    return 100;
  }
  let done = done.min(total);
  ((200 * done + total) / (2 * total)) as u8
}
