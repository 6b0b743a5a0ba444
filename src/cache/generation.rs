//! Cache generations: named epochs of the response store.

use std::fmt;

/// The current set of cache partitions.
///
/// Bumping `version` makes every entry of older generations unreachable; they are
/// physically removed the next time the cache is activated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheGeneration {
  app: String,
  version: u32,
}

/// Which partition of the current generation a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
  /// Scripture API responses
  Api,
  /// App shell and static assets
  Static,
}

impl CacheGeneration {
  pub fn new(app: impl Into<String>, version: u32) -> Self {
    Self {
      app: app.into(),
      version,
    }
  }

  /// The next generation of the same app.
  pub fn bump(&self) -> Self {
    Self::new(self.app.clone(), self.version + 1)
  }

  /// Name of a partition in this generation, e.g. `lumina-api-v3`.
  pub fn partition(&self, partition: Partition) -> String {
    let kind = match partition {
      Partition::Api => "api",
      Partition::Static => "static",
    };
    format!("{}-{}-v{}", self.app, kind, self.version)
  }

  /// Whether a stored partition name belongs to this generation.
  pub fn is_current(&self, name: &str) -> bool {
    name == self.partition(Partition::Api) || name == self.partition(Partition::Static)
  }
}

impl fmt::Display for CacheGeneration {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-v{}", self.app, self.version)
  }
}
