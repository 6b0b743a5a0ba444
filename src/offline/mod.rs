//! Offline copies of whole translations: status ledger, bulk download and eviction.

pub mod backend;
pub mod coordinator;
pub mod eviction;
pub mod ledger;
pub mod status;

pub use backend::{OfflineBackend, ScriptureBackend};
pub use coordinator::{DownloadCoordinator, DownloadOutcome, OfflineEvent, OfflineSnapshot};
pub use eviction::evict_translation;
pub use ledger::StatusLedger;
pub use status::{percentage, OfflineStatus, Progress, StatusEvent};
