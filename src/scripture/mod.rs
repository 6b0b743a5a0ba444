//! Scripture lookup: canon, API types and the lookup client.

pub mod canon;
pub mod client;
pub mod types;

pub use canon::{download_units, total_chapters, Book, DownloadUnit, NEW_TESTAMENT};
pub use client::{encode_reference, selects_translation, ScriptureClient};
pub use types::{daily_verse, translation, Passage, Translation, Verse, TRANSLATIONS};
