use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// A single verse of a passage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
  pub book_name: String,
  pub chapter: u32,
  pub verse: u32,
  pub text: String,
}

/// A looked-up passage as returned by the scripture API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
  pub reference: String,
  #[serde(default)]
  pub verses: Vec<Verse>,
  pub text: String,
  pub translation_id: String,
  pub translation_name: String,
  #[serde(default)]
  pub translation_note: String,
}

/// Error body returned by the scripture API on failure
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiError {
  pub error: String,
}

/// A translation the scripture API serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translation {
  pub id: &'static str,
  pub name: &'static str,
}

pub const TRANSLATIONS: &[Translation] = &[
  Translation {
    id: "kjv",
    name: "King James Version",
  },
  Translation {
    id: "web",
    name: "World English Bible",
  },
  Translation {
    id: "webbe",
    name: "World English Bible (British Edition)",
  },
  Translation {
    id: "bbe",
    name: "Bible in Basic English",
  },
  Translation {
    id: "oeb-us",
    name: "Open English Bible (US Edition)",
  },
  Translation {
    id: "ylt",
    name: "Young's Literal Translation",
  },
];

/// Find a supported translation by id
pub fn translation(id: &str) -> Option<&'static Translation> {
  TRANSLATIONS.iter().find(|t| t.id.eq_ignore_ascii_case(id))
}

pub const DAILY_VERSES: &[&str] = &[
  "John 3:16",
  "Romans 8:28",
  "Philippians 4:13",
  "Proverbs 3:5-6",
  "Jeremiah 29:11",
  "1 Corinthians 10:13",
  "Psalm 23:1-4",
  "Ephesians 2:8-9",
  "Galatians 5:22-23",
  "Hebrews 11:1",
];

/// The suggested verse for a given day, rotating by day of year
pub fn daily_verse(date: NaiveDate) -> &'static str {
  DAILY_VERSES[date.ordinal() as usize % DAILY_VERSES.len()]
}
