//! Prayer journal kept in the app-state database.

use chrono::{DateTime, Local, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::genai::Devotions;
use crate::scripture::{Passage, ScriptureClient};

/// Key of the prayer list in the app-state store
pub const PRAYERS_KEY: &str = "prayerJournal";

/// Suggested verses are always looked up in this translation
pub const SUGGESTION_TRANSLATION: &str = "web";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prayer {
  /// Creation time, RFC 3339 with milliseconds. Unique within the journal.
  pub id: String,
  pub request: String,
  pub date: NaiveDate,
  pub is_answered: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub scripture: Option<String>,
}

/// Prayers, newest first
pub struct Journal {
  db: Arc<Database>,
}

impl Journal {
  pub fn new(db: Arc<Database>) -> Self {
    Self { db }
  }

  pub fn list(&self) -> Result<Vec<Prayer>> {
    Ok(self.db.get_json(PRAYERS_KEY)?.unwrap_or_default())
  }

  /// Record a new prayer request at the top of the journal, dated by the local day
  pub fn add(&self, request: &str, scripture: Option<String>, now: DateTime<Local>) -> Result<Prayer> {
    let request = request.trim();
    if request.is_empty() {
      return Err(Error::Invalid("A prayer request cannot be empty.".to_string()));
    }

    self.db.update_json(PRAYERS_KEY, |prayers: &mut Vec<Prayer>| {
      let prayer = Prayer {
        id: unique_id(prayers, now.with_timezone(&Utc)),
        request: request.to_string(),
        date: now.date_naive(),
        is_answered: false,
        scripture,
      };
      prayers.insert(0, prayer.clone());
      info!(id = %prayer.id, "prayer added");
      Ok(prayer)
    })
  }

  /// Flip the answered mark of a prayer
  pub fn toggle_answered(&self, id: &str) -> Result<Prayer> {
    self.db.update_json(PRAYERS_KEY, |prayers: &mut Vec<Prayer>| {
      let prayer = prayers
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or_else(|| Error::NotFound(format!("No prayer with id '{}'", id)))?;
      prayer.is_answered = !prayer.is_answered;
      Ok(prayer.clone())
    })
  }

  /// Delete a prayer. Returns whether it existed.
  pub fn remove(&self, id: &str) -> Result<bool> {
    self.db.update_json(PRAYERS_KEY, |prayers: &mut Vec<Prayer>| {
      let before = prayers.len();
      prayers.retain(|p| p.id != id);
      Ok(prayers.len() != before)
    })
  }
}

fn unique_id(prayers: &[Prayer], now: DateTime<Utc>) -> String {
  let base = now.to_rfc3339_opts(SecondsFormat::Millis, true);
  let mut id = base.clone();
  let mut n = 1;
  while prayers.iter().any(|p| p.id == id) {
    n += 1;
    id = format!("{}-{}", base, n);
  }
  id
}

/// Ask for a verse fitting a prayer and look it up.
pub async fn suggest_scripture(
  devotions: &Devotions,
  scripture: &ScriptureClient,
  request: &str,
) -> Result<Passage> {
  let reference = devotions.suggest_verse(request).await?;
  if reference.is_empty() {
    return Err(Error::Provider("Could not find a suitable verse.".to_string()));
  }
  scripture.fetch_passage(&reference, SUGGESTION_TRANSLATION).await
}
