//! Bookmarked verses with personal notes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::scripture::{Passage, Verse};

/// Key of the bookmark list in the app-state store
pub const BOOKMARKS_KEY: &str = "bookmarks";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
  /// See [`bookmark_id`]
  pub id: String,
  /// `Book chapter:verse`
  pub reference: String,
  pub text: String,
  /// Display name of the translation
  pub translation: String,
  #[serde(default)]
  pub notes: Vec<String>,
  pub created_at: DateTime<Utc>,
}

/// Stable id of a verse under a translation, e.g. `1-john-4-8-kjv`
pub fn bookmark_id(verse: &Verse, translation_id: &str) -> String {
  format!(
    "{}-{}-{}-{}",
    verse.book_name.to_lowercase().replace(' ', "-"),
    verse.chapter,
    verse.verse,
    translation_id
  )
}

/// Bookmarks, newest first
pub struct Bookmarks {
  db: Arc<Database>,
}

impl Bookmarks {
  pub fn new(db: Arc<Database>) -> Self {
    Self { db }
  }

  pub fn list(&self) -> Result<Vec<Bookmark>> {
    Ok(self.db.get_json(BOOKMARKS_KEY)?.unwrap_or_default())
  }

  pub fn get(&self, id: &str) -> Result<Option<Bookmark>> {
    Ok(self.list()?.into_iter().find(|b| b.id == id))
  }

  /// Bookmark every verse of a passage, or remove them all if every verse is
  /// already bookmarked. Returns whether the passage is bookmarked afterwards.
  pub fn toggle_passage(&self, passage: &Passage, now: DateTime<Utc>) -> Result<bool> {
    if passage.verses.is_empty() {
      return Err(Error::Invalid(format!(
        "{} has no verses to bookmark",
        passage.reference
      )));
    }

    let ids: Vec<String> = passage
      .verses
      .iter()
      .map(|v| bookmark_id(v, &passage.translation_id))
      .collect();

    self.db.update_json(BOOKMARKS_KEY, |bookmarks: &mut Vec<Bookmark>| {
      let all_marked = ids.iter().all(|id| bookmarks.iter().any(|b| &b.id == id));
      if all_marked {
        bookmarks.retain(|b| !ids.contains(&b.id));
        return Ok(false);
      }

      // Verses keep passage order at the top of the list
      let fresh: Vec<Bookmark> = passage
        .verses
        .iter()
        .zip(&ids)
        .filter(|(_, id)| !bookmarks.iter().any(|b| &b.id == *id))
        .map(|(verse, id)| Bookmark {
          id: id.clone(),
          reference: format!("{} {}:{}", verse.book_name, verse.chapter, verse.verse),
          text: verse.text.trim().to_string(),
          translation: passage.translation_name.clone(),
          notes: Vec::new(),
          created_at: now,
        })
        .collect();
      bookmarks.splice(0..0, fresh);
      Ok(true)
    })
  }

  /// Delete a bookmark and its notes. Returns whether it existed.
  pub fn remove(&self, id: &str) -> Result<bool> {
    self.db.update_json(BOOKMARKS_KEY, |bookmarks: &mut Vec<Bookmark>| {
      let before = bookmarks.len();
      bookmarks.retain(|b| b.id != id);
      Ok(bookmarks.len() != before)
    })
  }

  pub fn add_note(&self, id: &str, note: &str) -> Result<Bookmark> {
    let note = note.trim();
    if note.is_empty() {
      return Err(Error::Invalid("A note cannot be empty.".to_string()));
    }
    self.edit(id, |bookmark| {
      bookmark.notes.push(note.to_string());
      Ok(())
    })
  }

  /// Remove the note at `index` (0-based)
  pub fn remove_note(&self, id: &str, index: usize) -> Result<Bookmark> {
    self.edit(id, |bookmark| {
      if index >= bookmark.notes.len() {
        return Err(Error::Invalid(format!(
          "{} has no note {}",
          bookmark.reference,
          index + 1
        )));
      }
      bookmark.notes.remove(index);
      Ok(())
    })
  }

  fn edit<F>(&self, id: &str, f: F) -> Result<Bookmark>
  where
    F: FnOnce(&mut Bookmark) -> Result<()>,
  {
    self.db.update_json(BOOKMARKS_KEY, |bookmarks: &mut Vec<Bookmark>| {
      let bookmark = bookmarks
        .iter_mut()
        .find(|b| b.id == id)
        .ok_or_else(|| Error::NotFound(format!("No bookmark with id '{}'", id)))?;
      f(bookmark)?;
      Ok(bookmark.clone())
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn verse(book: &str, chapter: u32, verse: u32, text: &str) -> Verse {
    Verse {
      book_name: book.to_string(),
      chapter,
      verse,
      text: text.to_string(),
    }
  }

  fn passage(verses: Vec<Verse>) -> Passage {
    Passage {
      reference: "1 John 4:7-8".to_string(),
      verses,
      text: String::new(),
      translation_id: "kjv".to_string(),
      translation_name: "King James Version".to_string(),
      translation_note: String::new(),
    }
  }

  fn bookmarks() -> Bookmarks {
    Bookmarks::new(Arc::new(Database::in_memory().unwrap()))
  }

  #[test]
  fn test_bookmark_id_format() {
    let v = verse("1 John", 4, 8, "God is love.");
    assert_eq!(bookmark_id(&v, "kjv"), "1-john-4-8-kjv");
  }

  #[test]
  fn test_toggle_adds_then_removes_passage() {
    let store = bookmarks();
    let p = passage(vec![
      verse("1 John", 4, 7, "Beloved, let us love one another\n"),
      verse("1 John", 4, 8, "God is love."),
    ]);

    assert!(store.toggle_passage(&p, Utc::now()).unwrap());
    let listed = store.list().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].reference, "1 John 4:7");
    assert_eq!(listed[0].text, "Beloved, let us love one another");
    assert_eq!(listed[0].translation, "King James Version");

    assert!(!store.toggle_passage(&p, Utc::now()).unwrap());
    assert!(store.list().unwrap().is_empty());
  }

  #[test]
  fn test_partially_marked_passage_fills_the_gaps() {
    let store = bookmarks();
    let single = passage(vec![verse("1 John", 4, 8, "God is love.")]);
    store.toggle_passage(&single, Utc::now()).unwrap();
    store.add_note("1-john-4-8-kjv", "Memorise").unwrap();

    let both = passage(vec![
      verse("1 John", 4, 7, "Beloved"),
      verse("1 John", 4, 8, "God is love."),
    ]);
    assert!(store.toggle_passage(&both, Utc::now()).unwrap());

    let listed = store.list().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, "1-john-4-7-kjv");
    // The existing bookmark keeps its notes
    assert_eq!(listed[1].notes, vec!["Memorise".to_string()]);
  }

  #[test]
  fn test_notes_add_and_remove() {
    let store = bookmarks();
    store
      .toggle_passage(&passage(vec![verse("John", 3, 16, "For God so loved")]), Utc::now())
      .unwrap();

    store.add_note("john-3-16-kjv", " first ").unwrap();
    let bookmark = store.add_note("john-3-16-kjv", "second").unwrap();
    assert_eq!(bookmark.notes, vec!["first".to_string(), "second".to_string()]);

    let bookmark = store.remove_note("john-3-16-kjv", 0).unwrap();
    assert_eq!(bookmark.notes, vec!["second".to_string()]);

    assert!(matches!(store.remove_note("john-3-16-kjv", 5), Err(Error::Invalid(_))));
    assert!(matches!(store.add_note("john-3-16-kjv", "  "), Err(Error::Invalid(_))));
    assert!(matches!(store.add_note("missing", "x"), Err(Error::NotFound(_))));
  }

  #[test]
  fn test_passage_without_verses_is_rejected() {
    let store = bookmarks();
    assert!(matches!(
      store.toggle_passage(&passage(Vec::new()), Utc::now()),
      Err(Error::Invalid(_))
    ));
  }
}
