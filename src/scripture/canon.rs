//! Canonical book order and the download unit sequence derived from it.

/// A book and how many chapters it has
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Book {
  pub name: &'static str,
  pub chapters: u32,
}

const fn book(name: &'static str, chapters: u32) -> Book {
  Book { name, chapters }
}

/// New Testament books in canonical order. This order defines download progress.
pub const NEW_TESTAMENT: &[Book] = &[
  book("Matthew", 28),
  book("Mark", 16),
  book("Luke", 24),
  book("John", 21),
  book("Acts", 28),
  book("Romans", 16),
  book("1 Corinthians", 16),
  book("2 Corinthians", 13),
  book("Galatians", 6),
  book("Ephesians", 6),
  book("Philippians", 4),
  book("Colossians", 4),
  book("1 Thessalonians", 5),
  book("2 Thessalonians", 3),
  book("1 Timothy", 6),
  book("2 Timothy", 4),
  book("Titus", 3),
  book("Philemon", 1),
  book("Hebrews", 13),
  book("James", 5),
  book("1 Peter", 5),
  book("2 Peter", 3),
  book("1 John", 5),
  book("2 John", 1),
  book("3 John", 1),
  book("Jude", 1),
  book("Revelation", 22),
];

/// One chapter of one book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadUnit {
  pub book: &'static str,
  pub chapter: u32,
  /// Chapter count of the book, for progress messages
  pub book_chapters: u32,
}

impl DownloadUnit {
  /// Reference string understood by the scripture API, e.g. `1 John 3`
  pub fn reference(&self) -> String {
    format!("{} {}", self.book, self.chapter)
  }
}

/// Flatten books into the ordered unit sequence
pub fn download_units(books: &[Book]) -> Vec<DownloadUnit> {
  books
    .iter()
    .flat_map(|b| {
      (1..=b.chapters).map(move |chapter| DownloadUnit {
        book: b.name,
        chapter,
        book_chapters: b.chapters,
      })
    })
    .collect()
}

pub fn total_chapters(books: &[Book]) -> usize {
  books.iter().map(|b| b.chapters as usize).sum()
}
