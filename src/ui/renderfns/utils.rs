use crate::offline::OfflineStatus;
use ratatui::prelude::Color;

/// Truncate a string to at most `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display color for an offline status
pub fn status_color(status: OfflineStatus) -> Color {
  match status {
    OfflineStatus::Downloaded => Color::Green,
    OfflineStatus::Downloading => Color::Yellow,
    OfflineStatus::Error => Color::Red,
    OfflineStatus::NotDownloaded => Color::White,
  }
}
