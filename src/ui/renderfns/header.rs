use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar with logo, scripture host, translation and shortcuts
pub fn draw_header(frame: &mut Frame, area: Rect, scripture_url: &str, translation: &str) {
  let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Cyan));
  let label = |l: &'static str| Span::styled(l, Style::default().fg(Color::DarkGray));

  let header = Line::from(vec![
    Span::styled(" lumina ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", extract_domain(scripture_url)),
      Style::default().fg(Color::White),
    ),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", translation),
      Style::default().fg(Color::Yellow).bold(),
    ),
    Span::raw("  "),
    key("<d>"),
    label(" download"),
    Span::raw("   "),
    key("<c>"),
    label(" cancel"),
    Span::raw("   "),
    key("<x>"),
    label(" delete"),
    Span::raw("   "),
    key("</>"),
    label(" look up"),
    Span::raw("   "),
    key("<q>"),
    label(" quit"),
  ]);

  let paragraph = Paragraph::new(header).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}

/// Host (and port) of a URL
fn extract_domain(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_extract_domain() {
    assert_eq!(extract_domain("https://bible-api.com/"), "bible-api.com");
    assert_eq!(extract_domain("http://127.0.0.1:8080/api"), "127.0.0.1:8080");
  }
}
