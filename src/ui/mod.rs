pub mod components;
mod renderfns;
mod views;

use crate::app::{App, Mode};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Status bar
    ])
    .split(frame.area());

  let rows = app.rows();
  let translation = rows
    .get(app.selected())
    .map(|r| r.translation.name)
    .unwrap_or_default();
  renderfns::draw_header(frame, chunks[0], app.scripture_url(), translation);

  let body = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
    .split(chunks[1]);
  views::draw_translations(frame, body[0], &rows, app.selected());
  views::draw_passage(frame, body[1], app.passage());

  draw_status_bar(frame, chunks[2], app);
}

fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App) {
  let (content, style) = match app.mode() {
    Mode::Normal => match app.message() {
      Some(msg) => (format!(" {}", msg), Style::default().fg(Color::White)),
      None => (
        " j/k:nav  d:download  c:cancel  x:delete  /:look up  r:retry  b:bookmark  q:quit".to_string(),
        Style::default().fg(Color::DarkGray),
      ),
    },
    Mode::Lookup => {
      let input = app.lookup_input();
      frame.set_cursor_position((area.x + 1 + input.cursor_position() as u16, area.y));
      (format!("/{}", input.value()), Style::default().fg(Color::Cyan))
    }
  };

  let paragraph = Paragraph::new(content).style(style);
  frame.render_widget(paragraph, area);
}
