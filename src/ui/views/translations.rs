use crate::app::TranslationRow;
use crate::offline::OfflineStatus;
use crate::ui::renderfns::{status_color, truncate};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, ListState};

pub fn draw_translations(frame: &mut Frame, area: Rect, rows: &[TranslationRow], selected: usize) {
  let downloading = rows
    .iter()
    .filter(|r| r.status == OfflineStatus::Downloading)
    .count();
  let title = if downloading > 0 {
    format!(" Translations ({} downloading) ", downloading)
  } else {
    " Translations ".to_string()
  };

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));
  let inner = block.inner(area);
  frame.render_widget(block, area);

  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Min(1),    // List
      Constraint::Length(1), // Detail
      Constraint::Length(1), // Gauge
    ])
    .split(inner);

  let items: Vec<ListItem> = rows
    .iter()
    .map(|row| {
      let line = Line::from(vec![
        Span::styled(
          format!("{:<7}", row.translation.id),
          Style::default().fg(Color::Cyan),
        ),
        Span::raw(" "),
        Span::styled(
          format!("{:<15}", row.status.as_str()),
          Style::default().fg(status_color(row.status)),
        ),
        Span::raw(" "),
        Span::raw(truncate(row.translation.name, 40)),
      ]);
      ListItem::new(line)
    })
    .collect();

  let list = List::new(items)
    .highlight_style(
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

  let mut state = ListState::default();
  state.select(Some(selected));
  frame.render_stateful_widget(list, chunks[0], &mut state);

  // Progress of the selected translation
  let Some(progress) = rows.get(selected).and_then(|r| r.progress.as_ref()) else {
    return;
  };

  frame.render_widget(
    ratatui::widgets::Paragraph::new(progress.details.as_str())
      .style(Style::default().fg(Color::DarkGray)),
    chunks[1],
  );
  let gauge = Gauge::default()
    .gauge_style(Style::default().fg(Color::Green).bg(Color::Black))
    .percent(u16::from(progress.percentage.min(100)));
  frame.render_widget(gauge, chunks[2]);
}
