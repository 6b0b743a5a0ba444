use crate::error::Error;
use crate::lookup::{LookupState, PassageLookup};
use crate::scripture::Passage;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

pub fn draw_passage(frame: &mut Frame, area: Rect, lookup: Option<&PassageLookup>) {
  let title = match lookup.map(|l| (l, l.state())) {
    Some((l, LookupState::Loading)) => format!(" {} (loading...) ", l.reference()),
    Some((_, LookupState::Loaded(p))) => format!(" {} ({}) ", p.reference, p.translation_name),
    Some((l, LookupState::Failed(_))) => format!(" {} [{}] ", l.reference(), l.translation()),
    None => " Passage ".to_string(),
  };

  let block = Block::default()
    .title(title)
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  let paragraph = match lookup.map(PassageLookup::state) {
    None => Paragraph::new("Press / to look up a reference, e.g. John 3:16")
      .style(Style::default().fg(Color::DarkGray)),
    Some(LookupState::Loading) => {
      Paragraph::new("Looking up passage...").style(Style::default().fg(Color::DarkGray))
    }
    Some(LookupState::Failed(e)) => Paragraph::new(format!("{}\n\n{}", e, failure_hint(e)))
      .style(Style::default().fg(Color::Red)),
    Some(LookupState::Loaded(passage)) => Paragraph::new(passage_lines(passage)),
  };

  frame.render_widget(paragraph.block(block).wrap(Wrap { trim: false }), area);
}

fn failure_hint(error: &Error) -> &'static str {
  match error {
    Error::Network(_) => "Download this translation to read it offline. Press 'r' to retry.",
    _ => "Press 'r' to retry.",
  }
}

/// One line per verse with a dimmed verse number
fn passage_lines(passage: &Passage) -> Vec<Line<'_>> {
  if passage.verses.is_empty() {
    return vec![Line::raw(passage.text.trim())];
  }

  passage
    .verses
    .iter()
    .map(|v| {
      Line::from(vec![
        Span::styled(format!("{:>3} ", v.verse), Style::default().fg(Color::DarkGray)),
        Span::raw(v.text.trim()),
      ])
    })
    .collect()
}
