use crate::context::AppContext;
use crate::event::{Event, EventHandler};
use crate::lookup::PassageLookup;
use crate::offline::{DownloadOutcome, OfflineSnapshot, OfflineStatus, Progress};
use crate::scripture::{Translation, TRANSLATIONS};
use crate::ui;
use crate::ui::components::{InputResult, TextInput};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Input mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  Normal,
  /// Typing a reference to look up in the selected translation
  Lookup,
}

/// One line of the translations list
#[derive(Debug, Clone)]
pub struct TranslationRow {
  pub translation: &'static Translation,
  pub status: OfflineStatus,
  pub progress: Option<Progress>,
}

/// Main application state
pub struct App {
  ctx: Arc<AppContext>,

  /// Index into `TRANSLATIONS`
  selected: usize,

  /// Last known offline state, refreshed on every coordinator event
  snapshot: OfflineSnapshot,

  mode: Mode,
  lookup_input: TextInput,

  /// Passage shown in the reading pane
  passage: Option<PassageLookup>,

  /// Status bar message
  message: Option<String>,

  /// Event sender for async tasks
  event_tx: mpsc::UnboundedSender<Event>,

  should_quit: bool,
}

impl App {
  pub fn new(ctx: Arc<AppContext>) -> Result<Self> {
    let snapshot = ctx.downloads.snapshot()?;
    let selected = TRANSLATIONS
      .iter()
      .position(|t| t.id == ctx.default_translation())
      .unwrap_or(0);
    let (tx, _rx) = mpsc::unbounded_channel();

    Ok(Self {
      ctx,
      selected,
      snapshot,
      mode: Mode::Normal,
      lookup_input: TextInput::new(),
      passage: None,
      message: None,
      event_tx: tx,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250), self.ctx.downloads.subscribe());
    self.event_tx = events.sender();

    let result = self.event_loop(&mut terminal, &mut events).await;

    // Cleanup terminal, even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop<B: Backend>(
    &mut self,
    terminal: &mut Terminal<B>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      if let Some(event) = events.next().await {
        self.handle_event(event)?;
      }
    }
    Ok(())
  }

  fn handle_event(&mut self, event: Event) -> Result<()> {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {
        if let Some(lookup) = self.passage.as_mut() {
          lookup.poll();
        }
      }
      Event::Offline(_) => self.snapshot = self.ctx.downloads.snapshot()?,
      Event::Message(msg) => self.message = Some(msg),
    }
    Ok(())
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }
    match self.mode {
      Mode::Normal => self.handle_normal_mode_key(key),
      Mode::Lookup => self.handle_lookup_mode_key(key),
    }
  }

  fn handle_normal_mode_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Char('q') => self.should_quit = true,

      // Navigation
      KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
      KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),

      // Offline copies
      KeyCode::Char('d') => self.start_download(),
      KeyCode::Char('c') => self.cancel_download(),
      KeyCode::Char('x') => self.delete_download(),

      // Reading
      KeyCode::Char('/') => {
        self.mode = Mode::Lookup;
        self.lookup_input.clear();
      }
      KeyCode::Char('r') => {
        if let Some(lookup) = self.passage.as_mut() {
          lookup.retry();
        }
      }
      KeyCode::Char('b') => self.toggle_bookmark(),

      _ => {}
    }
  }

  fn handle_lookup_mode_key(&mut self, key: KeyEvent) {
    match self.lookup_input.handle_key(key) {
      InputResult::Submitted(reference) => {
        self.mode = Mode::Normal;
        self.lookup(reference);
      }
      InputResult::Cancelled => self.mode = Mode::Normal,
      InputResult::Consumed | InputResult::NotHandled => {}
    }
  }

  fn move_selection(&mut self, delta: i32) {
    let len = TRANSLATIONS.len() as i32;
    self.selected = (self.selected as i32 + delta).rem_euclid(len) as usize;
  }

  fn selected_translation(&self) -> &'static Translation {
    &TRANSLATIONS[self.selected]
  }

  fn start_download(&mut self) {
    let id = self.selected_translation().id;
    let downloads = self.ctx.downloads.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      let message = match downloads.start_download(id).await {
        Ok(DownloadOutcome::AlreadyRunning) => format!("{} is already downloading", id),
        Ok(DownloadOutcome::Completed) => format!("{} is available offline", id),
        Ok(DownloadOutcome::Cancelled) => format!("{} download cancelled", id),
        Ok(DownloadOutcome::Failed(e)) => format!("{} download failed: {}", id, e),
        Err(e) => e.to_string(),
      };
      let _ = tx.send(Event::Message(message));
    });
  }

  fn cancel_download(&mut self) {
    let id = self.selected_translation().id;
    if !self.ctx.downloads.cancel_download(id) {
      self.message = Some(format!("{} is not downloading", id));
    }
  }

  fn delete_download(&mut self) {
    let id = self.selected_translation().id;
    let downloads = self.ctx.downloads.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      let message = match downloads.delete_download(id).await {
        Ok(OfflineStatus::Downloading) => format!("Cancel the {} download before deleting it", id),
        Ok(_) => format!("Removed offline copy of {}", id),
        Err(e) => format!("Could not remove {}: {}", id, e),
      };
      let _ = tx.send(Event::Message(message));
    });
  }

  fn lookup(&mut self, reference: String) {
    let translation = self.selected_translation().id;
    self.passage = Some(PassageLookup::start(
      self.ctx.scripture.clone(),
      &reference,
      translation,
    ));
  }

  fn toggle_bookmark(&mut self) {
    let Some(passage) = self.passage.as_ref().and_then(PassageLookup::passage) else {
      self.message = Some("Look up a passage to bookmark it".to_string());
      return;
    };
    self.message = Some(match self.ctx.bookmarks.toggle_passage(passage, chrono::Utc::now()) {
      Ok(true) => format!("Bookmarked {}", passage.reference),
      Ok(false) => format!("Removed bookmark for {}", passage.reference),
      Err(e) => e.to_string(),
    });
  }

  // Accessors for UI rendering
  pub fn rows(&self) -> Vec<TranslationRow> {
    TRANSLATIONS
      .iter()
      .map(|t| TranslationRow {
        translation: t,
        status: self.snapshot.status(t.id),
        progress: self.snapshot.progress.get(t.id).cloned(),
      })
      .collect()
  }

  pub fn selected(&self) -> usize {
    self.selected
  }

  pub fn mode(&self) -> Mode {
    self.mode
  }

  pub fn lookup_input(&self) -> &TextInput {
    &self.lookup_input
  }

  pub fn passage(&self) -> Option<&PassageLookup> {
    self.passage.as_ref()
  }

  pub fn message(&self) -> Option<&str> {
    self.message.as_deref()
  }

  pub fn scripture_url(&self) -> &str {
    self.ctx.scripture.base_url().as_str()
  }
}
