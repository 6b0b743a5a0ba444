use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

use crate::offline::OfflineEvent;

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Periodic tick for UI refresh and lookup polling
  Tick,
  /// Status or progress change from the download coordinator
  Offline(OfflineEvent),
  /// One-line message for the status bar
  Message(String),
}

/// Event handler that merges terminal input, a tick timer and offline events
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration, mut offline: broadcast::Receiver<OfflineEvent>) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // Terminal reads block, so they get their own thread
    let input_tx = tx.clone();
    tokio::task::spawn_blocking(move || loop {
      let event = if event::poll(tick_rate).unwrap_or(false) {
        match event::read() {
          Ok(CrosstermEvent::Key(key)) => Event::Key(key),
          _ => continue,
        }
      } else {
        Event::Tick
      };
      if input_tx.send(event).is_err() {
        break;
      }
    });

    let offline_tx = tx.clone();
    tokio::spawn(async move {
      loop {
        match offline.recv().await {
          Ok(event) => {
            if offline_tx.send(Event::Offline(event)).is_err() {
              break;
            }
          }
          // Missed events are fine: the app re-reads the full snapshot
          Err(broadcast::error::RecvError::Lagged(_)) => continue,
          Err(broadcast::error::RecvError::Closed) => break,
        }
      }
    });

    Self { tx, rx }
  }

  /// Sender for background tasks started by the app
  pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
    self.tx.clone()
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
