//! Lumina: a scripture reader whose network traffic passes through a durable
//! offline cache, with whole-translation downloads for reading without a
//! connection. A prayer journal, bookmarks and reading plans live in the same
//! local app-state store.

pub mod app;
pub mod bookmarks;
pub mod cache;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod event;
pub mod genai;
pub mod intercept;
pub mod journal;
pub mod logging;
pub mod lookup;
pub mod offline;
pub mod plans;
pub mod scripture;
pub mod ui;

pub use error::{Error, Result};
