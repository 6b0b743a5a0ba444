//! Generative text: the Gemini client and the devotional features built on it.

pub mod client;
pub mod devotions;

pub use client::{GeminiClient, TextGenerator, MISSING_KEY_MESSAGE};
pub use devotions::Devotions;
