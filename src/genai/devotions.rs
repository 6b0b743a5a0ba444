//! Devotional writing, question answering and study outlines on top of a
//! [`TextGenerator`].
//!
//! Every operation except [`Devotions::suggest_verse`] returns a readable
//! fallback instead of an error, so callers can always show something.

use std::sync::Arc;
use tracing::error;

use super::client::{TextGenerator, MISSING_KEY_MESSAGE};
use crate::error::{Error, Result};

const DEVOTIONAL_SYSTEM: &str =
  "You are a warm, insightful Bible devotional writer. Your tone should be encouraging and accessible.";
const SUGGEST_SYSTEM: &str =
  "You are an AI assistant that finds comforting Bible verses. Your only output should be a scripture reference.";
const ANSWER_SYSTEM: &str = "You are a helpful and knowledgeable Bible assistant. Answer theological questions in a clear, plain-language way, citing scripture references (e.g., John 3:16) where appropriate. Be respectful and focus on mainstream Christian theology. Keep answers concise and well-structured.";
const OUTLINE_SYSTEM: &str = "You create clear, insightful, and well-structured Bible study outlines.";

pub const DEVOTIONAL_FALLBACK: &str = "Could not generate devotional at this time. Please try again later.";
pub const ANSWER_FALLBACK: &str =
  "Could not get an answer at this time. Please check your connection and try again.";
pub const OUTLINE_FALLBACK: &str = "Could not generate an outline at this time. Please try again later.";
pub const SUGGEST_FAILED: &str = "Could not suggest a verse at this time.";

pub struct Devotions {
  generator: Arc<dyn TextGenerator>,
}

impl Devotions {
  pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
    Self { generator }
  }

  /// Short devotional on a verse
  pub async fn devotional(&self, reference: &str, text: &str) -> String {
    let prompt = format!(
      "The Bible verse is {}: \"{}\". Provide a short, uplifting devotional (around 150 words). \
       Explain its historical and theological context, key themes, and offer a practical \
       application for today's life. Format it with markdown for readability (e.g., use bold for headers).",
      reference, text
    );
    self
      .or_fallback(
        "devotional",
        self.generator.generate(&prompt, DEVOTIONAL_SYSTEM, 0.7).await,
        DEVOTIONAL_FALLBACK,
      )
  }

  /// Suggest a single verse reference for a prayer concern.
  ///
  /// Unlike the other operations this surfaces failures: there is no sensible default verse.
  pub async fn suggest_verse(&self, prayer: &str) -> Result<String> {
    let prompt = format!(
      "Based on the following prayer concern, suggest a single, relevant, and comforting Bible \
       verse reference (e.g., 'John 3:16'). ONLY return the single verse reference and nothing else. \
       Prayer: \"{}\"",
      prayer
    );

    match self.generator.generate(&prompt, SUGGEST_SYSTEM, 0.3).await {
      Ok(text) => Ok(text.trim().replace('`', "")),
      Err(Error::Provider(msg)) if msg == MISSING_KEY_MESSAGE => Err(Error::Provider(msg)),
      Err(e) => {
        error!(error = %e, "verse suggestion failed");
        Err(Error::Provider(SUGGEST_FAILED.to_string()))
      }
    }
  }

  pub async fn answer(&self, question: &str) -> String {
    self.or_fallback(
      "answer",
      self.generator.generate(question, ANSWER_SYSTEM, 0.5).await,
      ANSWER_FALLBACK,
    )
  }

  /// Study outline for a passage
  pub async fn sermon_outline(&self, passage: &str, text: &str) -> String {
    let prompt = format!(
      "You are a theological assistant who creates study outlines. Based on the passage {}: \"{}\", \
       generate a concise study outline. Use markdown formatting. Provide an introduction, 3-4 key \
       points with brief explanations, and a section for practical application or reflection.",
      passage, text
    );
    self.or_fallback(
      "outline",
      self.generator.generate(&prompt, OUTLINE_SYSTEM, 0.6).await,
      OUTLINE_FALLBACK,
    )
  }

  fn or_fallback(&self, operation: &str, result: Result<String>, fallback: &str) -> String {
    match result {
      Ok(text) => text,
      // Missing credential gets its own message so the user knows what to fix
      Err(Error::Provider(msg)) if msg == MISSING_KEY_MESSAGE => msg,
      Err(e) => {
        error!(operation, error = %e, "generation failed");
        fallback.to_string()
      }
    }
  }
}
