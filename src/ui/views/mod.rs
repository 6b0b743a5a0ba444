mod passage;
mod translations;

pub use passage::draw_passage;
pub use translations::draw_translations;
