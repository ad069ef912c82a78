//! Utils Module
pub mod telemetry;
pub mod text;

pub use telemetry::init_logging;
pub use text::{clip_words, preview_markup};
