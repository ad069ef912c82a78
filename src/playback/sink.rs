//! Rendering sinks
//!
//! The surface a playback writes to. A sink only displays what it is given;
//! it never drives timing.

use std::io::{self, Write};

use crate::utils::preview_markup;

/// Display surface for content, labels and discovery progress
pub trait RenderSink: Send {
    /// Replace the displayed page with `html`
    fn show_content(&mut self, html: &str);
    fn show_date(&mut self, label: &str);
    /// `current / total` frame counter
    fn show_frame(&mut self, label: &str);
    /// Processed-count label while discovery runs
    fn show_progress(&mut self, label: &str);
    /// Blank content, date and frame labels
    fn clear(&mut self);
}

/// Blank the display between playbacks.
///
/// A running [`super::Playback`] holds the sink mutably, so this cannot be
/// called mid-playback.
pub fn clear_display(sink: &mut dyn RenderSink) {
    sink.clear();
}

/// Line-oriented sink for terminals
pub struct TerminalSink<W: Write + Send> {
    out: W,
    preview_bytes: usize,
    zoom_percent: u32,
    date: String,
}

impl TerminalSink<io::Stdout> {
    pub fn stdout(preview_bytes: usize, zoom_percent: u32) -> Self {
        Self::new(io::stdout(), preview_bytes, zoom_percent)
    }
}

impl<W: Write + Send> TerminalSink<W> {
    pub fn new(out: W, preview_bytes: usize, zoom_percent: u32) -> Self {
        Self {
            out,
            preview_bytes,
            zoom_percent,
            date: String::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> RenderSink for TerminalSink<W> {
    fn show_content(&mut self, html: &str) {
        let _ = writeln!(
            self.out,
            "── page ({} bytes, zoom {}%) ──\n{}",
            html.len(),
            self.zoom_percent,
            preview_markup(html, self.preview_bytes)
        );
    }

    fn show_date(&mut self, label: &str) {
        self.date = label.to_string();
    }

    // Date and counter always arrive together; print them as one line.
    fn show_frame(&mut self, label: &str) {
        let _ = writeln!(self.out, "[{}] {}", label, self.date);
        let _ = self.out.flush();
    }

    fn show_progress(&mut self, label: &str) {
        let _ = writeln!(self.out, "Processed: {}", label);
    }

    fn clear(&mut self) {
        self.date.clear();
        let _ = writeln!(self.out, "── cleared ──");
    }
}
