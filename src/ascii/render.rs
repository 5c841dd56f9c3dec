//! Frame-to-text composition.

use crossterm::cursor::MoveTo;
use crossterm::terminal::{Clear, ClearType};
use crossterm::Command;

use super::dimensions::DisplayGeometry;
use super::lut::GlyphLut;

/// Row separator. Raw mode does not translate `\n`, so rows carry an explicit
/// carriage return.
pub const ROW_SEPARATOR: &str = "\r\n";

/// Turns raw grayscale frames into a single in-place terminal update.
///
/// The output buffer is reused between frames, so steady-state rendering
/// does not allocate.
pub struct GlyphRenderer {
    lut: GlyphLut,
    geometry: DisplayGeometry,
    buffer: String,
}

impl GlyphRenderer {
    pub fn new(lut: GlyphLut, geometry: DisplayGeometry) -> Self {
        // Each glyph is at most 3 bytes of UTF-8 for the built-in ramps,
        // plus separators and the cursor/status escapes.
        let capacity = geometry.frame_len() * 3
            + geometry.height as usize * ROW_SEPARATOR.len()
            + 256;
        Self {
            lut,
            geometry,
            buffer: String::with_capacity(capacity),
        }
    }

    pub fn geometry(&self) -> DisplayGeometry {
        self.geometry
    }

    /// Compose one frame, and optionally a status line below it.
    ///
    /// The update starts by moving the cursor to the top-left corner so the
    /// previous frame is overwritten rather than scrolled. `frame` must be
    /// exactly `width * height` bytes in row-major order.
    pub fn compose(&mut self, frame: &[u8], status: Option<&str>) -> &str {
        debug_assert_eq!(frame.len(), self.geometry.frame_len());

        self.buffer.clear();
        // Writing ANSI into a String cannot fail.
        let _ = MoveTo(0, 0).write_ansi(&mut self.buffer);

        let width = self.geometry.width as usize;
        for (y, row) in frame.chunks_exact(width).enumerate() {
            if y > 0 {
                self.buffer.push_str(ROW_SEPARATOR);
            }
            self.buffer.extend(row.iter().map(|&b| self.lut.glyph(b)));
        }

        if let Some(status) = status {
            let _ = MoveTo(0, self.geometry.height).write_ansi(&mut self.buffer);
            let _ = Clear(ClearType::CurrentLine).write_ansi(&mut self.buffer);
            self.buffer.push_str(status);
        }

        &self.buffer
    }
}
