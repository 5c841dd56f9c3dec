//! Precomputed byte-to-glyph lookup table.

use crate::error::{PlayerError, Result};

use super::charset::CharSet;

/// Maps every grayscale byte (0-255) to one glyph of a ramp.
///
/// Built once per session. Lower bytes map to earlier ramp positions, so the
/// mapping is monotonic along the ramp.
#[derive(Debug, Clone)]
pub struct GlyphLut {
    ramp: Vec<char>,
    table: [char; 256],
}

impl GlyphLut {
    /// Build a table from a ramp ordered darkest to densest.
    ///
    /// # Errors
    /// * `PlayerError::InvalidRamp` - If the ramp has fewer than 2 glyphs
    pub fn new(ramp: &[char]) -> Result<Self> {
        if ramp.len() < 2 {
            return Err(PlayerError::InvalidRamp(ramp.len()));
        }

        Ok(Self::build(ramp.to_vec()))
    }

    /// Build a table from a built-in charset, optionally reversed for light
    /// terminals.
    pub fn from_charset(charset: CharSet, invert: bool) -> Self {
        let mut ramp = charset.chars().to_vec();
        if invert {
            ramp.reverse();
        }
        // Built-in ramps always have more than one glyph.
        Self::build(ramp)
    }

    fn build(ramp: Vec<char>) -> Self {
        let mut table = [' '; 256];
        for (value, slot) in table.iter_mut().enumerate() {
            *slot = ramp[position(value as u8, ramp.len())];
        }
        Self { ramp, table }
    }

    /// Glyph for a pixel intensity.
    #[inline]
    pub fn glyph(&self, value: u8) -> char {
        self.table[value as usize]
    }

    /// Ramp position a pixel intensity maps to.
    #[inline]
    pub fn position(&self, value: u8) -> usize {
        position(value, self.ramp.len())
    }

    pub fn ramp(&self) -> &[char] {
        &self.ramp
    }
}

#[inline]
fn position(value: u8, levels: usize) -> usize {
    (value as usize * levels) / 256
}
