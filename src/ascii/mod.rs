//! ASCII renderer module for turning raw grayscale frames into terminal text.
//!
//! 1. **Geometry** - clamp the requested render size to configured minimums
//! 2. **Lookup table** - map each byte value to one glyph of a ramp
//! 3. **Composition** - build one cursor-homed terminal update per frame
//!
//! # Character Sets
//!
//! Built-in ramps are available via [`CharSet`]:
//! - `Standard` - 10-level ASCII density ramp
//! - `Blocks` - Unicode block characters
//! - `Minimal` - 4-level clean look

mod charset;
mod dimensions;
mod lut;
mod render;

pub use charset::{CharSet, BLOCKS_CHARSET, MINIMAL_CHARSET, STANDARD_CHARSET};
pub use dimensions::{DisplayGeometry, DEFAULT_DISPLAY_HEIGHT, DEFAULT_DISPLAY_WIDTH};
pub use lut::GlyphLut;
pub use render::{GlyphRenderer, ROW_SEPARATOR};
