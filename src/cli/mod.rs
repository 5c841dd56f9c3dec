//! Command-line interface definitions.

mod args;
mod enums;

pub use args::{Args, DEFAULT_MEDIA};
pub use enums::CharacterSet;
