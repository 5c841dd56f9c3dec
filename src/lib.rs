//! asciiplay library crate.
//!
//! Plays a video file as ASCII art in the terminal while an external player
//! plays its audio. Exposes the components for integration testing.

pub mod ascii;
pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod playback;
pub mod terminal;

pub use error::{PlayerError, Result};
