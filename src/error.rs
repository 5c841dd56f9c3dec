//! Fatal error classes for a playback session.
//!
//! Non-fatal problems (config, probe, audio) never surface as
//! [`PlayerError`]; they are logged and playback continues with defaults.

use std::io;
use std::path::PathBuf;

/// Errors that abort a session.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    /// A required external program could not be run.
    #[error("'{program}' not found. Install FFmpeg and make sure '{program}' is on your PATH")]
    DependencyMissing { program: String },

    /// The media path does not exist.
    #[error("file '{}' does not exist", .0.display())]
    SourceNotFound(PathBuf),

    /// The decoder exited abnormally or its stream broke mid-playback.
    #[error("video decoder failed (exit code {exit_code:?}): {detail}")]
    DecodeStream {
        exit_code: Option<i32>,
        detail: String,
    },

    /// Spawning a subprocess failed for a reason other than a missing binary.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// A glyph ramp needs at least two characters.
    #[error("glyph ramp must contain at least 2 characters, got {0}")]
    InvalidRamp(usize),

    /// Terminal setup or input handling failed.
    #[error("terminal error: {0}")]
    Terminal(#[source] io::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl PlayerError {
    /// Map a spawn failure, treating `NotFound` as a missing dependency.
    pub fn spawn(program: &str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            PlayerError::DependencyMissing {
                program: program.to_string(),
            }
        } else {
            PlayerError::Spawn {
                program: program.to_string(),
                source,
            }
        }
    }
}

pub type Result<T, E = PlayerError> = std::result::Result<T, E>;
