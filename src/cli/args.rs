//! CLI argument parsing with clap.

use clap::Parser;
use std::path::PathBuf;

use super::enums::CharacterSet;
use crate::ascii::{DEFAULT_DISPLAY_HEIGHT, DEFAULT_DISPLAY_WIDTH};
use crate::config::PlaybackConfig;
use crate::media::FfmpegTools;
use crate::playback::PlaybackRequest;

/// Media played when none is given.
pub const DEFAULT_MEDIA: &str = "BadApple.mp4";

/// Play a video as ASCII art in the terminal, with synced audio
#[derive(Parser, Debug)]
#[command(name = "asciiplay")]
#[command(version, about = "ASCII art video player for the terminal", long_about = None)]
pub struct Args {
    /// Media file to play
    #[arg(default_value = DEFAULT_MEDIA)]
    pub media: PathBuf,

    /// Render width in character cells
    #[arg(default_value_t = DEFAULT_DISPLAY_WIDTH)]
    pub width: u16,

    /// Render height in character cells
    #[arg(default_value_t = DEFAULT_DISPLAY_HEIGHT)]
    pub height: u16,

    /// Config file path
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// ASCII character set (overrides config)
    #[arg(long)]
    pub charset: Option<CharacterSet>,

    /// Invert brightness (for light terminals)
    #[arg(long)]
    pub invert: bool,

    /// Video decoder program
    #[arg(long)]
    pub ffmpeg: Option<String>,

    /// Audio player program
    #[arg(long)]
    pub ffplay: Option<String>,

    /// Metadata probe program
    #[arg(long)]
    pub ffprobe: Option<String>,
}

impl Args {
    pub fn request(&self) -> PlaybackRequest {
        PlaybackRequest {
            path: self.media.clone(),
            width: self.width,
            height: self.height,
        }
    }

    /// Apply command-line overrides to a loaded config.
    pub fn resolve_config(&self, mut config: PlaybackConfig) -> PlaybackConfig {
        if let Some(charset) = self.charset {
            config.charset = charset.into();
            config.ramp = None;
        }
        if self.invert {
            config.invert = true;
        }
        config
    }

    /// Program names: CLI flags win over the `[tools]` config table.
    pub fn tools(&self, config: &PlaybackConfig) -> FfmpegTools {
        let mut tools = config.tools.apply(FfmpegTools::default());
        if let Some(ffmpeg) = &self.ffmpeg {
            tools.ffmpeg = ffmpeg.clone();
        }
        if let Some(ffplay) = &self.ffplay {
            tools.ffplay = ffplay.clone();
        }
        if let Some(ffprobe) = &self.ffprobe {
            tools.ffprobe = ffprobe.clone();
        }
        tools
    }
}
