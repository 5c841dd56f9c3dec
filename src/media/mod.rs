//! External decode/playback tools and the subprocesses they run.
//!
//! - [`MediaTools`] is the seam between the session and the binaries it drives
//! - [`FfmpegTools`] drives `ffmpeg` (video), `ffplay` (audio) and `ffprobe`
//! - [`DecoderHandle`] streams raw grayscale frames from the video decoder
//! - [`AudioChannel`] runs the audio player on a background thread

mod audio;
mod decoder;
mod probe;
pub mod process;

use std::path::Path;
use std::process::{Command, Stdio};

use crate::ascii::DisplayGeometry;
use crate::error::{PlayerError, Result};

pub use audio::{AudioChannel, AudioOutcome, AUDIO_POLL_INTERVAL, AUDIO_STOP_GRACE};
pub use decoder::{DecoderHandle, FrameRead, FrameReader, FrameSource};
pub use probe::{
    parse_frame_rate, parse_probe_output, probe_or_default, ProbeError, StreamMetadata,
    FALLBACK_FRAME_RATE,
};

/// Builds the subprocess invocations a session needs.
pub trait MediaTools {
    /// Verify the decoder and audio player can be run at all.
    fn check_available(&self) -> Result<()>;

    /// Read basic metadata of the first video stream.
    fn probe(&self, path: &Path) -> Result<StreamMetadata, ProbeError>;

    /// Command that writes raw `gray` frames of `geometry` at `frame_rate` to
    /// stdout, with no other output.
    fn decoder_command(&self, path: &Path, geometry: DisplayGeometry, frame_rate: f64) -> Command;

    /// Command that plays the audio of `path` with no window and no output.
    fn audio_command(&self, path: &Path) -> Command;
}

/// Program names for the FFmpeg tool family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegTools {
    pub ffmpeg: String,
    pub ffplay: String,
    pub ffprobe: String,
}

impl Default for FfmpegTools {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffplay: "ffplay".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

impl MediaTools for FfmpegTools {
    fn check_available(&self) -> Result<()> {
        for program in [&self.ffmpeg, &self.ffplay] {
            check_program(program)?;
        }
        Ok(())
    }

    fn probe(&self, path: &Path) -> Result<StreamMetadata, ProbeError> {
        probe::probe(&self.ffprobe, path)
    }

    fn decoder_command(&self, path: &Path, geometry: DisplayGeometry, frame_rate: f64) -> Command {
        let filter = format!(
            "fps={:.2},scale={}:{},format=gray",
            frame_rate, geometry.width, geometry.height
        );
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-loglevel", "quiet", "-nostdin", "-i"])
            .arg(path)
            .args(["-an", "-vf"])
            .arg(filter)
            .args(["-f", "rawvideo", "-pix_fmt", "gray", "pipe:1"]);
        hide_window(&mut cmd);
        cmd
    }

    fn audio_command(&self, path: &Path) -> Command {
        let mut cmd = Command::new(&self.ffplay);
        cmd.args(["-nodisp", "-autoexit", "-loglevel", "quiet", "-i"])
            .arg(path);
        hide_window(&mut cmd);
        cmd
    }
}

/// Run `<program> -version` to confirm the binary exists.
fn check_program(program: &str) -> Result<()> {
    let mut cmd = Command::new(program);
    cmd.arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    hide_window(&mut cmd);

    match cmd.status() {
        Ok(_) => Ok(()),
        Err(e) => Err(PlayerError::spawn(program, e)),
    }
}

/// Keep console subprocesses from opening their own window on Windows.
pub(crate) fn hide_window(cmd: &mut Command) {
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    #[cfg(not(windows))]
    {
        let _ = cmd;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_decoder_command_requests_raw_gray_frames() {
        let tools = FfmpegTools::default();
        let cmd = tools.decoder_command(
            Path::new("clip.mp4"),
            DisplayGeometry { width: 70, height: 35 },
            29.97,
        );
        assert_eq!(cmd.get_program(), "ffmpeg");
        let args = args_of(&cmd);
        assert!(args.contains(&"fps=29.97,scale=70:35,format=gray".to_string()));
        assert!(args.windows(2).any(|w| w == ["-f", "rawvideo"]));
        assert!(args.windows(2).any(|w| w == ["-pix_fmt", "gray"]));
        assert!(args.windows(2).any(|w| w == ["-i", "clip.mp4"]));
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
    }

    #[test]
    fn test_audio_command_has_no_display() {
        let tools = FfmpegTools::default();
        let cmd = tools.audio_command(Path::new("clip.mp4"));
        assert_eq!(cmd.get_program(), "ffplay");
        let args = args_of(&cmd);
        assert!(args.contains(&"-nodisp".to_string()));
        assert!(args.contains(&"-autoexit".to_string()));
        assert!(args.windows(2).any(|w| w == ["-loglevel", "quiet"]));
    }

    #[test]
    fn test_check_available_reports_missing_program() {
        let tools = FfmpegTools {
            ffmpeg: "asciiplay-no-such-ffmpeg".to_string(),
            ..FfmpegTools::default()
        };
        match tools.check_available() {
            Err(PlayerError::DependencyMissing { program }) => {
                assert_eq!(program, "asciiplay-no-such-ffmpeg")
            }
            other => panic!("Expected DependencyMissing, got {:?}", other),
        }
    }
}
