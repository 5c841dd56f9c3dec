//! One-shot stream metadata probe.

use std::path::Path;
use std::process::Stdio;

use super::MediaTools;

/// Frame rate used when the probe reports nothing usable.
pub const FALLBACK_FRAME_RATE: f64 = 30.0;

/// Basic facts about the first video stream, read once before playback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamMetadata {
    pub source_width: u32,
    pub source_height: u32,
    /// Frames per second, always finite and > 0.
    pub frame_rate: f64,
}

impl StreamMetadata {
    /// Values used when probing fails: 640x480 at 30 FPS.
    pub const FALLBACK: StreamMetadata = StreamMetadata {
        source_width: 640,
        source_height: 480,
        frame_rate: FALLBACK_FRAME_RATE,
    };
}

impl Default for StreamMetadata {
    fn default() -> Self {
        Self::FALLBACK
    }
}

/// Errors from the metadata probe. Never fatal.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("probe exited with code {0:?}")]
    Failed(Option<i32>),
    #[error("unexpected probe output: {0}")]
    Parse(String),
}

/// Build the ffprobe invocation for the first video stream.
pub fn ffprobe_args(path: &Path) -> Vec<std::ffi::OsString> {
    let mut args: Vec<std::ffi::OsString> = [
        "-v",
        "error",
        "-select_streams",
        "v:0",
        "-show_entries",
        "stream=width,height,r_frame_rate",
        "-of",
        "default=noprint_wrappers=1",
    ]
    .into_iter()
    .map(std::ffi::OsString::from)
    .collect();
    args.push(path.as_os_str().to_os_string());
    args
}

/// Run the probe and parse its output.
pub fn probe(program: &str, path: &Path) -> Result<StreamMetadata, ProbeError> {
    let mut cmd = std::process::Command::new(program);
    cmd.args(ffprobe_args(path))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    super::hide_window(&mut cmd);

    let output = cmd.output().map_err(|source| ProbeError::Spawn {
        program: program.to_string(),
        source,
    })?;

    if !output.status.success() {
        return Err(ProbeError::Failed(output.status.code()));
    }

    parse_probe_output(&String::from_utf8_lossy(&output.stdout))
}

/// Probe through `tools`, falling back to [`StreamMetadata::FALLBACK`] on
/// any failure.
pub fn probe_or_default(tools: &dyn MediaTools, path: &Path) -> StreamMetadata {
    match tools.probe(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            log::warn!(
                "Failed to read video info ({}), assuming {}x{} at {} FPS",
                e,
                StreamMetadata::FALLBACK.source_width,
                StreamMetadata::FALLBACK.source_height,
                StreamMetadata::FALLBACK.frame_rate
            );
            StreamMetadata::FALLBACK
        }
    }
}

/// Parse `key=value` probe output.
///
/// Expects `width`, `height` and `r_frame_rate` in any order. A frame rate
/// that is zero, negative or not a number is replaced by the fallback rate.
pub fn parse_probe_output(output: &str) -> Result<StreamMetadata, ProbeError> {
    let mut width = None;
    let mut height = None;
    let mut frame_rate = None;

    for line in output.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        match key {
            "width" => width = value.parse::<u32>().ok(),
            "height" => height = value.parse::<u32>().ok(),
            "r_frame_rate" => frame_rate = parse_frame_rate(value),
            _ => {}
        }
    }

    let (Some(source_width), Some(source_height)) = (width, height) else {
        return Err(ProbeError::Parse(output.trim().to_string()));
    };

    let frame_rate = match frame_rate {
        Some(rate) => rate,
        None => {
            log::warn!("Probe reported no usable frame rate, using {}", FALLBACK_FRAME_RATE);
            FALLBACK_FRAME_RATE
        }
    };

    Ok(StreamMetadata {
        source_width,
        source_height,
        frame_rate,
    })
}

/// Parse `num/den` or a plain number, rounded to two decimals.
///
/// Returns `None` for anything that is not a finite rate above zero.
pub fn parse_frame_rate(value: &str) -> Option<f64> {
    let value = value.trim();
    let rate = match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            num / den
        }
        None => value.parse().ok()?,
    };

    if rate.is_finite() && rate > 0.0 {
        let rounded = (rate * 100.0).round() / 100.0;
        Some(rounded.max(0.01))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate_rational() {
        assert_eq!(parse_frame_rate("30000/1001"), Some(29.97));
        assert_eq!(parse_frame_rate("24/1"), Some(24.0));
    }

    #[test]
    fn test_parse_frame_rate_plain() {
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate(" 12.5 "), Some(12.5));
    }

    #[test]
    fn test_parse_frame_rate_rejects_invalid() {
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("0/1"), None);
        assert_eq!(parse_frame_rate("-5"), None);
        assert_eq!(parse_frame_rate("abc"), None);
        assert_eq!(parse_frame_rate("1/0"), None);
    }

    #[test]
    fn test_parse_probe_output() {
        let out = "width=320\nheight=240\nr_frame_rate=24/1\n";
        let meta = parse_probe_output(out).unwrap();
        assert_eq!(meta.source_width, 320);
        assert_eq!(meta.source_height, 240);
        assert_eq!(meta.frame_rate, 24.0);
    }

    #[test]
    fn test_parse_probe_output_zero_rate_falls_back() {
        let out = "width=320\nheight=240\nr_frame_rate=0/0\n";
        let meta = parse_probe_output(out).unwrap();
        assert_eq!(meta.frame_rate, FALLBACK_FRAME_RATE);
    }

    #[test]
    fn test_parse_probe_output_missing_dimensions() {
        let result = parse_probe_output("r_frame_rate=25/1\n");
        assert!(matches!(result, Err(ProbeError::Parse(_))));
    }

    #[test]
    fn test_probe_missing_program() {
        let result = probe("asciiplay-no-such-probe", Path::new("video.mp4"));
        assert!(matches!(result, Err(ProbeError::Spawn { .. })));
    }

    #[test]
    fn test_fallback_values() {
        let meta = StreamMetadata::default();
        assert_eq!((meta.source_width, meta.source_height), (640, 480));
        assert_eq!(meta.frame_rate, 30.0);
    }
}
