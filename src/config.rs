//! Configuration file handling for asciiplay.
//!
//! Loads tunables from `--config PATH`, `./asciiplay.toml` or
//! `<config dir>/asciiplay/config.toml`, first match wins. Every key is
//! optional; a bad key costs a warning and falls back to its default.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ascii::{CharSet, GlyphLut};
use crate::error::Result;
use crate::media::FfmpegTools;

pub const DEFAULT_AUDIO_OFFSET: f64 = 0.4;
pub const MAX_AUDIO_OFFSET: f64 = 2.0;
pub const DEFAULT_PIPE_WARMUP: f64 = 0.05;
pub const DEFAULT_STATUS_REFRESH_INTERVAL: f64 = 0.5;
pub const DEFAULT_MIN_DISPLAY_WIDTH: u16 = 20;
pub const DEFAULT_MIN_DISPLAY_HEIGHT: u16 = 10;

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "asciiplay.toml";

/// Session tunables. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackConfig {
    /// Seconds video is held back so it lines up with audio startup.
    pub audio_offset: f64,
    /// Seconds to wait after spawning the decoder before reading.
    pub pipe_warmup: f64,
    pub status_refresh_interval: f64,
    pub min_display_width: u16,
    pub min_display_height: u16,
    pub charset: CharSet,
    pub invert: bool,
    /// Custom ramp, darkest to densest. Overrides `charset`.
    pub ramp: Option<String>,
    pub tools: ToolsConfig,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            audio_offset: DEFAULT_AUDIO_OFFSET,
            pipe_warmup: DEFAULT_PIPE_WARMUP,
            status_refresh_interval: DEFAULT_STATUS_REFRESH_INTERVAL,
            min_display_width: DEFAULT_MIN_DISPLAY_WIDTH,
            min_display_height: DEFAULT_MIN_DISPLAY_HEIGHT,
            charset: CharSet::default(),
            invert: false,
            ramp: None,
            tools: ToolsConfig::default(),
        }
    }
}

/// `[tools]` table: program names for the external tools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    pub ffmpeg: Option<String>,
    pub ffplay: Option<String>,
    pub ffprobe: Option<String>,
}

impl ToolsConfig {
    /// Apply configured names on top of `tools`.
    pub fn apply(&self, mut tools: FfmpegTools) -> FfmpegTools {
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

impl PlaybackConfig {
    /// Load configuration, never failing.
    ///
    /// `explicit` is the `--config` path. Problems are logged as warnings
    /// and the affected keys (or the whole file) use defaults.
    pub fn load(explicit: Option<&Path>) -> Self {
        let path = match explicit {
            Some(path) if path.exists() => path.to_path_buf(),
            Some(path) => {
                log::warn!("Config file '{}' not found, using defaults", path.display());
                return Self::default();
            }
            None => match candidate_paths().into_iter().find(|p| p.exists()) {
                Some(path) => path,
                None => return Self::default(),
            },
        };

        match Self::read_file(&path) {
            Ok((config, warnings)) => {
                for warning in &warnings {
                    log::warn!("{}: {}", path.display(), warning);
                }
                log::debug!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Read and parse one file. Returns the config plus per-key warnings.
    pub fn read_file(path: &Path) -> std::result::Result<(Self, Vec<String>), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let table: toml::Table = content.parse().map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self::from_table(&table))
    }

    /// Build a config from a parsed table, collecting a warning for every
    /// key that is unknown or unusable.
    pub fn from_table(table: &toml::Table) -> (Self, Vec<String>) {
        let mut config = Self::default();
        let mut warnings = Vec::new();

        for (key, value) in table {
            match key.as_str() {
                "audio_offset" => match as_seconds(value) {
                    Some(v) if (0.0..=MAX_AUDIO_OFFSET).contains(&v) => config.audio_offset = v,
                    Some(v) => {
                        config.audio_offset = v.clamp(0.0, MAX_AUDIO_OFFSET);
                        warnings.push(format!(
                            "audio_offset {} out of range, clamped to {}",
                            v, config.audio_offset
                        ));
                    }
                    None => warnings.push(invalid(key, value, "a number of seconds")),
                },
                "pipe_warmup" => match as_seconds(value) {
                    Some(v) if v >= 0.0 => config.pipe_warmup = v,
                    _ => warnings.push(invalid(key, value, "a non-negative number")),
                },
                "status_refresh_interval" => match as_seconds(value) {
                    Some(v) if v > 0.0 => config.status_refresh_interval = v,
                    _ => warnings.push(invalid(key, value, "a positive number")),
                },
                "min_display_width" => match as_dimension(value) {
                    Some(v) => config.min_display_width = v,
                    None => warnings.push(invalid(key, value, "an integer from 1 to 65535")),
                },
                "min_display_height" => match as_dimension(value) {
                    Some(v) => config.min_display_height = v,
                    None => warnings.push(invalid(key, value, "an integer from 1 to 65535")),
                },
                "charset" => match value.clone().try_into::<CharSet>() {
                    Ok(charset) => config.charset = charset,
                    Err(_) => warnings.push(invalid(key, value, "standard, blocks or minimal")),
                },
                "invert" => match value.as_bool() {
                    Some(v) => config.invert = v,
                    None => warnings.push(invalid(key, value, "a boolean")),
                },
                "ramp" => match value.as_str() {
                    Some(ramp) if ramp.chars().count() > 1 => config.ramp = Some(ramp.to_string()),
                    _ => warnings.push(invalid(key, value, "a string of at least 2 characters")),
                },
                "tools" => match value.clone().try_into::<ToolsConfig>() {
                    Ok(tools) => config.tools = tools,
                    Err(e) => warnings.push(format!("invalid [tools] table ignored: {}", e)),
                },
                _ => warnings.push(format!("unknown key '{}' ignored", key)),
            }
        }

        (config, warnings)
    }

    pub fn audio_offset_duration(&self) -> Duration {
        seconds(self.audio_offset)
    }

    pub fn pipe_warmup_duration(&self) -> Duration {
        seconds(self.pipe_warmup)
    }

    pub fn status_refresh_duration(&self) -> Duration {
        seconds(self.status_refresh_interval)
    }

    /// Glyph table for the configured ramp.
    ///
    /// # Errors
    /// * `PlayerError::InvalidRamp` - If a custom ramp has fewer than 2 glyphs
    pub fn glyph_lut(&self) -> Result<GlyphLut> {
        match &self.ramp {
            Some(ramp) => {
                let mut chars: Vec<char> = ramp.chars().collect();
                if self.invert {
                    chars.reverse();
                }
                GlyphLut::new(&chars)
            }
            None => Ok(GlyphLut::from_charset(self.charset, self.invert)),
        }
    }
}

/// Implicit config locations, in lookup order.
pub fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
    paths.extend(default_path());
    paths
}

/// Per-user config file path.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("asciiplay").join("config.toml"))
}

fn as_seconds(value: &toml::Value) -> Option<f64> {
    let v = match value {
        toml::Value::Float(f) => *f,
        toml::Value::Integer(i) => *i as f64,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

fn as_dimension(value: &toml::Value) -> Option<u16> {
    value
        .as_integer()
        .and_then(|i| u16::try_from(i).ok())
        .filter(|&v| v >= 1)
}

fn invalid(key: &str, value: &toml::Value, expected: &str) -> String {
    format!("invalid {} = {} (expected {}), using default", key, value, expected)
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

/// Errors that can occur when reading a config file.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(content: &str) -> (PlaybackConfig, Vec<String>) {
        PlaybackConfig::from_table(&content.parse::<toml::Table>().unwrap())
    }

    #[test]
    fn test_empty_table_gives_defaults() {
        let (config, warnings) = parse("");
        assert_eq!(config, PlaybackConfig::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_all_keys() {
        let (config, warnings) = parse(
            r#"
            audio_offset = 0.25
            pipe_warmup = 0
            status_refresh_interval = 1
            min_display_width = 40
            min_display_height = 12
            charset = "blocks"
            invert = true
            ramp = " .oO@"

            [tools]
            ffmpeg = "/opt/ffmpeg/bin/ffmpeg"
            "#,
        );
        assert!(warnings.is_empty(), "{:?}", warnings);
        assert_eq!(config.audio_offset, 0.25);
        assert_eq!(config.pipe_warmup, 0.0);
        assert_eq!(config.status_refresh_interval, 1.0);
        assert_eq!(config.min_display_width, 40);
        assert_eq!(config.min_display_height, 12);
        assert_eq!(config.charset, CharSet::Blocks);
        assert!(config.invert);
        assert_eq!(config.ramp.as_deref(), Some(" .oO@"));
        assert_eq!(config.tools.ffmpeg.as_deref(), Some("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(config.tools.ffplay, None);
    }

    #[test]
    fn test_audio_offset_is_clamped() {
        let (config, warnings) = parse("audio_offset = 5.0");
        assert_eq!(config.audio_offset, MAX_AUDIO_OFFSET);
        assert_eq!(warnings.len(), 1);

        let (config, _) = parse("audio_offset = -1");
        assert_eq!(config.audio_offset, 0.0);
    }

    #[test]
    fn test_bad_values_fall_back_per_key() {
        let (config, warnings) = parse(
            r##"
            audio_offset = "soon"
            status_refresh_interval = 0
            min_display_width = 0
            charset = "emoji"
            ramp = "#"
            colour = true
            "##,
        );
        assert_eq!(warnings.len(), 6, "{:?}", warnings);
        assert_eq!(config, PlaybackConfig::default());
    }

    #[test]
    fn test_bad_tools_table_is_ignored() {
        let (config, warnings) = parse("[tools]\nffmpeg = 3\n");
        assert_eq!(config.tools, ToolsConfig::default());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_tools_apply_overrides_only_set_names() {
        let tools = ToolsConfig {
            ffplay: Some("my-ffplay".to_string()),
            ..ToolsConfig::default()
        }
        .apply(FfmpegTools::default());
        assert_eq!(tools.ffmpeg, "ffmpeg");
        assert_eq!(tools.ffplay, "my-ffplay");
    }

    #[test]
    fn test_durations() {
        let config = PlaybackConfig::default();
        assert_eq!(config.audio_offset_duration(), Duration::from_millis(400));
        assert_eq!(config.pipe_warmup_duration(), Duration::from_millis(50));
        assert_eq!(config.status_refresh_duration(), Duration::from_millis(500));
    }

    #[test]
    fn test_glyph_lut_custom_ramp_inverted() {
        let config = PlaybackConfig {
            ramp: Some("ab".to_string()),
            invert: true,
            ..PlaybackConfig::default()
        };
        let lut = config.glyph_lut().unwrap();
        assert_eq!(lut.glyph(0), 'b');
        assert_eq!(lut.glyph(255), 'a');
    }

    #[test]
    fn test_read_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "audio_offset = 1.5\ninvert = true").unwrap();
        let (config, warnings) = PlaybackConfig::read_file(file.path()).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(config.audio_offset, 1.5);
        assert!(config.invert);
    }

    #[test]
    fn test_read_file_malformed() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "audio_offset = = 1").unwrap();
        let err = PlaybackConfig::read_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().starts_with("Failed to parse config file"));
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not toml [").unwrap();
        assert_eq!(PlaybackConfig::load(Some(file.path())), PlaybackConfig::default());

        let missing = Path::new("/nonexistent/asciiplay/config.toml");
        assert_eq!(PlaybackConfig::load(Some(missing)), PlaybackConfig::default());
    }

    #[test]
    fn test_candidate_paths_start_with_local_file() {
        let paths = candidate_paths();
        assert_eq!(paths[0], PathBuf::from(LOCAL_CONFIG_FILE));
    }
}
