// Session configuration
// Stored as RON, falls back to defaults when no file exists

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Soundfont library the instruments are fetched from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Soundfont {
    #[default]
    MusyngKite,
    #[serde(rename = "FluidR3_GM")]
    FluidR3Gm,
}

impl fmt::Display for Soundfont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Soundfont::MusyngKite => write!(f, "MusyngKite"),
            Soundfont::FluidR3Gm => write!(f, "FluidR3_GM"),
        }
    }
}

/// Encoding of the instrument samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    #[default]
    Mp3,
    Ogg,
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleFormat::Mp3 => write!(f, "mp3"),
            SampleFormat::Ogg => write!(f, "ogg"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Instrument loaded when the session is created
    pub instrument_name: String,
    pub soundfont: Soundfont,
    pub format: SampleFormat,
    /// Base URL of the soundfont host
    pub hostname: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            instrument_name: "acoustic_grand_piano".to_string(),
            soundfont: Soundfont::default(),
            format: SampleFormat::default(),
            hostname: "https://gleitz.github.io/midi-js-soundfonts".to_string(),
        }
    }
}

impl SessionConfig {
    /// Parse and validate RON text
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_ron(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Invalid(format!("Failed to serialize config: {}", e)))
    }

    /// Load from `path`, or use defaults if the file does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::from_ron(&std::fs::read_to_string(path)?)
    }

    /// Platform config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("keyreplay").join("session.ron"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instrument_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "instrument name cannot be empty".to_string(),
            ));
        }
        if self.hostname.trim().is_empty() {
            return Err(ConfigError::Invalid("hostname cannot be empty".to_string()));
        }
        Ok(())
    }

    /// URL of the sample bundle for `instrument_name`
    pub fn instrument_url(&self, instrument_name: &str) -> String {
        format!(
            "{}/{}/{}-{}.js",
            self.hostname.trim_end_matches('/'),
            self.soundfont,
            instrument_name,
            self.format
        )
    }
}
