//! TOML configuration for the daemon: watcher timings, frame pacing, and
//! extra include directories. Durations accept either a bare number of
//! seconds or a human-readable string such as "250ms".

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

const SUPPORTED_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeckConfig {
    pub version: u32,
    #[serde(deserialize_with = "deserialize_duration")]
    pub poll_interval: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub debounce: Duration,
    pub fps: f32,
    pub resolution: [u32; 2],
    pub shader_dir: Option<PathBuf>,
    pub include_dirs: Vec<PathBuf>,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_VERSION,
            poll_interval: Duration::from_millis(100),
            debounce: Duration::from_millis(200),
            fps: 60.0,
            resolution: [1280, 720],
            shader_dir: None,
            include_dirs: Vec::new(),
        }
    }
}

impl DeckConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: DeckConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Loads the file at `path`, falling back to defaults when it does not
    /// exist. A present-but-broken file is an error, not a silent default.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.version != SUPPORTED_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {} (expected {})",
                self.version, SUPPORTED_VERSION
            )));
        }
        if self.fps <= 0.0 || !self.fps.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "fps must be a positive number, got {}",
                self.fps
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "poll_interval must be greater than zero".to_string(),
            ));
        }
        if self.resolution.iter().any(|&side| side == 0) {
            return Err(ConfigError::Invalid(format!(
                "resolution must be nonzero, got {}x{}",
                self.resolution[0], self.resolution[1]
            )));
        }
        Ok(())
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            let v = u64::try_from(v).map_err(|_| E::custom(format!("invalid duration '{v}'")))?;
            self.visit_u64(v)
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_sign_negative() || !v.is_finite() {
                return Err(E::custom(format!("invalid duration '{v}'")));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }
    deserializer.deserialize_any(Visitor)
}
