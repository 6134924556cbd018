use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use autonext_detector::{
    DEFAULT_DETECT_LEVEL, DEFAULT_HASH_SIZE, DEFAULT_MATCH_NUMBER, DetectorConfig,
};

pub const DEFAULT_POPUP_DURATION_SECS: u64 = 30;
pub const DEFAULT_CUE_POPUP_DURATION_SECS: u64 = 10;
pub const DEFAULT_PLAYED_LIMIT: u32 = 3;
pub const DEFAULT_DETECT_PERIOD_SECS: u64 = 300;
pub const DEFAULT_TICK_SECS: u64 = 1;

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub(crate) struct FileConfig {
    pub(crate) playback: Option<PlaybackFileConfig>,
    pub(crate) detection: Option<DetectionFileConfig>,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
#[serde(default)]
pub(crate) struct PlaybackFileConfig {
    pub(crate) popup_duration: Option<u64>,
    pub(crate) cue_popup_duration: Option<u64>,
    pub(crate) auto_play: Option<bool>,
    pub(crate) played_limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
#[serde(default)]
pub(crate) struct DetectionFileConfig {
    pub(crate) period: Option<u64>,
    pub(crate) level: Option<f64>,
    pub(crate) hash_size: Option<u32>,
    pub(crate) match_number: Option<u32>,
    pub(crate) tick: Option<u64>,
}

/// Host-supplied setting overrides. Anything left `None` falls back to the
/// config file, then to the built-in default.
#[derive(Debug, Default, Clone)]
pub struct SettingsOverrides {
    pub config: Option<PathBuf>,
    pub popup_duration: Option<u64>,
    pub cue_popup_duration: Option<u64>,
    pub auto_play: Option<bool>,
    pub played_limit: Option<u32>,
    pub detect_period: Option<u64>,
    pub detect_level: Option<f64>,
    pub hash_size: Option<u32>,
    pub match_number: Option<u32>,
    pub tick: Option<u64>,
}

#[derive(Debug)]
pub struct EffectiveSettings {
    pub playback: PlaybackSettings,
    pub detection: DetectionSettings,
}

#[derive(Debug, Clone)]
pub struct PlaybackSettings {
    /// How long the popup stays open before the timeout resolution.
    pub popup_duration: Duration,
    /// Popup window length when an external cue point supplied the offset.
    pub cue_popup_duration: Duration,
    pub auto_play: bool,
    /// Consecutive auto-played episodes before the prompt switches to the
    /// "still watching" style. Zero disables the limit.
    pub played_limit: u32,
}

#[derive(Debug, Clone)]
pub struct DetectionSettings {
    /// How long before the end of the file credits detection arms. `None`
    /// disables detection entirely.
    pub period: Option<Duration>,
    pub level: f64,
    pub hash_size: u32,
    pub match_number: u32,
    pub tick: Duration,
}

impl DetectionSettings {
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            hash_size: self.hash_size,
            detect_level: self.level,
            match_number: self.match_number,
            tick: self.tick,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    InvalidValue {
        path: Option<PathBuf>,
        field: &'static str,
        value: String,
    },
    NotFound {
        path: PathBuf,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Parse { path, source } => {
                write!(
                    f,
                    "failed to parse config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::InvalidValue { path, field, value } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "invalid value '{}' for '{}' in {}",
                        value,
                        field,
                        path.display()
                    )
                } else {
                    write!(f, "invalid value '{}' for '{}'", value, field)
                }
            }
            ConfigError::NotFound { path } => {
                write!(f, "config file {} does not exist", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::InvalidValue { .. } => None,
            ConfigError::NotFound { .. } => None,
        }
    }
}

pub fn resolve_settings(overrides: &SettingsOverrides) -> Result<EffectiveSettings, ConfigError> {
    let (file, config_path) = load_config(overrides.config.as_deref())?;
    merge(overrides, file, config_path)
}

fn load_config(path_override: Option<&Path>) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
    if let Some(path) = path_override {
        let path = path.to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound { path });
        }
        let config = load_file_config(&path)?;
        return Ok((config, Some(path)));
    }

    if let Some(project_path) = project_config_path()
        && project_path.exists()
    {
        let config = load_file_config(&project_path)?;
        return Ok((config, Some(project_path)));
    }

    let Some(default_path) = default_config_path() else {
        return Ok((FileConfig::default(), None));
    };
    if !default_path.exists() {
        return Ok((FileConfig::default(), None));
    }
    let config = load_file_config(&default_path)?;
    Ok((config, Some(default_path)))
}

pub(crate) fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(config)
}

pub(crate) fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("rs", "autonext", "autonext")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn project_config_path() -> Option<PathBuf> {
    env::current_dir().ok().map(|dir| dir.join("config.toml"))
}

fn merge(
    overrides: &SettingsOverrides,
    file: FileConfig,
    config_path: Option<PathBuf>,
) -> Result<EffectiveSettings, ConfigError> {
    let FileConfig {
        playback: file_playback,
        detection: file_detection,
    } = file;

    let playback_cfg = file_playback.unwrap_or_default();
    let detection_cfg = file_detection.unwrap_or_default();

    let popup_duration = resolve_duration_secs(
        overrides.popup_duration,
        playback_cfg.popup_duration,
        DEFAULT_POPUP_DURATION_SECS,
        "popup_duration",
        config_path.as_ref(),
    )?;
    let cue_popup_duration = resolve_duration_secs(
        overrides.cue_popup_duration,
        playback_cfg.cue_popup_duration,
        DEFAULT_CUE_POPUP_DURATION_SECS,
        "cue_popup_duration",
        config_path.as_ref(),
    )?;
    let auto_play = overrides
        .auto_play
        .or(playback_cfg.auto_play)
        .unwrap_or(true);
    let played_limit = overrides
        .played_limit
        .or(playback_cfg.played_limit)
        .unwrap_or(DEFAULT_PLAYED_LIMIT);

    let period = resolve_detect_period(overrides.detect_period, detection_cfg.period);
    let level = resolve_detect_level(
        overrides.detect_level,
        detection_cfg.level,
        config_path.as_ref(),
    )?;
    let hash_size = resolve_hash_size(
        overrides.hash_size,
        detection_cfg.hash_size,
        config_path.as_ref(),
    )?;
    let match_number = resolve_match_number(
        overrides.match_number,
        detection_cfg.match_number,
        config_path.as_ref(),
    )?;
    let tick = resolve_duration_secs(
        overrides.tick,
        detection_cfg.tick,
        DEFAULT_TICK_SECS,
        "tick",
        config_path.as_ref(),
    )?;

    Ok(EffectiveSettings {
        playback: PlaybackSettings {
            popup_duration,
            cue_popup_duration,
            auto_play,
            played_limit,
        },
        detection: DetectionSettings {
            period,
            level,
            hash_size,
            match_number,
            tick,
        },
    })
}

fn resolve_duration_secs(
    override_value: Option<u64>,
    file_value: Option<u64>,
    default: u64,
    field: &'static str,
    config_path: Option<&PathBuf>,
) -> Result<Duration, ConfigError> {
    let from_file = override_value.is_none();
    let value = override_value.or(file_value).unwrap_or(default);
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            path: if from_file { config_path.cloned() } else { None },
            field,
            value: value.to_string(),
        });
    }
    Ok(Duration::from_secs(value))
}

// Zero means "detection off"; everything else is an arming offset.
fn resolve_detect_period(
    override_value: Option<u64>,
    file_value: Option<u64>,
) -> Option<Duration> {
    let value = override_value
        .or(file_value)
        .unwrap_or(DEFAULT_DETECT_PERIOD_SECS);
    if value == 0 {
        None
    } else {
        Some(Duration::from_secs(value))
    }
}

fn resolve_detect_level(
    override_value: Option<f64>,
    file_value: Option<f64>,
    config_path: Option<&PathBuf>,
) -> Result<f64, ConfigError> {
    let from_file = override_value.is_none();
    let value = override_value
        .or(file_value)
        .unwrap_or(DEFAULT_DETECT_LEVEL);
    if !(value > 0.0 && value <= 1.0) {
        return Err(ConfigError::InvalidValue {
            path: if from_file { config_path.cloned() } else { None },
            field: "detect_level",
            value: value.to_string(),
        });
    }
    Ok(value)
}

fn resolve_hash_size(
    override_value: Option<u32>,
    file_value: Option<u32>,
    config_path: Option<&PathBuf>,
) -> Result<u32, ConfigError> {
    let from_file = override_value.is_none();
    let value = override_value.or(file_value).unwrap_or(DEFAULT_HASH_SIZE);
    if value <= 8 || value % 4 != 0 {
        return Err(ConfigError::InvalidValue {
            path: if from_file { config_path.cloned() } else { None },
            field: "hash_size",
            value: value.to_string(),
        });
    }
    Ok(value)
}

fn resolve_match_number(
    override_value: Option<u32>,
    file_value: Option<u32>,
    config_path: Option<&PathBuf>,
) -> Result<u32, ConfigError> {
    let from_file = override_value.is_none();
    let value = override_value
        .or(file_value)
        .unwrap_or(DEFAULT_MATCH_NUMBER);
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            path: if from_file { config_path.cloned() } else { None },
            field: "match_number",
            value: value.to_string(),
        });
    }
    Ok(value)
}
