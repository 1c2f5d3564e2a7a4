use crate::detection::ModelConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_detection_interval")]
    pub detection_interval_ms: u64,

    #[serde(default = "default_max_clip")]
    pub max_clip_secs: u64,

    #[serde(default)]
    pub mirrored: bool,

    #[serde(default)]
    pub auto_record: bool,

    #[serde(default = "default_volume")]
    pub notification_volume: f32,

    #[serde(default = "default_tone_frequency")]
    pub tone_frequency_hz: f32,

    #[serde(default = "default_tone_duration")]
    pub tone_duration_ms: u64,

    #[serde(default = "default_frames_dir")]
    pub frames_dir: PathBuf,

    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    #[serde(default = "default_model_base")]
    pub model_base: String,

    #[serde(default = "default_min_score")]
    pub min_score: f32,

    #[serde(default = "default_max_detections")]
    pub max_detections: usize,

    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,
}

fn default_detection_interval() -> u64 {
    100
}

fn default_max_clip() -> u64 {
    30
}

fn default_volume() -> f32 {
    0.8
}

fn default_tone_frequency() -> f32 {
    880.0
}

fn default_tone_duration() -> u64 {
    200
}

fn default_frames_dir() -> PathBuf {
    data_dir().join("frames")
}

fn default_frame_rate() -> u32 {
    10
}

fn default_model_path() -> PathBuf {
    data_dir().join("detections.json")
}

fn default_model_base() -> String {
    ModelConfig::default().base
}

fn default_min_score() -> f32 {
    ModelConfig::default().min_score
}

fn default_max_detections() -> usize {
    ModelConfig::default().max_detections
}

fn default_downloads_dir() -> PathBuf {
    home_dir().join("Downloads")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

fn data_dir() -> PathBuf {
    let base = match std::env::var("XDG_DATA_HOME") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => home_dir().join(".local").join("share"),
    };
    base.join("camwatch")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            detection_interval_ms: default_detection_interval(),
            max_clip_secs: default_max_clip(),
            mirrored: false,
            auto_record: false,
            notification_volume: default_volume(),
            tone_frequency_hz: default_tone_frequency(),
            tone_duration_ms: default_tone_duration(),
            frames_dir: default_frames_dir(),
            frame_rate: default_frame_rate(),
            model_path: default_model_path(),
            model_base: default_model_base(),
            min_score: default_min_score(),
            max_detections: default_max_detections(),
            downloads_dir: default_downloads_dir(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.config/camwatch/config.json)
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::info!(
                "Config file not found at {:?}, creating default config",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        tracing::info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        tracing::info!("Saved config to {:?}", config_path);
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(dir)
        } else {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            PathBuf::from(home).join(".config")
        };

        Ok(config_dir.join("camwatch").join("config.json"))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.detection_interval_ms == 0 {
            return Err(anyhow::anyhow!("detection_interval_ms must be positive"));
        }

        if self.max_clip_secs == 0 {
            return Err(anyhow::anyhow!("max_clip_secs must be positive"));
        }

        if self.frame_rate == 0 {
            return Err(anyhow::anyhow!("frame_rate must be positive"));
        }

        let bad_frequency = self.tone_frequency_hz.is_nan() || self.tone_frequency_hz <= 0.0;
        if bad_frequency || self.tone_duration_ms == 0 {
            return Err(anyhow::anyhow!("tone frequency and duration must be positive"));
        }

        if !(0.0..=1.0).contains(&self.notification_volume) {
            return Err(anyhow::anyhow!("notification_volume must be between 0 and 1"));
        }

        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(anyhow::anyhow!("min_score must be between 0 and 1"));
        }

        if self.max_detections == 0 {
            return Err(anyhow::anyhow!("max_detections must be positive"));
        }

        if self.model_base.is_empty() {
            return Err(anyhow::anyhow!("model_base cannot be empty"));
        }

        Ok(())
    }

    pub fn detection_interval(&self) -> Duration {
        Duration::from_millis(self.detection_interval_ms)
    }

    pub fn max_clip_duration(&self) -> Duration {
        Duration::from_secs(self.max_clip_secs)
    }

    pub fn tone_duration(&self) -> Duration {
        Duration::from_millis(self.tone_duration_ms)
    }

    pub fn model(&self) -> ModelConfig {
        ModelConfig {
            base: self.model_base.clone(),
            min_score: self.min_score,
            max_detections: self.max_detections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.detection_interval(), Duration::from_millis(100));
        assert_eq!(config.max_clip_duration(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"auto_record": true, "max_clip_secs": 5}"#).unwrap();
        assert!(config.auto_record);
        assert_eq!(config.max_clip_secs, 5);
        assert_eq!(config.detection_interval_ms, 100);
        assert_eq!(config.model().base, "mobilenet_v2");
    }

    #[test]
    fn test_validate_rejects_out_of_range_volume() {
        let config = Config {
            notification_volume: 1.2,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = Config {
            detection_interval_ms: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
