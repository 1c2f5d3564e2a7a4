use crate::config::Config;

/// UI state changed only by explicit user actions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackPreferences {
    pub mirrored: bool,
    pub notification_volume: f32,
    pub auto_record_enabled: bool,
}

impl PlaybackPreferences {
    pub fn from_config(config: &Config) -> Self {
        Self {
            mirrored: config.mirrored,
            notification_volume: config.notification_volume.clamp(0.0, 1.0),
            auto_record_enabled: config.auto_record,
        }
    }

    pub fn toggle_mirrored(&mut self) -> bool {
        self.mirrored = !self.mirrored;
        self.mirrored
    }

    pub fn toggle_auto_record(&mut self) -> bool {
        self.auto_record_enabled = !self.auto_record_enabled;
        self.auto_record_enabled
    }

    /// Store a new volume, clamped to [0, 1]
    pub fn set_volume(&mut self, volume: f32) -> f32 {
        self.notification_volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        self.notification_volume
    }
}

impl Default for PlaybackPreferences {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
