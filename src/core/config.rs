use crate::models::pose::{DetectorConfig, ModelVariant};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameConfig {
    /// Where the results database and cached models live
    pub data_dir: PathBuf,
    /// Capture width for both video sources, in pixels
    pub capture_width: u32,
    /// Capture height for both video sources, in pixels
    pub capture_height: u32,
    /// Reference-video position (seconds) at which scoring begins,
    /// skipping the choreography intro
    pub dance_start_secs: f64,
    /// Target frame-loop rate; the loop tolerates missed ticks
    pub tick_rate_hz: u32,
    /// Pose model variant: "lite", "full", or "heavy"
    pub model_variant: ModelVariant,
    /// Minimum pose detection confidence (0.0-1.0)
    pub min_detection_confidence: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());

        let mut data_dir = PathBuf::from(home);
        data_dir.push(".groove_data");

        Self {
            data_dir,
            capture_width: 480,
            capture_height: 360,
            dance_start_secs: 10.0,
            tick_rate_hz: 60,
            model_variant: ModelVariant::Lite,
            min_detection_confidence: 0.5,
        }
    }
}

impl GameConfig {
    /// Load configuration from file, creating with defaults if it doesn't exist
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path()?;

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let config: GameConfig = serde_json::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            // Create default config and save it
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.validate()?;

        let config_path = Self::get_config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, contents)?;

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.capture_width == 0 || self.capture_width > 1920 {
            return Err(format!(
                "Invalid capture width: {}. Must be between 1 and 1920",
                self.capture_width
            )
            .into());
        }

        if self.capture_height == 0 || self.capture_height > 1080 {
            return Err(format!(
                "Invalid capture height: {}. Must be between 1 and 1080",
                self.capture_height
            )
            .into());
        }

        if !self.dance_start_secs.is_finite() || self.dance_start_secs < 0.0 {
            return Err(format!(
                "Invalid dance start: {}. Must be a non-negative number of seconds",
                self.dance_start_secs
            )
            .into());
        }

        if self.tick_rate_hz == 0 || self.tick_rate_hz > 120 {
            return Err(format!(
                "Invalid tick rate: {}. Must be between 1 and 120 Hz",
                self.tick_rate_hz
            )
            .into());
        }

        if !(0.0..=1.0).contains(&self.min_detection_confidence) {
            return Err(format!(
                "Invalid detection confidence: {}. Must be between 0.0 and 1.0",
                self.min_detection_confidence
            )
            .into());
        }

        Ok(())
    }

    /// Reset to default configuration
    pub fn reset() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Self::default();
        config.save()?;
        Ok(config)
    }

    /// Detector settings derived from the game configuration
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            model_variant: self.model_variant,
            min_detection_confidence: self.min_detection_confidence,
        }
    }

    /// Get the configuration file path
    fn get_config_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| "Could not determine home directory")?;

        let mut path = PathBuf::from(home);
        path.push(".groove_data");
        path.push("config");
        path.push("settings.json");

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GameConfig::default();
        assert_eq!(config.capture_width, 480);
        assert_eq!(config.capture_height, 360);
        assert_eq!(config.dance_start_secs, 10.0);
        assert_eq!(config.tick_rate_hz, 60);
        assert_eq!(config.model_variant, ModelVariant::Lite);
        assert_eq!(config.min_detection_confidence, 0.5);
    }

    #[test]
    fn test_config_validation() {
        let mut config = GameConfig::default();

        // Valid config should pass
        assert!(config.validate().is_ok());

        // Invalid capture size
        config.capture_width = 0;
        assert!(config.validate().is_err());
        config.capture_width = 480;

        // Negative dance start
        config.dance_start_secs = -1.0;
        assert!(config.validate().is_err());
        config.dance_start_secs = 10.0;

        // Invalid tick rate
        config.tick_rate_hz = 0;
        assert!(config.validate().is_err());
        config.tick_rate_hz = 500;
        assert!(config.validate().is_err());
        config.tick_rate_hz = 60;

        // Invalid detection confidence
        config.min_detection_confidence = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = GameConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: GameConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_detector_config_inherits_settings() {
        let mut config = GameConfig::default();
        config.model_variant = ModelVariant::Heavy;
        config.min_detection_confidence = 0.7;

        let detector = config.detector_config();
        assert_eq!(detector.model_variant, ModelVariant::Heavy);
        assert_eq!(detector.min_detection_confidence, 0.7);
    }
}
