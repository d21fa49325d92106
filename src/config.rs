//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Configuration is read once at startup. Invalid values are a fatal startup
//! error; the per-cycle pipeline never validates anything.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{DriveShaperError, Result};
use crate::gamepad::mapper::{parse_axis, parse_button};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Drive shaping configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DriveConfig {
    #[serde(default = "default_translation_deadband")]
    pub translation_deadband: f64,

    #[serde(default = "default_rotation_deadband")]
    pub rotation_deadband: f64,

    #[serde(default = "default_max_speed_mps")]
    pub max_speed_mps: f64,

    #[serde(default = "default_max_rotation_radps")]
    pub max_rotation_radps: f64,

    #[serde(default = "default_translation_slew_rate")]
    pub translation_slew_rate: f64,

    #[serde(default = "default_cycle_period_ms")]
    pub cycle_period_ms: u64,
}

/// Gamepad input configuration
#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    #[serde(default)]
    pub device_path: String,

    #[serde(default = "default_throttle_axis")]
    pub throttle_axis: String,

    #[serde(default = "default_strafe_axis")]
    pub strafe_axis: String,

    #[serde(default = "default_rotation_axis")]
    pub rotation_axis: String,

    #[serde(default = "default_boost_button")]
    pub boost_button: String,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u64,
}

// Default value functions
fn default_translation_deadband() -> f64 { 0.05 }
fn default_rotation_deadband() -> f64 { 0.10 }
fn default_max_speed_mps() -> f64 { 3.0 }
fn default_max_rotation_radps() -> f64 { 2.0 * std::f64::consts::PI }
fn default_translation_slew_rate() -> f64 { 6.0 }
fn default_cycle_period_ms() -> u64 { 20 }

fn default_throttle_axis() -> String { "ABS_Y".to_string() }
fn default_strafe_axis() -> String { "ABS_X".to_string() }
fn default_rotation_axis() -> String { "ABS_RX".to_string() }
fn default_boost_button() -> String { "BTN_TR".to_string() }

fn default_telemetry_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_interval_ms() -> u64 { 100 }

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            translation_deadband: default_translation_deadband(),
            rotation_deadband: default_rotation_deadband(),
            max_speed_mps: default_max_speed_mps(),
            max_rotation_radps: default_max_rotation_radps(),
            translation_slew_rate: default_translation_slew_rate(),
            cycle_period_ms: default_cycle_period_ms(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            device_path: String::new(),
            throttle_axis: default_throttle_axis(),
            strafe_axis: default_strafe_axis(),
            rotation_axis: default_rotation_axis(),
            boost_button: default_boost_button(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            log_interval_ms: default_log_interval_ms(),
        }
    }
}

/// Immutable shaping parameters consumed by the pipeline.
///
/// Derived from [`DriveConfig`] once at startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapingConfig {
    /// Deadband for throttle and strafe, in `[0, 1)`.
    pub translation_deadband: f64,
    /// Deadband for rotation, in `[0, 1)`.
    pub rotation_deadband: f64,
    /// Max translational speed (m/s).
    pub max_speed_mps: f64,
    /// Max rotational speed (rad/s).
    pub max_rotation_radps: f64,
    /// Translational slew rate limit (units/s).
    pub translation_slew_rate: f64,
    /// Nominal control period (s).
    pub cycle_period_s: f64,
}

impl Default for ShapingConfig {
    fn default() -> Self {
        DriveConfig::default().shaping()
    }
}

impl ShapingConfig {
    /// Nominal control period in seconds.
    #[must_use]
    pub fn dt(&self) -> f64 {
        self.cycle_period_s
    }
}

impl TelemetryConfig {
    /// Minimum spacing between two telemetry records.
    #[must_use]
    pub fn log_interval(&self) -> Duration {
        Duration::from_millis(self.log_interval_ms)
    }
}

impl DriveConfig {
    /// Nominal control period.
    #[must_use]
    pub fn cycle_period(&self) -> Duration {
        Duration::from_millis(self.cycle_period_ms)
    }

    /// Builds the pipeline's shaping parameters.
    #[must_use]
    pub fn shaping(&self) -> ShapingConfig {
        ShapingConfig {
            translation_deadband: self.translation_deadband,
            rotation_deadband: self.rotation_deadband,
            max_speed_mps: self.max_speed_mps,
            max_rotation_radps: self.max_rotation_radps,
            translation_slew_rate: self.translation_slew_rate,
            cycle_period_s: self.cycle_period().as_secs_f64(),
        }
    }
}

fn config_error(message: impl std::fmt::Display) -> DriveShaperError {
    DriveShaperError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use drive_shaper::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from a TOML string
    ///
    /// # Examples
    ///
    /// ```
    /// use drive_shaper::config::Config;
    ///
    /// let config = Config::from_toml_str("[drive]\nmax_speed_mps = 4.5\n")?;
    /// assert_eq!(config.drive.max_speed_mps, 4.5);
    /// assert_eq!(config.drive.cycle_period_ms, 20);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Shaping parameters for the pipeline.
    #[must_use]
    pub fn shaping(&self) -> ShapingConfig {
        self.drive.shaping()
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Validate deadbands
        for (name, value) in [
            ("translation_deadband", self.drive.translation_deadband),
            ("rotation_deadband", self.drive.rotation_deadband),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(config_error(format!("{} must be in [0.0, 1.0)", name)));
            }
        }

        // Validate physical limits
        for (name, value) in [
            ("max_speed_mps", self.drive.max_speed_mps),
            ("max_rotation_radps", self.drive.max_rotation_radps),
            ("translation_slew_rate", self.drive.translation_slew_rate),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(config_error(format!("{} must be a positive number", name)));
            }
        }

        if self.drive.cycle_period_ms == 0 || self.drive.cycle_period_ms > 1000 {
            return Err(config_error("cycle_period_ms must be between 1 and 1000"));
        }

        // Validate input bindings
        for (name, value) in [
            ("throttle_axis", &self.input.throttle_axis),
            ("strafe_axis", &self.input.strafe_axis),
            ("rotation_axis", &self.input.rotation_axis),
        ] {
            if parse_axis(value).is_none() {
                return Err(config_error(format!("{} '{}' is not a known axis", name, value)));
            }
        }

        let axes = [
            &self.input.throttle_axis,
            &self.input.strafe_axis,
            &self.input.rotation_axis,
        ];
        for (i, axis) in axes.iter().enumerate() {
            if axes[..i].contains(axis) {
                return Err(config_error(format!(
                    "axis '{}' is bound to more than one drive role",
                    axis
                )));
            }
        }

        if parse_button(&self.input.boost_button).is_none() {
            return Err(config_error(format!(
                "boost_button '{}' is not a known button",
                self.input.boost_button
            )));
        }

        // Validate telemetry configuration
        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(config_error("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(config_error("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(config_error("max_files_to_keep must be greater than 0"));
        }

        if self.telemetry.log_interval_ms == 0 || self.telemetry.log_interval_ms > 60000 {
            return Err(config_error("log_interval_ms must be between 1 and 60000"));
        }

        Ok(())
    }
}
