//! # Drive Command Pipeline
//!
//! Turns one cycle of operator input into one chassis velocity command.
//!
//! ## Stages
//!
//! | Step | Throttle / Strafe | Rotation |
//! |------|-------------------|----------|
//! | 1 | clamp to [-1, 1] | clamp to [-1, 1] |
//! | 2 | translation deadband | rotation deadband |
//! | 3 | `-sign(y) * y²` | `-sign(y) * y²` |
//! | 4 | `* max_speed * (boost ? 1.0 : 0.5)` | `* max_rotation` |
//! | 5 | slew limit (one limiter per axis) | passed through |
//!
//! The two slew limiters are the only state carried between cycles.
//!
//! ## Usage
//!
//! ```
//! use drive_shaper::config::ShapingConfig;
//! use drive_shaper::pipeline::{DriveCommandPipeline, DriveInput};
//!
//! let config = ShapingConfig::default();
//! let mut pipeline = DriveCommandPipeline::new(&config);
//!
//! let input = DriveInput { throttle: 1.0, ..DriveInput::default() };
//! let command = pipeline.step(&input, config.dt());
//!
//! // Full forward stick ramps toward -1.5 m/s, 0.12 m/s per 20 ms cycle
//! assert!((command.vx + 0.12).abs() < 1e-9);
//! assert_eq!(command.omega, 0.0);
//! ```

use tracing::{debug, trace, warn};

use crate::config::ShapingConfig;
use crate::drivetrain::Drivetrain;
use crate::shaping::{AxisCalibration, SlewLimiter, SpeedScaler};
use crate::telemetry::TelemetrySink;

/// Telemetry key for the post-deadband throttle.
pub const KEY_THROTTLE_RAW: &str = "throttle_raw";
/// Telemetry key for the scaled throttle before slew limiting.
pub const KEY_THROTTLE_TARGET: &str = "throttle_target";
/// Telemetry key for the slew-limited throttle.
pub const KEY_THROTTLE_SLEWED: &str = "throttle_slewed";

/// Operator input sampled for one cycle.
///
/// Axes are nominally in [-1.0, 1.0] but are clamped by the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriveInput {
    /// Forward/back stick, becomes `vx`.
    pub throttle: f64,
    /// Left/right stick, becomes `vy`.
    pub strafe: f64,
    /// Rotation stick, becomes `omega`.
    pub rotation: f64,
    /// Full-speed translation while held. Released means half speed.
    pub boost: bool,
}

/// Chassis velocity command for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriveCommand {
    /// Forward velocity in m/s.
    pub vx: f64,
    /// Lateral velocity in m/s.
    pub vy: f64,
    /// Angular velocity in rad/s.
    pub omega: f64,
}

/// Per-cycle input shaping for throttle, strafe and rotation.
///
/// # Thread Safety
///
/// Not synchronized. Exactly one cycle may be in flight at a time, which is
/// the caller's responsibility.
pub struct DriveCommandPipeline {
    calibration: AxisCalibration,
    scaler: SpeedScaler,
    slew_x: SlewLimiter,
    slew_y: SlewLimiter,
    nominal_dt: f64,
    telemetry: Option<Box<dyn TelemetrySink>>,
    telemetry_failures: u64,
}

impl std::fmt::Debug for DriveCommandPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveCommandPipeline")
            .field("calibration", &self.calibration)
            .field("scaler", &self.scaler)
            .field("slew_x", &self.slew_x)
            .field("slew_y", &self.slew_y)
            .field("nominal_dt", &self.nominal_dt)
            .field("telemetry", &self.telemetry.is_some())
            .finish()
    }
}

impl DriveCommandPipeline {
    /// Creates a pipeline at rest from the shaping configuration.
    #[must_use]
    pub fn new(config: &ShapingConfig) -> Self {
        Self {
            calibration: AxisCalibration::from_deadbands(
                config.translation_deadband,
                config.rotation_deadband,
            ),
            scaler: SpeedScaler::new(config.max_speed_mps, config.max_rotation_radps),
            slew_x: SlewLimiter::new(config.translation_slew_rate),
            slew_y: SlewLimiter::new(config.translation_slew_rate),
            nominal_dt: config.dt(),
            telemetry: None,
            telemetry_failures: 0,
        }
    }

    /// Attaches a telemetry sink.
    #[must_use]
    pub fn with_telemetry(mut self, sink: Box<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    /// Nominal control period in seconds.
    #[must_use]
    pub fn nominal_dt(&self) -> f64 {
        self.nominal_dt
    }

    /// Number of telemetry publishes that failed and were dropped.
    #[must_use]
    pub fn telemetry_failures(&self) -> u64 {
        self.telemetry_failures
    }

    /// Returns both slew limiters to rest.
    ///
    /// Call when the drive loop is (re)started.
    pub fn reset(&mut self) {
        debug!("Resetting drive pipeline slew state");
        self.slew_x.reset();
        self.slew_y.reset();
    }

    /// Computes the command for one cycle of `dt` seconds.
    pub fn step(&mut self, input: &DriveInput, dt: f64) -> DriveCommand {
        let throttle_deadbanded = self.calibration.throttle.apply_deadband(input.throttle);
        self.publish(KEY_THROTTLE_RAW, throttle_deadbanded);

        let throttle = self.calibration.throttle.apply(input.throttle);
        let strafe = self.calibration.strafe.apply(input.strafe);
        let rotation = self.calibration.rotation.apply(input.rotation);

        let throttle_target = self.scaler.translation(throttle, input.boost);
        let strafe_target = self.scaler.translation(strafe, input.boost);
        let omega = self.scaler.rotation(rotation);

        let vx = self.slew_x.update(throttle_target, dt);
        let vy = self.slew_y.update(strafe_target, dt);

        self.publish(KEY_THROTTLE_TARGET, throttle_target);
        self.publish(KEY_THROTTLE_SLEWED, vx);
        self.finish_telemetry_cycle();

        trace!(
            throttle_target,
            strafe_target,
            vx,
            vy,
            omega,
            boost = input.boost,
            "pipeline step"
        );

        DriveCommand { vx, vy, omega }
    }

    /// Computes the command for one cycle and sends it to the drivetrain.
    ///
    /// Exactly one `drive` call is made per invocation.
    pub fn run_cycle<D: Drivetrain + ?Sized>(
        &mut self,
        input: &DriveInput,
        dt: f64,
        drivetrain: &mut D,
    ) -> DriveCommand {
        let command = self.step(input, dt);
        drivetrain.drive(command.vx, command.vy, command.omega);
        command
    }

    fn publish(&mut self, key: &'static str, value: f64) {
        let Some(sink) = self.telemetry.as_mut() else {
            return;
        };
        if let Err(e) = sink.put_number(key, value) {
            self.record_telemetry_failure(&e);
        }
    }

    fn finish_telemetry_cycle(&mut self) {
        let Some(sink) = self.telemetry.as_mut() else {
            return;
        };
        if let Err(e) = sink.end_cycle() {
            self.record_telemetry_failure(&e);
        }
    }

    fn record_telemetry_failure(&mut self, error: &crate::error::DriveShaperError) {
        self.telemetry_failures += 1;
        if self.telemetry_failures == 1 {
            warn!("Telemetry publish failed, continuing without it: {}", error);
        } else {
            debug!("Telemetry publish failed: {}", error);
        }
    }
}
