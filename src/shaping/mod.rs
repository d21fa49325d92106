//! # Shaping Module
//!
//! The per-axis stages of the drive input pipeline.
//!
//! This module handles:
//! - Clamping raw stick samples into the legal range
//! - Applying deadbands (separate for rotation) and the signed square curve
//! - Scaling to physical units with the boost/half-speed multiplier
//! - Slew limiting of the translational axes

pub mod calibration;
pub mod scaling;
pub mod slew;

pub use calibration::{apply_deadband, normalize_axis, signed_square, AxisCalibration, Calibration};
pub use scaling::{SpeedScaler, BOOST_SPEED_FACTOR, SLOW_SPEED_FACTOR};
pub use slew::{slew_limit, SlewLimiter, SlewState};
