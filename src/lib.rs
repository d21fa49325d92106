//! # Drive Shaper Library
//!
//! Turn raw gamepad stick samples into bounded, smoothed chassis velocity
//! commands for a mobile robot drivetrain.
//!
//! Every control cycle the [`pipeline::DriveCommandPipeline`] runs the input
//! through deadband rejection, a sign-preserving square curve, speed scaling
//! with a boost mode, and per-axis slew limiting on the translational axes,
//! then hands `(vx, vy, omega)` to a [`drivetrain::Drivetrain`].

pub mod config;
pub mod drivetrain;
pub mod error;
pub mod gamepad;
pub mod pipeline;
pub mod shaping;
pub mod telemetry;
