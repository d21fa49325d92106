//! # Gamepad Module
//!
//! Gamepad input via evdev.
//!
//! This module handles:
//! - Opening a configured gamepad or auto-detecting one
//! - Reading axis ranges reported by the device
//! - Folding axis and button events into normalized drive input
//!
//! The pipeline never talks to the device. It receives a
//! [`DriveInput`](crate::pipeline::DriveInput) built from [`GamepadState`].

pub mod device;
pub mod mapper;

pub use device::Gamepad;
pub use mapper::{AxisRange, EventMapper, GamepadState, InputBindings};
