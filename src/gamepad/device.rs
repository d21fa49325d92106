//! # Gamepad Device Module
//!
//! Opens a gamepad through the Linux evdev interface.
//!
//! A device is accepted if it exposes all three bound drive axes. When no
//! path is configured, `/dev/input/event*` is scanned in sorted order and the
//! first matching device wins.

use evdev::Device;
use std::path::Path;
use tracing::{debug, info};

use super::mapper::{AxisRange, InputBindings};
use crate::error::{DriveShaperError, Result};

/// Gamepad handle
pub struct Gamepad {
    device: Device,
    device_path: String,
}

impl std::fmt::Debug for Gamepad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gamepad")
            .field("device_path", &self.device_path)
            .field("name", &self.device.name())
            .finish_non_exhaustive()
    }
}

impl Gamepad {
    /// Opens the configured device, or auto-detects one if `device_path` is empty.
    ///
    /// # Errors
    ///
    /// - `GamepadNotFound`: no device exposes the bound axes
    /// - `Gamepad`: the configured device cannot be opened or lacks the axes
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use drive_shaper::gamepad::{Gamepad, InputBindings};
    ///
    /// let gamepad = Gamepad::open("", &InputBindings::default())?;
    /// println!("Connected to gamepad at: {}", gamepad.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(device_path: &str, bindings: &InputBindings) -> Result<Self> {
        if device_path.is_empty() {
            return Self::detect(bindings);
        }

        let device = Device::open(device_path).map_err(|e| {
            DriveShaperError::Gamepad(format!("Failed to open {}: {}", device_path, e))
        })?;

        if !has_axes(&device, bindings) {
            return Err(DriveShaperError::Gamepad(format!(
                "{} does not expose the configured drive axes",
                device_path
            )));
        }

        info!("Opened gamepad at: {}", device_path);
        Ok(Self {
            device,
            device_path: device_path.to_string(),
        })
    }

    fn detect(bindings: &InputBindings) -> Result<Self> {
        let input_dir = Path::new("/dev/input");

        if !input_dir.exists() {
            return Err(DriveShaperError::Gamepad(
                "/dev/input directory not found".to_string(),
            ));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| DriveShaperError::Gamepad(format!("Failed to read /dev/input: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| {
                DriveShaperError::Gamepad(format!("Failed to read directory entry: {}", e))
            })?;

        // Sorted for deterministic selection when several gamepads are connected
        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let path = entry.path();

            let is_event_device = path
                .file_name()
                .map(|name| name.to_string_lossy().starts_with("event"))
                .unwrap_or(false);
            if !is_event_device {
                continue;
            }

            match Device::open(&path) {
                Ok(device) => {
                    debug!(
                        "Found input device: {} ({})",
                        path.display(),
                        device.name().unwrap_or("unnamed")
                    );

                    if has_axes(&device, bindings) {
                        let device_path = path.to_string_lossy().to_string();
                        info!("Found gamepad at: {}", device_path);
                        return Ok(Self {
                            device,
                            device_path,
                        });
                    }
                }
                Err(e) => {
                    // Permission denied or other errors - skip device
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }

        Err(DriveShaperError::GamepadNotFound)
    }

    /// Device path this gamepad was opened from.
    #[must_use]
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Human-readable device name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.device.name()
    }

    /// Raw ranges of the bound axes in throttle, strafe, rotation order.
    ///
    /// Falls back to the default 8-bit range if the kernel does not report one.
    pub fn axis_ranges(&self, bindings: &InputBindings) -> [AxisRange; 3] {
        let mut ranges = [AxisRange::default(); 3];
        match self.device.get_abs_state() {
            Ok(state) => {
                for (range, axis) in ranges.iter_mut().zip(bindings.axes()) {
                    if let Some(info) = state.get(axis.0 as usize) {
                        if info.maximum > info.minimum {
                            *range = AxisRange {
                                min: info.minimum,
                                max: info.maximum,
                            };
                        }
                    }
                }
            }
            Err(e) => debug!("Could not read axis ranges, using defaults: {}", e),
        }
        ranges
    }

    /// Fetches pending events from the gamepad.
    ///
    /// Blocks until at least one event is available.
    ///
    /// # Errors
    ///
    /// Returns `Gamepad` error if fetching events fails (e.g., disconnected).
    pub fn fetch_events(&mut self) -> Result<impl Iterator<Item = evdev::InputEvent> + '_> {
        self.device
            .fetch_events()
            .map_err(|e| DriveShaperError::Gamepad(format!("Failed to fetch events: {}", e)))
    }
}

fn has_axes(device: &Device, bindings: &InputBindings) -> bool {
    device
        .supported_absolute_axes()
        .map(|axes| bindings.axes().iter().all(|axis| axes.contains(*axis)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device() {
        let result = Gamepad::open("/dev/input/does-not-exist", &InputBindings::default());
        assert!(matches!(result, Err(DriveShaperError::Gamepad(_))));
    }

    // Integration test - only runs with real hardware
    #[test]
    #[ignore]
    fn test_detect_with_real_hardware() {
        let bindings = InputBindings::default();
        let gamepad = Gamepad::open("", &bindings).expect("Gamepad not found");
        assert!(gamepad.device_path().starts_with("/dev/input/event"));

        for range in gamepad.axis_ranges(&bindings) {
            assert!(range.max > range.min);
        }
    }
}
