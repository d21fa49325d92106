//! # Gamepad Event Mapper Module
//!
//! Folds raw evdev events into a [`GamepadState`] of normalized drive axes.
//!
//! ## Default Bindings
//!
//! | Input | evdev Code | Drive axis |
//! |-------|------------|------------|
//! | Left Stick Y | ABS_Y | Throttle (vx) |
//! | Left Stick X | ABS_X | Strafe (vy) |
//! | Right Stick X | ABS_RX | Rotation (omega) |
//! | R1 | BTN_TR | Boost |
//!
//! Bindings are configurable by evdev name (see [`parse_axis`] and
//! [`parse_button`]).
//!
//! Raw axis values are mapped from the device's reported `[min, max]` to
//! `[-1.0, 1.0]`. No deadband is applied here; that happens in the pipeline.
//!
//! ## Usage
//!
//! ```
//! use drive_shaper::gamepad::mapper::{EventMapper, InputBindings};
//!
//! let mapper = EventMapper::new(InputBindings::default());
//! let input = mapper.state().drive_input();
//! assert!(!input.boost);
//! ```

use evdev::{AbsoluteAxisType, InputEvent, InputEventKind, Key};

use crate::config::InputConfig;
use crate::error::{DriveShaperError, Result};
use crate::pipeline::DriveInput;

/// Raw axis range assumed until the device reports its own.
pub const DEFAULT_AXIS_MIN: i32 = 0;
/// Raw axis range assumed until the device reports its own.
pub const DEFAULT_AXIS_MAX: i32 = 255;

/// Looks up an absolute axis by its evdev name.
///
/// # Examples
///
/// ```
/// use drive_shaper::gamepad::mapper::parse_axis;
/// use evdev::AbsoluteAxisType;
///
/// assert_eq!(parse_axis("ABS_RX"), Some(AbsoluteAxisType::ABS_RX));
/// assert_eq!(parse_axis("abs_rx"), None);
/// ```
#[must_use]
pub fn parse_axis(name: &str) -> Option<AbsoluteAxisType> {
    let axis = match name {
        "ABS_X" => AbsoluteAxisType::ABS_X,
        "ABS_Y" => AbsoluteAxisType::ABS_Y,
        "ABS_Z" => AbsoluteAxisType::ABS_Z,
        "ABS_RX" => AbsoluteAxisType::ABS_RX,
        "ABS_RY" => AbsoluteAxisType::ABS_RY,
        "ABS_RZ" => AbsoluteAxisType::ABS_RZ,
        "ABS_THROTTLE" => AbsoluteAxisType::ABS_THROTTLE,
        "ABS_RUDDER" => AbsoluteAxisType::ABS_RUDDER,
        "ABS_WHEEL" => AbsoluteAxisType::ABS_WHEEL,
        "ABS_HAT0X" => AbsoluteAxisType::ABS_HAT0X,
        "ABS_HAT0Y" => AbsoluteAxisType::ABS_HAT0Y,
        _ => return None,
    };
    Some(axis)
}

/// Looks up a button by its evdev name.
#[must_use]
pub fn parse_button(name: &str) -> Option<Key> {
    let key = match name {
        "BTN_SOUTH" => Key::BTN_SOUTH,
        "BTN_EAST" => Key::BTN_EAST,
        "BTN_NORTH" => Key::BTN_NORTH,
        "BTN_WEST" => Key::BTN_WEST,
        "BTN_TL" => Key::BTN_TL,
        "BTN_TR" => Key::BTN_TR,
        "BTN_TL2" => Key::BTN_TL2,
        "BTN_TR2" => Key::BTN_TR2,
        "BTN_SELECT" => Key::BTN_SELECT,
        "BTN_START" => Key::BTN_START,
        "BTN_MODE" => Key::BTN_MODE,
        "BTN_THUMBL" => Key::BTN_THUMBL,
        "BTN_THUMBR" => Key::BTN_THUMBR,
        "BTN_TRIGGER" => Key::BTN_TRIGGER,
        "BTN_THUMB" => Key::BTN_THUMB,
        _ => return None,
    };
    Some(key)
}

/// Which evdev codes feed which drive axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputBindings {
    pub throttle: AbsoluteAxisType,
    pub strafe: AbsoluteAxisType,
    pub rotation: AbsoluteAxisType,
    pub boost: Key,
}

impl Default for InputBindings {
    fn default() -> Self {
        Self {
            throttle: AbsoluteAxisType::ABS_Y,
            strafe: AbsoluteAxisType::ABS_X,
            rotation: AbsoluteAxisType::ABS_RX,
            boost: Key::BTN_TR,
        }
    }
}

impl InputBindings {
    /// Resolves bindings from the input configuration.
    ///
    /// # Errors
    ///
    /// Returns `Config` error if a name is unknown.
    pub fn from_config(config: &InputConfig) -> Result<Self> {
        let axis = |name: &str| {
            parse_axis(name).ok_or_else(|| {
                DriveShaperError::Config(serde::de::Error::custom(format!(
                    "unknown axis '{}'",
                    name
                )))
            })
        };
        let boost = parse_button(&config.boost_button).ok_or_else(|| {
            DriveShaperError::Config(serde::de::Error::custom(format!(
                "unknown button '{}'",
                config.boost_button
            )))
        })?;

        Ok(Self {
            throttle: axis(&config.throttle_axis)?,
            strafe: axis(&config.strafe_axis)?,
            rotation: axis(&config.rotation_axis)?,
            boost,
        })
    }

    /// The three bound axes in throttle, strafe, rotation order.
    #[must_use]
    pub fn axes(&self) -> [AbsoluteAxisType; 3] {
        [self.throttle, self.strafe, self.rotation]
    }
}

/// Raw value range reported by a device for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
}

impl Default for AxisRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_AXIS_MIN,
            max: DEFAULT_AXIS_MAX,
        }
    }
}

impl AxisRange {
    /// Maps a raw value to `[-1.0, 1.0]` (unclamped).
    ///
    /// A degenerate range (`max <= min`) maps everything to center.
    ///
    /// # Examples
    ///
    /// ```
    /// use drive_shaper::gamepad::mapper::AxisRange;
    ///
    /// let range = AxisRange { min: -32768, max: 32767 };
    /// assert!((range.normalize(32767) - 1.0).abs() < 1e-9);
    /// assert!((range.normalize(-32768) + 1.0).abs() < 1e-9);
    /// ```
    #[must_use]
    pub fn normalize(&self, raw: i32) -> f64 {
        if self.max <= self.min {
            return 0.0;
        }
        let span = f64::from(self.max) - f64::from(self.min);
        2.0 * (f64::from(raw) - f64::from(self.min)) / span - 1.0
    }
}

/// Normalized gamepad state for the drive axes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GamepadState {
    /// Throttle axis (-1.0 to 1.0).
    pub throttle: f64,
    /// Strafe axis (-1.0 to 1.0).
    pub strafe: f64,
    /// Rotation axis (-1.0 to 1.0).
    pub rotation: f64,
    /// Boost button held.
    pub boost: bool,
}

impl GamepadState {
    /// Builds the pipeline input for this cycle.
    #[must_use]
    pub fn drive_input(&self) -> DriveInput {
        DriveInput {
            throttle: self.throttle,
            strafe: self.strafe,
            rotation: self.rotation,
            boost: self.boost,
        }
    }
}

/// Parses raw evdev events and maintains gamepad state.
///
/// # Thread Safety
///
/// `EventMapper` is not thread-safe. Use from a single task/thread only.
#[derive(Debug, Clone)]
pub struct EventMapper {
    bindings: InputBindings,
    ranges: [AxisRange; 3],
    state: GamepadState,
}

impl Default for EventMapper {
    fn default() -> Self {
        Self::new(InputBindings::default())
    }
}

impl EventMapper {
    /// Creates a mapper with centered state and default axis ranges.
    #[must_use]
    pub fn new(bindings: InputBindings) -> Self {
        Self {
            bindings,
            ranges: [AxisRange::default(); 3],
            state: GamepadState::default(),
        }
    }

    /// Bindings in use.
    #[must_use]
    pub fn bindings(&self) -> &InputBindings {
        &self.bindings
    }

    /// Sets the raw ranges in throttle, strafe, rotation order.
    pub fn set_ranges(&mut self, ranges: [AxisRange; 3]) {
        self.ranges = ranges;
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &GamepadState {
        &self.state
    }

    /// Processes a single evdev input event and updates internal state.
    ///
    /// Returns `true` if the event changed a bound input.
    pub fn process_event(&mut self, event: &InputEvent) -> bool {
        match event.kind() {
            InputEventKind::AbsAxis(axis) => self.process_axis_event(axis, event.value()),
            InputEventKind::Key(key) if key == self.bindings.boost => {
                self.state.boost = event.value() != 0;
                true
            }
            _ => {
                // Ignore sync events, unbound buttons and other event types
                false
            }
        }
    }

    fn process_axis_event(&mut self, axis: AbsoluteAxisType, value: i32) -> bool {
        if axis == self.bindings.throttle {
            self.state.throttle = self.ranges[0].normalize(value);
        } else if axis == self.bindings.strafe {
            self.state.strafe = self.ranges[1].normalize(value);
        } else if axis == self.bindings.rotation {
            self.state.rotation = self.ranges[2].normalize(value);
        } else {
            return false;
        }
        true
    }

    /// Resets to centered axes and released boost.
    ///
    /// Used when the gamepad disconnects so the robot does not keep moving.
    pub fn reset(&mut self) {
        self.state = GamepadState::default();
    }
}
