//! # Speed Scaling
//!
//! Maps shaped unit values to physical units (m/s, rad/s).
//!
//! Translational axes run at half speed by default. Holding the boost input
//! lifts them to full speed. Rotation is never reduced.
//!
//! Operator bindings label this input "slow mode", but its `false` state is
//! the half-speed default and `true` is full speed. Downstream bindings depend
//! on that polarity, so it is kept and named `boost` here for what it does.

/// Multiplier applied to translation while boost is not held.
pub const SLOW_SPEED_FACTOR: f64 = 0.5;

/// Multiplier applied to translation while boost is held.
pub const BOOST_SPEED_FACTOR: f64 = 1.0;

/// Scales shaped unit values to physical velocities.
///
/// # Examples
///
/// ```
/// use drive_shaper::shaping::scaling::SpeedScaler;
///
/// let scaler = SpeedScaler::new(3.0, 6.0);
///
/// assert_eq!(scaler.translation(-1.0, false), -1.5);
/// assert_eq!(scaler.translation(-1.0, true), -3.0);
/// assert_eq!(scaler.rotation(0.5), 3.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedScaler {
    /// Max translational speed in m/s.
    max_speed_mps: f64,
    /// Max rotational speed in rad/s.
    max_rotation_radps: f64,
}

impl SpeedScaler {
    /// Creates a scaler from the physical maxima.
    #[must_use]
    pub fn new(max_speed_mps: f64, max_rotation_radps: f64) -> Self {
        Self {
            max_speed_mps,
            max_rotation_radps,
        }
    }

    /// Returns the configured max translational speed (m/s).
    #[must_use]
    pub fn max_speed_mps(&self) -> f64 {
        self.max_speed_mps
    }

    /// Returns the configured max rotational speed (rad/s).
    #[must_use]
    pub fn max_rotation_radps(&self) -> f64 {
        self.max_rotation_radps
    }

    /// Translation multiplier for the given boost state.
    #[inline]
    #[must_use]
    pub fn speed_factor(boost: bool) -> f64 {
        if boost {
            BOOST_SPEED_FACTOR
        } else {
            SLOW_SPEED_FACTOR
        }
    }

    /// Scales a shaped translational value to m/s.
    #[must_use]
    pub fn translation(&self, shaped: f64, boost: bool) -> f64 {
        shaped * self.max_speed_mps * Self::speed_factor(boost)
    }

    /// Scales a shaped rotational value to rad/s.
    #[must_use]
    pub fn rotation(&self, shaped: f64) -> f64 {
        shaped * self.max_rotation_radps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_factor_polarity() {
        // false is the half-speed default, true is full speed
        assert_eq!(SpeedScaler::speed_factor(false), 0.5);
        assert_eq!(SpeedScaler::speed_factor(true), 1.0);
    }

    #[test]
    fn test_translation_without_boost_is_half_of_boosted() {
        let scaler = SpeedScaler::new(4.2, 3.0);
        for shaped in [-1.0, -0.37, 0.0, 0.25, 1.0] {
            let slow = scaler.translation(shaped, false);
            let fast = scaler.translation(shaped, true);
            assert_eq!(slow, fast * 0.5, "shaped={}", shaped);
        }
    }

    #[test]
    fn test_translation_full_scale() {
        let scaler = SpeedScaler::new(3.0, 1.0);
        assert_eq!(scaler.translation(1.0, true), 3.0);
        assert_eq!(scaler.translation(-1.0, false), -1.5);
    }

    #[test]
    fn test_rotation_ignores_boost() {
        let scaler = SpeedScaler::new(3.0, 2.0);
        assert_eq!(scaler.rotation(-1.0), -2.0);
        assert_eq!(scaler.rotation(0.25), 0.5);
    }

    #[test]
    fn test_accessors() {
        let scaler = SpeedScaler::new(3.5, 6.28);
        assert_eq!(scaler.max_speed_mps(), 3.5);
        assert_eq!(scaler.max_rotation_radps(), 6.28);
    }
}
