//! # Calibration Module
//!
//! Normalizes raw stick samples, applies deadbands and the signed square
//! response curve.
//!
//! ## Deadband
//!
//! A deadband eliminates small stick movements near center to reject drift.
//! Values inside the deadband map to 0.0, values outside are rescaled so the
//! remaining travel still reaches full scale:
//!
//! `output = sign(x) * (|x| - d) / (1 - d)`
//!
//! ## Signed Square Curve
//!
//! Squaring gives finer control near center while keeping full deflection at
//! the endpoints. The result is negated:
//!
//! `output = -sign(y) * y²`
//!
//! The negation is an axis-inversion convention: the reference controller
//! reports forward stick as negative, so every axis is flipped here. Keep it
//! unless the controller mounting has been re-verified.
//!
//! ## Usage
//!
//! ```
//! use drive_shaper::shaping::calibration::Calibration;
//!
//! let cal = Calibration::new(0.05);
//!
//! // Input near center (within deadband)
//! assert_eq!(cal.apply(0.02), 0.0);
//!
//! // Full deflection is preserved, with inverted sign
//! assert!((cal.apply(1.0) + 1.0).abs() < 1e-9);
//! ```

/// Lower bound of a normalized axis sample.
pub const AXIS_MIN: f64 = -1.0;
/// Upper bound of a normalized axis sample.
pub const AXIS_MAX: f64 = 1.0;

/// Largest deadband representable below 1.0.
pub const MAX_DEADBAND: f64 = 1.0 - f64::EPSILON;

/// Clamps a raw axis sample into `[-1.0, 1.0]`.
///
/// Controllers may transiently report values outside the nominal range.
/// These are clamped rather than rejected. NaN is treated as a centered stick.
///
/// # Examples
///
/// ```
/// use drive_shaper::shaping::calibration::normalize_axis;
///
/// assert_eq!(normalize_axis(1.3), 1.0);
/// assert_eq!(normalize_axis(-4.0), -1.0);
/// assert_eq!(normalize_axis(0.25), 0.25);
/// assert_eq!(normalize_axis(f64::NAN), 0.0);
/// ```
#[must_use]
pub fn normalize_axis(raw: f64) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(AXIS_MIN, AXIS_MAX)
}

/// Applies a deadband to a normalized value and rescales the remaining travel.
///
/// # Arguments
///
/// * `x` - Normalized value (-1.0 to 1.0)
/// * `deadband` - Threshold in `[0.0, 1.0)`
///
/// # Examples
///
/// ```
/// use drive_shaper::shaping::calibration::apply_deadband;
///
/// assert_eq!(apply_deadband(0.04, 0.05), 0.0);
/// assert_eq!(apply_deadband(-1.0, 0.05), -1.0);
/// assert!((apply_deadband(0.525, 0.05) - 0.5).abs() < 1e-9);
/// ```
#[must_use]
pub fn apply_deadband(x: f64, deadband: f64) -> f64 {
    let magnitude = x.abs();
    if magnitude < deadband {
        return 0.0;
    }
    let rescaled = (magnitude - deadband) / (1.0 - deadband);
    rescaled.copysign(x)
}

/// Applies the inverted signed square curve: `-sign(y) * y²`.
///
/// The curve is odd, so opposite deflections stay opposite.
///
/// # Examples
///
/// ```
/// use drive_shaper::shaping::calibration::signed_square;
///
/// assert_eq!(signed_square(0.5), -0.25);
/// assert_eq!(signed_square(-0.5), 0.25);
/// assert_eq!(signed_square(0.0), 0.0);
/// ```
#[must_use]
pub fn signed_square(y: f64) -> f64 {
    if y == 0.0 {
        return 0.0;
    }
    -(y * y.abs())
}

/// Per-axis shaping: normalize, deadband, signed square.
///
/// Input is a raw sample; output is a unit value in `[-1.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Deadband as a fraction in `[0.0, 1.0)`.
    deadband: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self { deadband: 0.05 }
    }
}

impl Calibration {
    /// Creates a calibration with the given deadband.
    ///
    /// The deadband is expected to be validated by the configuration layer,
    /// which accepts `[0.0, 1.0)`. Any value in that range is used as is.
    /// NaN and negative values become 0.0, values at or above 1.0 become
    /// [`MAX_DEADBAND`] so the rescale never divides by zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use drive_shaper::shaping::calibration::Calibration;
    ///
    /// let cal = Calibration::new(0.1);
    /// assert_eq!(cal.deadband(), 0.1);
    /// ```
    #[must_use]
    pub fn new(deadband: f64) -> Self {
        let deadband = if deadband.is_nan() { 0.0 } else { deadband };
        Self {
            deadband: deadband.clamp(0.0, MAX_DEADBAND),
        }
    }

    /// Returns the configured deadband.
    #[must_use]
    pub fn deadband(&self) -> f64 {
        self.deadband
    }

    /// Applies deadband only, after normalization.
    ///
    /// This is the value published as the raw throttle diagnostic.
    #[must_use]
    pub fn apply_deadband(&self, raw: f64) -> f64 {
        apply_deadband(normalize_axis(raw), self.deadband)
    }

    /// Runs the full shaping chain on a raw sample.
    #[must_use]
    pub fn apply(&self, raw: f64) -> f64 {
        signed_square(self.apply_deadband(raw))
    }
}

/// Calibration settings for the three drive axes.
///
/// Rotation has its own deadband since spring-centering tolerance on the
/// rotation stick is usually looser.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisCalibration {
    /// Throttle axis (forward/back, becomes vx).
    pub throttle: Calibration,
    /// Strafe axis (left/right, becomes vy).
    pub strafe: Calibration,
    /// Rotation axis (becomes omega).
    pub rotation: Calibration,
}

impl Default for AxisCalibration {
    fn default() -> Self {
        Self::from_deadbands(0.05, 0.10)
    }
}

impl AxisCalibration {
    /// Creates axis calibration from the translation and rotation deadbands.
    ///
    /// # Examples
    ///
    /// ```
    /// use drive_shaper::shaping::calibration::AxisCalibration;
    ///
    /// let cal = AxisCalibration::from_deadbands(0.05, 0.1);
    /// assert_eq!(cal.throttle.deadband(), 0.05);
    /// assert_eq!(cal.rotation.deadband(), 0.1);
    /// ```
    #[must_use]
    pub fn from_deadbands(translation_deadband: f64, rotation_deadband: f64) -> Self {
        Self {
            throttle: Calibration::new(translation_deadband),
            strafe: Calibration::new(translation_deadband),
            rotation: Calibration::new(rotation_deadband),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    // ==================== Normalization Tests ====================

    #[test]
    fn test_normalize_in_range_unchanged() {
        for x in [-1.0, -0.5, 0.0, 0.3, 1.0] {
            assert_eq!(normalize_axis(x), x);
        }
    }

    #[test]
    fn test_normalize_clamps_out_of_range() {
        assert_eq!(normalize_axis(1.3), 1.0);
        assert_eq!(normalize_axis(-1.0001), -1.0);
        assert_eq!(normalize_axis(f64::INFINITY), 1.0);
        assert_eq!(normalize_axis(f64::NEG_INFINITY), -1.0);
    }

    #[test]
    fn test_normalize_nan_is_centered() {
        assert_eq!(normalize_axis(f64::NAN), 0.0);
    }

    // ==================== Deadband Tests ====================

    #[test]
    fn test_deadband_within_zone() {
        for d in [0.05, 0.1, 0.2] {
            for x in [0.0, d * 0.5, -d * 0.5, d * 0.999, -d * 0.999] {
                assert_eq!(apply_deadband(x, d), 0.0, "x={} d={}", x, d);
            }
        }
    }

    #[test]
    fn test_deadband_full_scale_preserved() {
        for d in [0.0, 0.05, 0.1, 0.5, 0.9] {
            assert!((apply_deadband(1.0, d) - 1.0).abs() < EPS);
            assert!((apply_deadband(-1.0, d) + 1.0).abs() < EPS);
        }
    }

    #[test]
    fn test_deadband_at_threshold_is_zero() {
        assert_eq!(apply_deadband(0.1, 0.1), 0.0);
        assert_eq!(apply_deadband(-0.1, 0.1), 0.0);
    }

    #[test]
    fn test_deadband_scaling() {
        // Halfway between deadband and max maps to 0.5
        assert!((apply_deadband(0.55, 0.1) - 0.5).abs() < EPS);
        assert!((apply_deadband(-0.55, 0.1) + 0.5).abs() < EPS);
    }

    #[test]
    fn test_deadband_zero_threshold_is_identity() {
        for x in [-0.7, -0.1, 0.0, 0.42, 0.9] {
            assert!((apply_deadband(x, 0.0) - x).abs() < EPS);
        }
    }

    #[test]
    fn test_deadband_output_bounded() {
        let mut x = -1.0;
        while x <= 1.0 {
            assert!(apply_deadband(x, 0.07).abs() <= 1.0);
            x += 0.01;
        }
    }

    // ==================== Signed Square Tests ====================

    #[test]
    fn test_signed_square_inverts_direction() {
        // Positive stick becomes negative command by convention
        assert_eq!(signed_square(1.0), -1.0);
        assert_eq!(signed_square(-1.0), 1.0);
    }

    #[test]
    fn test_signed_square_is_odd() {
        let mut y = 0.0;
        while y <= 1.0 {
            assert_eq!(signed_square(-y), -signed_square(y));
            y += 0.05;
        }
    }

    #[test]
    fn test_signed_square_reduces_small_inputs() {
        assert!((signed_square(0.3) + 0.09).abs() < EPS);
        assert!(signed_square(0.3).abs() < 0.3);
    }

    #[test]
    fn test_signed_square_output_bounded() {
        let mut y = -1.0;
        while y <= 1.0 {
            assert!(signed_square(y).abs() <= 1.0);
            y += 0.01;
        }
    }

    // ==================== Calibration Tests ====================

    #[test]
    fn test_calibration_default() {
        assert_eq!(Calibration::default().deadband(), 0.05);
    }

    #[test]
    fn test_calibration_clamps_deadband() {
        assert_eq!(Calibration::new(-0.2).deadband(), 0.0);
        assert_eq!(Calibration::new(1.0).deadband(), MAX_DEADBAND);
        assert_eq!(Calibration::new(f64::NAN).deadband(), 0.0);
    }

    #[test]
    fn test_calibration_keeps_wide_deadband() {
        let cal = Calibration::new(0.995);
        assert_eq!(cal.deadband(), 0.995);
        assert_eq!(cal.apply(0.993), 0.0);
        assert_eq!(cal.apply(-0.994), 0.0);
        assert!((cal.apply(1.0) + 1.0).abs() < EPS);
    }

    #[test]
    fn test_calibration_max_deadband_full_scale() {
        let cal = Calibration::new(2.0);
        assert_eq!(cal.apply(0.999_999), 0.0);
        assert_eq!(cal.apply(1.0), -1.0);
    }

    #[test]
    fn test_calibration_full_chain() {
        let cal = Calibration::new(0.05);
        assert_eq!(cal.apply(0.03), 0.0);
        assert!((cal.apply(1.0) + 1.0).abs() < EPS);
        assert!((cal.apply(-1.0) - 1.0).abs() < EPS);
        // Out-of-range input normalizes to full scale first
        assert_eq!(cal.apply(1.3), cal.apply(1.0));
    }

    #[test]
    fn test_axis_calibration_distinct_rotation_deadband() {
        let cal = AxisCalibration::from_deadbands(0.05, 0.15);
        assert_eq!(cal.throttle.apply(0.1), cal.strafe.apply(0.1));
        assert!(cal.throttle.apply(0.1) != 0.0);
        assert_eq!(cal.rotation.apply(0.1), 0.0);
    }
}
