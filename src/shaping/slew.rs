//! # Slew Rate Limiter
//!
//! Bounds how fast a translational velocity command may change, preventing
//! abrupt steps that break traction.
//!
//! Each translational axis owns one [`SlewLimiter`]. Rotation is deliberately
//! not limited: on this drivetrain a rotation limiter produced drift and lag.
//!
//! The caller supplies `dt` on every update, so behavior is deterministic and
//! does not depend on being called at an exact wall-clock interval.
//!
//! ## Usage
//!
//! ```
//! use drive_shaper::shaping::slew::SlewLimiter;
//!
//! let mut limiter = SlewLimiter::new(6.0); // 6 units/s
//!
//! // A step to -1.5 moves at most 6.0 * 0.02 = 0.12 per 20 ms cycle
//! let out = limiter.update(-1.5, 0.02);
//! assert!((out + 0.12).abs() < 1e-9);
//! ```

/// Mutable state of one slew-limited axis.
///
/// Holds the last emitted value and the maximum rate of change. Owned by
/// exactly one [`SlewLimiter`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlewState {
    /// Maximum rate of change in units per second.
    pub max_rate: f64,
    /// Last emitted value.
    pub prev_output: f64,
}

impl SlewState {
    /// Creates state at rest (`prev_output = 0`).
    #[must_use]
    pub fn new(max_rate: f64) -> Self {
        Self {
            max_rate: max_rate.abs(),
            prev_output: 0.0,
        }
    }

    /// Largest allowed change for a step of `dt` seconds.
    ///
    /// Non-positive or non-finite `dt` allows no change.
    #[inline]
    #[must_use]
    pub fn max_step(&self, dt: f64) -> f64 {
        if dt.is_finite() && dt > 0.0 {
            self.max_rate * dt
        } else {
            0.0
        }
    }
}

/// Computes the next limited output without mutating anything.
///
/// `next = prev + clamp(target - prev, -max_rate*dt, max_rate*dt)`.
/// When the target is within one step it is returned exactly, so a constant
/// target is reached without residual float error.
///
/// # Examples
///
/// ```
/// use drive_shaper::shaping::slew::{slew_limit, SlewState};
///
/// let state = SlewState::new(1.0);
/// assert_eq!(slew_limit(&state, 0.5, 0.1), 0.1);
/// assert_eq!(slew_limit(&state, 0.05, 0.1), 0.05);
/// ```
#[must_use]
pub fn slew_limit(state: &SlewState, target: f64, dt: f64) -> f64 {
    if target.is_nan() {
        return state.prev_output;
    }

    let max_step = state.max_step(dt);
    let delta = target - state.prev_output;

    if delta.abs() <= max_step {
        target
    } else {
        state.prev_output + max_step.copysign(delta)
    }
}

/// Rate limiter for one translational axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlewLimiter {
    state: SlewState,
}

impl SlewLimiter {
    /// Creates a limiter at rest with the given max rate (units/s).
    #[must_use]
    pub fn new(max_rate: f64) -> Self {
        Self {
            state: SlewState::new(max_rate),
        }
    }

    /// Advances one cycle toward `target` and returns the limited output.
    pub fn update(&mut self, target: f64, dt: f64) -> f64 {
        let next = slew_limit(&self.state, target, dt);
        self.state.prev_output = next;
        next
    }

    /// Last emitted value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.state.prev_output
    }

    /// Read-only view of the limiter state.
    #[must_use]
    pub fn state(&self) -> &SlewState {
        &self.state
    }

    /// Returns the limiter to rest (`prev_output = 0`).
    pub fn reset(&mut self) {
        self.state.prev_output = 0.0;
    }
}
