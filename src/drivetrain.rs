//! # Drivetrain Interface
//!
//! The velocity-command entry point of the drivetrain collaborator.
//! Kinematics and motor control live behind this trait.

use tracing::{info, trace};

/// Accepts one chassis velocity command per control cycle.
#[cfg_attr(test, mockall::automock)]
pub trait Drivetrain {
    /// Commands chassis velocity: `vx`, `vy` in m/s and `omega` in rad/s.
    fn drive(&mut self, vx: f64, vy: f64, omega: f64);
}

/// Drivetrain that only logs commands.
///
/// Used when no hardware backend is attached.
#[derive(Debug, Default)]
pub struct LoggingDrivetrain {
    commands: u64,
    log_interval: u64,
}

impl LoggingDrivetrain {
    /// Creates a logging drivetrain that reports at `info` every `log_interval` commands.
    #[must_use]
    pub fn new(log_interval: u64) -> Self {
        Self {
            commands: 0,
            log_interval,
        }
    }

    /// Number of commands received.
    #[must_use]
    pub fn commands(&self) -> u64 {
        self.commands
    }
}

impl Drivetrain for LoggingDrivetrain {
    fn drive(&mut self, vx: f64, vy: f64, omega: f64) {
        self.commands += 1;
        trace!(vx, vy, omega, "drive command");

        if self.log_interval > 0 && self.commands % self.log_interval == 0 {
            info!(
                "Drive command #{}: vx={:.3} m/s vy={:.3} m/s omega={:.3} rad/s",
                self.commands, vx, vy, omega
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_drivetrain_counts_commands() {
        let mut drivetrain = LoggingDrivetrain::new(2);
        drivetrain.drive(0.0, 0.0, 0.0);
        drivetrain.drive(1.0, -1.0, 0.5);
        drivetrain.drive(1.0, -1.0, 0.5);
        assert_eq!(drivetrain.commands(), 3);
    }

    #[test]
    fn test_logging_drivetrain_zero_interval() {
        let mut drivetrain = LoggingDrivetrain::default();
        drivetrain.drive(0.1, 0.2, 0.3);
        assert_eq!(drivetrain.commands(), 1);
    }
}
