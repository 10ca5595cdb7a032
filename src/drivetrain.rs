//! Differential drivetrain control.
//!
//! This module provides the `Differential` struct for controlling robots with
//! separate left and right motor groups, together with the physical
//! [`DrivetrainConfig`] used to turn inches of travel into encoder rotations.
//!
//! # Example
//!
//! ```ignore
//! use highstakes::drivetrain::{Differential, DrivetrainConfig};
//!
//! let drivetrain = Differential::new(left_motors, right_motors, DrivetrainConfig::default());
//! drivetrain.set_power(60.0, 60.0);
//! drivetrain.brake();
//! ```

use std::{cell::RefCell, f64::consts::PI, rc::Rc};

use log::warn;

use crate::peripherals::{BrakeMode, MotorGroup, log_write};

/// Physical drivetrain measurements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrivetrainConfig {
    /// Wheel diameter in inches.
    pub wheel_diameter: f64,
    /// Motor rotations per wheel rotation.
    pub gear_ratio:     f64,
    /// Distance between the left and right wheels in inches.
    pub track_width:    f64,
}

impl Default for DrivetrainConfig {
    /// 2.75" omni wheels geared 48:36 on an 11.1875" track.
    fn default() -> Self {
        DrivetrainConfig {
            wheel_diameter: 2.75,
            gear_ratio:     48.0 / 36.0,
            track_width:    11.1875,
        }
    }
}

impl DrivetrainConfig {
    pub fn new(wheel_diameter: f64, gear_ratio: f64, track_width: f64) -> Self {
        DrivetrainConfig {
            wheel_diameter,
            gear_ratio,
            track_width,
        }
    }

    pub fn wheel_circumference(&self) -> f64 { self.wheel_diameter * PI }

    /// Converts inches of travel into motor rotations.
    pub fn inches_to_rotations(&self, inches: f64) -> f64 {
        inches * self.gear_ratio / self.wheel_circumference()
    }

    /// Converts motor rotations back into inches of travel.
    pub fn rotations_to_inches(&self, rotations: f64) -> f64 {
        rotations * self.wheel_circumference() / self.gear_ratio
    }
}

/// A differential drivetrain controller.
///
/// The motor groups are stored in reference-counted cells to allow shared
/// ownership with other systems (the goal clamp reads the left encoders to
/// bound its search distance).
#[derive(Clone)]
pub struct Differential {
    /// The left motor group.
    pub left:   Rc<RefCell<dyn MotorGroup>>,
    /// The right motor group.
    pub right:  Rc<RefCell<dyn MotorGroup>>,
    /// Physical measurements of the drivetrain.
    pub config: DrivetrainConfig,
}

impl Differential {
    /// Creates a new drivetrain that takes ownership of the motor groups.
    pub fn new<L: MotorGroup + 'static, R: MotorGroup + 'static>(
        left: L,
        right: R,
        config: DrivetrainConfig,
    ) -> Self {
        Self {
            left: Rc::new(RefCell::new(left)),
            right: Rc::new(RefCell::new(right)),
            config,
        }
    }

    /// Creates a new drivetrain with shared ownership of the motor groups.
    pub fn from_shared(
        left: Rc<RefCell<dyn MotorGroup>>,
        right: Rc<RefCell<dyn MotorGroup>>,
        config: DrivetrainConfig,
    ) -> Self {
        Self {
            left,
            right,
            config,
        }
    }

    /// Sets the power of each side on a `-127..=127` scale.
    pub fn set_power(&self, left: f64, right: f64) {
        if let Ok(mut motors) = self.left.try_borrow_mut() {
            log_write(motors.set_power(left), "Left Drive");
        }
        if let Ok(mut motors) = self.right.try_borrow_mut() {
            log_write(motors.set_power(right), "Right Drive");
        }
    }

    /// Sets the velocity of each side in rpm.
    pub fn set_velocity(&self, left: f64, right: f64) {
        if let Ok(mut motors) = self.left.try_borrow_mut() {
            log_write(motors.set_velocity(left), "Left Drive");
        }
        if let Ok(mut motors) = self.right.try_borrow_mut() {
            log_write(motors.set_velocity(right), "Right Drive");
        }
    }

    /// Stops both sides using the current brake mode.
    pub fn brake(&self) {
        if let Ok(mut motors) = self.left.try_borrow_mut() {
            log_write(motors.brake(), "Left Drive");
        }
        if let Ok(mut motors) = self.right.try_borrow_mut() {
            log_write(motors.brake(), "Right Drive");
        }
    }

    /// Sets the brake mode for all motors in the drivetrain.
    ///
    /// Autonomous routines normally run in [`BrakeMode::Hold`] and driver
    /// control in [`BrakeMode::Coast`].
    pub fn set_brakemode(&self, brakemode: BrakeMode) {
        if let Ok(mut motors) = self.left.try_borrow_mut() {
            log_write(motors.set_brake_mode(brakemode), "Left Drive");
        }
        if let Ok(mut motors) = self.right.try_borrow_mut() {
            log_write(motors.set_brake_mode(brakemode), "Right Drive");
        }
    }

    /// Zeroes every drive encoder.
    pub fn reset_position(&self) {
        if let Ok(mut motors) = self.left.try_borrow_mut() {
            log_write(motors.reset_position(), "Left Drive");
        }
        if let Ok(mut motors) = self.right.try_borrow_mut() {
            log_write(motors.reset_position(), "Right Drive");
        }
    }

    /// Returns the average encoder position of both sides in rotations.
    ///
    /// A side whose position cannot be read is excluded from the average and a
    /// warning is logged. Returns `0.0` when neither side can be read.
    pub fn position(&self) -> f64 {
        let mut sum = 0.0;
        let mut denom = 0.0;
        for (name, side) in [("Left", &self.left), ("Right", &self.right)] {
            match side.try_borrow() {
                Ok(motors) => match motors.position() {
                    Ok(p) => {
                        sum += p;
                        denom += 1.0;
                    }
                    Err(e) => warn!("Error Getting {} Encoder Position: {}", name, e),
                },
                Err(e) => warn!("Error Borrowing {} Motors: {}", name, e),
            }
        }
        if denom == 0.0 { 0.0 } else { sum / denom }
    }
}
