//! Hardware capability interfaces.
//!
//! Every controller in this crate talks to the robot through the small traits
//! defined here instead of concrete vexide devices. On the V5 Brain the traits
//! are implemented for the real devices (see `vex`); on the host the tests use
//! scripted doubles.
//!
//! Devices are shared between the background control loops and the code that
//! issues commands, so they are stored in reference-counted cells, exactly like
//! the drivetrain motor groups:
//!
//! ```ignore
//! use highstakes::peripherals::{make_cloneable, OpticalSensor};
//!
//! let ring_sensor = make_cloneable(optical);
//! let for_color_sort = ring_sensor.clone();
//! ```

use std::{cell::RefCell, future::Future, rc::Rc, time::Duration};

/// Pneumatic actuator built on a digital output.
pub mod piston;

/// vexide implementations of the capability traits.
#[cfg(target_os = "vexos")]
pub mod vex;

#[cfg(test)]
pub(crate) mod mock;

/// A device handle shared between tasks.
pub type Shared<T> = Rc<RefCell<T>>;

/// Makes an object clonable by wrapping it in `Rc` and `RefCell`
pub fn make_cloneable<T>(t: T) -> Shared<T> { Rc::new(RefCell::new(t)) }

/// Errors reported by device reads and writes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeviceError {
    /// Nothing is plugged into the port.
    #[error("device disconnected")]
    Disconnected,
    /// The port reported an error.
    #[error("port error: {0}")]
    Port(String),
    /// The device returned a value outside of its documented domain.
    #[error("reading out of range: {0}")]
    OutOfRange(f64),
}

/// What a motor does when it is told to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrakeMode {
    /// Let the motor spin down freely.
    #[default]
    Coast,
    /// Short the windings to stop quickly.
    Brake,
    /// Actively hold the current position.
    Hold,
}

/// Motor cartridge, which sets the free speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gearset {
    /// 100 rpm.
    Red,
    /// 200 rpm.
    #[default]
    Green,
    /// 600 rpm.
    Blue,
}

impl Gearset {
    pub fn max_rpm(self) -> f64 {
        match self {
            Gearset::Red => 100.0,
            Gearset::Green => 200.0,
            Gearset::Blue => 600.0,
        }
    }
}

/// A group of motors that are always commanded together.
pub trait MotorGroup {
    /// Sets the output power on a `-127..=127` scale.
    fn set_power(&mut self, power: f64) -> Result<(), DeviceError>;

    /// Sets the target velocity in rpm.
    fn set_velocity(&mut self, rpm: f64) -> Result<(), DeviceError>;

    /// Stops the motors using the configured brake mode.
    fn brake(&mut self) -> Result<(), DeviceError>;

    /// Sets the brake mode used by [`MotorGroup::brake`].
    fn set_brake_mode(&mut self, mode: BrakeMode) -> Result<(), DeviceError>;

    /// Average encoder position of the group, in rotations.
    fn position(&self) -> Result<f64, DeviceError>;

    /// Zeroes the encoders of every motor in the group.
    fn reset_position(&mut self) -> Result<(), DeviceError>;

    /// Largest torque reported by any motor in the group, in Nm.
    fn torque(&self) -> Result<f64, DeviceError>;

    /// Total current draw in mA.
    fn current(&self) -> Result<f64, DeviceError>;

    /// Average measured velocity in rpm.
    fn velocity(&self) -> Result<f64, DeviceError>;
}

/// A color sensor with a proximity channel.
pub trait OpticalSensor {
    /// Detected hue in degrees.
    fn hue(&self) -> Result<f64, DeviceError>;

    /// Raw proximity, `0..=255`, where 255 is closest.
    fn proximity(&self) -> Result<u8, DeviceError>;

    /// Sets the LED brightness, `0.0..=1.0`.
    fn set_led_brightness(&mut self, brightness: f64) -> Result<(), DeviceError>;
}

/// An absolute rotation sensor.
pub trait AngleSensor {
    /// Angle in centidegrees.
    fn angle(&self) -> Result<i32, DeviceError>;

    fn reset_position(&mut self) -> Result<(), DeviceError>;
}

/// A heading source, usually the inertial sensor.
pub trait HeadingSensor {
    /// Heading in degrees, `[0, 360)`.
    fn heading(&self) -> Result<f64, DeviceError>;
}

/// A single digital output line (solenoid valve).
pub trait DigitalOut {
    fn set_level(&mut self, high: bool) -> Result<(), DeviceError>;
}

/// Time source for the control loops.
///
/// All loops and blocking waits go through a `Clock` so they can run against
/// simulated time in tests.
pub trait Clock {
    /// Time elapsed since the user program started.
    fn uptime(&self) -> Duration;

    /// Suspends the calling task for `duration`.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

/// Reads a value from a device, logging and substituting `fallback` on error.
pub(crate) fn read_or<T>(result: Result<T, DeviceError>, what: &str, fallback: T) -> T {
    result.unwrap_or_else(|e| {
        log::warn!("{} Read Error: {}", what, e);
        fallback
    })
}

/// Logs a failed device write.
pub(crate) fn log_write(result: Result<(), DeviceError>, what: &str) {
    if let Err(e) = result {
        log::warn!("{} Write Error: {}", what, e);
    }
}
