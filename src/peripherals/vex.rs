//! vexide implementations of the capability traits.
//!
//! Only compiled for the V5 Brain. Every vexide error is flattened into
//! [`DeviceError::Port`] with its message so the control code never depends on
//! vexide's error types.
//!
//! ```ignore
//! use highstakes::peripherals::{make_cloneable, piston::Piston, vex::*};
//!
//! let left = VexMotors::new(vec![
//!     Motor::new(peripherals.port_1, Gearset::Blue, Direction::Reverse),
//!     Motor::new(peripherals.port_2, Gearset::Blue, Direction::Reverse),
//! ]);
//! let ring_sensor = make_cloneable(OpticalSensor::new(peripherals.port_8));
//! let clamp = make_cloneable(Piston::new(AdiDigitalOut::new(peripherals.adi_a), false));
//! ```

use std::{fmt::Display, future::Future, time::Duration};

use vexide::{
    controller::ButtonState,
    math::Angle,
    prelude::{AdiDigitalOut, InertialSensor, Motor, OpticalSensor as VexOptical, RotationSensor},
    smart::motor::BrakeMode as VexBrakeMode,
    task::spawn as vex_spawn,
    time::{sleep, user_uptime},
};

use super::{
    AngleSensor, BrakeMode, Clock, DeviceError, DigitalOut, HeadingSensor, MotorGroup,
    OpticalSensor,
};
use crate::opcontrol::controller::ButtonInput;

fn port_error<E: Display>(e: E) -> DeviceError { DeviceError::Port(e.to_string()) }

impl From<BrakeMode> for VexBrakeMode {
    fn from(mode: BrakeMode) -> Self {
        match mode {
            BrakeMode::Coast => VexBrakeMode::Coast,
            BrakeMode::Brake => VexBrakeMode::Brake,
            BrakeMode::Hold => VexBrakeMode::Hold,
        }
    }
}

impl From<ButtonState> for ButtonInput {
    fn from(state: ButtonState) -> Self { ButtonInput::new(state.is_pressed(), state.is_now_pressed()) }
}

/// The vexide executor clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct VexClock;

impl Clock for VexClock {
    fn uptime(&self) -> Duration { user_uptime() }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> { sleep(duration) }
}

/// Spawns a background loop on the vexide executor and detaches it.
pub fn spawn<F: Future<Output = ()> + 'static>(future: F) { vex_spawn(future).detach(); }

/// Smart motors that are always commanded together.
pub struct VexMotors {
    motors:     Vec<Motor>,
    brake_mode: BrakeMode,
}

impl VexMotors {
    pub fn new(motors: Vec<Motor>) -> Self {
        VexMotors {
            motors,
            brake_mode: BrakeMode::default(),
        }
    }

    fn each(&mut self, mut f: impl FnMut(&mut Motor) -> Result<(), DeviceError>) -> Result<(), DeviceError> {
        let mut result = Ok(());
        for motor in self.motors.iter_mut() {
            if let Err(e) = f(motor) {
                result = Err(e);
            }
        }
        result
    }

    /// Average of a reading over every motor that can be read.
    fn average(&self, read: impl Fn(&Motor) -> Result<f64, DeviceError>) -> Result<f64, DeviceError> {
        let mut sum = 0.0;
        let mut count = 0;
        let mut last_error = DeviceError::Disconnected;
        for motor in self.motors.iter() {
            match read(motor) {
                Ok(v) => {
                    sum += v;
                    count += 1;
                }
                Err(e) => last_error = e,
            }
        }
        if count == 0 { Err(last_error) } else { Ok(sum / count as f64) }
    }
}

impl MotorGroup for VexMotors {
    fn set_power(&mut self, power: f64) -> Result<(), DeviceError> {
        let volts = power.clamp(-127.0, 127.0) / 127.0 * Motor::V5_MAX_VOLTAGE;
        self.each(|m| m.set_voltage(volts).map_err(port_error))
    }

    fn set_velocity(&mut self, rpm: f64) -> Result<(), DeviceError> {
        self.each(|m| m.set_velocity(rpm.round() as i32).map_err(port_error))
    }

    fn brake(&mut self) -> Result<(), DeviceError> {
        let mode = self.brake_mode.into();
        self.each(|m| m.brake(mode).map_err(port_error))
    }

    fn set_brake_mode(&mut self, mode: BrakeMode) -> Result<(), DeviceError> {
        self.brake_mode = mode;
        Ok(())
    }

    fn position(&self) -> Result<f64, DeviceError> {
        self.average(|m| {
            m.position()
                .map(|angle: Angle| angle.as_turns())
                .map_err(port_error)
        })
    }

    fn reset_position(&mut self) -> Result<(), DeviceError> { self.each(|m| m.reset_position().map_err(port_error)) }

    fn torque(&self) -> Result<f64, DeviceError> {
        let mut max: Option<f64> = None;
        for motor in self.motors.iter() {
            let torque = motor.torque().map_err(port_error)?;
            max = Some(max.map_or(torque, |m| m.max(torque)));
        }
        max.ok_or(DeviceError::Disconnected)
    }

    fn current(&self) -> Result<f64, DeviceError> {
        let mut total = 0.0;
        for motor in self.motors.iter() {
            total += motor.current().map_err(port_error)? * 1000.0;
        }
        Ok(total)
    }

    fn velocity(&self) -> Result<f64, DeviceError> { self.average(|m| m.velocity().map_err(port_error)) }
}

impl OpticalSensor for VexOptical {
    fn hue(&self) -> Result<f64, DeviceError> { VexOptical::hue(self).map_err(port_error) }

    fn proximity(&self) -> Result<u8, DeviceError> {
        let p = VexOptical::proximity(self).map_err(port_error)?;
        if !(0.0..=1.0).contains(&p) {
            return Err(DeviceError::OutOfRange(p));
        }
        Ok((p * 255.0).round() as u8)
    }

    fn set_led_brightness(&mut self, brightness: f64) -> Result<(), DeviceError> {
        VexOptical::set_led_brightness(self, brightness.clamp(0.0, 1.0)).map_err(port_error)
    }
}

impl AngleSensor for RotationSensor {
    fn angle(&self) -> Result<i32, DeviceError> {
        let angle = RotationSensor::angle(self).map_err(port_error)?;
        Ok((angle.as_degrees() * 100.0).round() as i32)
    }

    fn reset_position(&mut self) -> Result<(), DeviceError> {
        RotationSensor::reset_position(self).map_err(port_error)
    }
}

impl HeadingSensor for InertialSensor {
    fn heading(&self) -> Result<f64, DeviceError> {
        let heading = InertialSensor::heading(self).map_err(port_error)?;
        Ok(heading.as_degrees().rem_euclid(360.0))
    }
}

impl DigitalOut for AdiDigitalOut {
    fn set_level(&mut self, high: bool) -> Result<(), DeviceError> {
        if high {
            self.set_high().map_err(port_error)
        } else {
            self.set_low().map_err(port_error)
        }
    }
}
