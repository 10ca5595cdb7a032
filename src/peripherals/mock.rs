//! Scripted device doubles and a simulated clock for unit tests.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    future::Future,
    rc::Rc,
    time::Duration,
};

use embassy_futures::yield_now;

use super::{
    AngleSensor, BrakeMode, Clock, DeviceError, DigitalOut, HeadingSensor, MotorGroup,
    OpticalSensor,
};

/// A clock whose `sleep` advances virtual time and yields once, so loops
/// joined with `select` take turns.
#[derive(Default)]
pub struct SimClock {
    now: Cell<Duration>,
}

impl Clock for SimClock {
    fn uptime(&self) -> Duration { self.now.get() }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        self.now.set(self.now.get() + duration);
        yield_now()
    }
}

/// Values handed out one per read; the last value repeats once exhausted.
pub struct Script<T: Copy> {
    queue: RefCell<VecDeque<T>>,
    last:  Cell<T>,
}

impl<T: Copy> Script<T> {
    pub fn new(values: &[T], fallback: T) -> Self {
        Script {
            queue: RefCell::new(values.iter().copied().collect()),
            last:  Cell::new(fallback),
        }
    }

    pub fn next(&self) -> T {
        if let Some(v) = self.queue.borrow_mut().pop_front() {
            self.last.set(v);
        }
        self.last.get()
    }
}

/// Records every level written to it.
#[derive(Default)]
pub struct MockOut {
    pub log:  Rc<RefCell<Vec<bool>>>,
    pub fail: bool,
}

impl MockOut {
    pub fn failing() -> Self {
        MockOut {
            log:  Rc::default(),
            fail: true,
        }
    }
}

impl DigitalOut for MockOut {
    fn set_level(&mut self, high: bool) -> Result<(), DeviceError> {
        if self.fail {
            return Err(DeviceError::Disconnected);
        }
        self.log.borrow_mut().push(high);
        Ok(())
    }
}

/// A motor group whose position integrates the commanded power.
pub struct MockMotor {
    /// Rotations travelled per unit of power per command.
    pub gain:        f64,
    pub position:    f64,
    pub power:       f64,
    pub velocity:    f64,
    pub torque:      f64,
    pub current:     f64,
    pub brake_mode:  BrakeMode,
    pub brakes:      u32,
    pub commands:    Vec<f64>,
    /// Held against a hard stop: velocity commands are recorded but the
    /// measured velocity stays at zero.
    pub jammed:      bool,
    /// Torque reported while a nonzero velocity command is held. Drops back
    /// to `torque` once the motor brakes.
    pub load_torque: f64,
    driving_rpm:     f64,
}

impl Default for MockMotor {
    fn default() -> Self {
        MockMotor {
            gain:        0.0,
            position:    0.0,
            power:       0.0,
            velocity:    0.0,
            torque:      0.0,
            current:     0.0,
            brake_mode:  BrakeMode::Coast,
            brakes:      0,
            commands:    Vec::new(),
            jammed:      false,
            load_torque: 0.0,
            driving_rpm: 0.0,
        }
    }
}

impl MockMotor {
    pub fn with_gain(gain: f64) -> Self {
        MockMotor {
            gain,
            ..MockMotor::default()
        }
    }
}

impl MotorGroup for MockMotor {
    fn set_power(&mut self, power: f64) -> Result<(), DeviceError> {
        self.power = power;
        self.position += power * self.gain;
        self.commands.push(power);
        Ok(())
    }

    fn set_velocity(&mut self, rpm: f64) -> Result<(), DeviceError> {
        self.velocity = if self.jammed { 0.0 } else { rpm };
        self.driving_rpm = rpm;
        self.commands.push(rpm);
        Ok(())
    }

    fn brake(&mut self) -> Result<(), DeviceError> {
        self.power = 0.0;
        self.velocity = 0.0;
        self.driving_rpm = 0.0;
        self.brakes += 1;
        Ok(())
    }

    fn set_brake_mode(&mut self, mode: BrakeMode) -> Result<(), DeviceError> {
        self.brake_mode = mode;
        Ok(())
    }

    fn position(&self) -> Result<f64, DeviceError> { Ok(self.position) }

    fn reset_position(&mut self) -> Result<(), DeviceError> {
        self.position = 0.0;
        Ok(())
    }

    fn torque(&self) -> Result<f64, DeviceError> {
        if self.driving_rpm != 0.0 {
            Ok(self.torque.max(self.load_torque))
        } else {
            Ok(self.torque)
        }
    }

    fn current(&self) -> Result<f64, DeviceError> { Ok(self.current) }

    fn velocity(&self) -> Result<f64, DeviceError> { Ok(self.velocity) }
}

/// Optical sensor replaying scripted hue and proximity readings.
pub struct MockOptical {
    pub hues:        Script<f64>,
    pub proximities: Script<u8>,
    pub brightness:  f64,
}

impl MockOptical {
    pub fn new(hues: &[f64], proximities: &[u8]) -> Self {
        MockOptical {
            hues:        Script::new(hues, 120.0),
            proximities: Script::new(proximities, 0),
            brightness:  0.0,
        }
    }

    /// Replays goal distances (`255 - proximity`).
    pub fn from_distances(distances: &[u8]) -> Self {
        let raw: Vec<u8> = distances.iter().map(|d| 255 - d).collect();
        MockOptical::new(&[], &raw)
    }
}

impl OpticalSensor for MockOptical {
    fn hue(&self) -> Result<f64, DeviceError> { Ok(self.hues.next()) }

    fn proximity(&self) -> Result<u8, DeviceError> { Ok(self.proximities.next()) }

    fn set_led_brightness(&mut self, brightness: f64) -> Result<(), DeviceError> {
        self.brightness = brightness;
        Ok(())
    }
}

/// Rotation sensor replaying scripted angles (in degrees).
pub struct MockRotation {
    pub angles: Script<f64>,
    pub resets: u32,
}

impl MockRotation {
    pub fn new(degrees: &[f64]) -> Self {
        MockRotation {
            angles: Script::new(degrees, 0.0),
            resets: 0,
        }
    }
}

impl AngleSensor for MockRotation {
    fn angle(&self) -> Result<i32, DeviceError> { Ok((self.angles.next() * 100.0).round() as i32) }

    fn reset_position(&mut self) -> Result<(), DeviceError> {
        self.resets += 1;
        Ok(())
    }
}

/// Inertial sensor replaying scripted headings.
pub struct MockImu {
    pub headings: Script<f64>,
}

impl MockImu {
    pub fn new(headings: &[f64]) -> Self {
        MockImu {
            headings: Script::new(headings, 0.0),
        }
    }
}

impl HeadingSensor for MockImu {
    fn heading(&self) -> Result<f64, DeviceError> { Ok(self.headings.next()) }
}
