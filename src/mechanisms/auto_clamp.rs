//! Automatic goal clamping.
//!
//! A goal is detected when the goal sensor's distance (`255 - proximity`) is at
//! most `max_distance`. While enabled and unclamped the background loop counts
//! consecutive detections; a miss resets the count and keeps the clamp
//! retracted, and `min_detections` detections in a row fire the clamp.
//!
//! For autonomous routines [`AutoClamp::wait_until_clamp`] does the same thing
//! as a bounded wait, also giving up once the drivetrain has travelled too far
//! without finding the goal.

use std::{cell::RefCell, rc::Rc, time::Duration};

use log::{info, warn};

use crate::{
    detect::debounce::{DetectionEvent, Debouncer, LOOPRATE, WaitOutcome, wait_until_or_abort},
    drivetrain::Differential,
    peripherals::{Clock, OpticalSensor, Shared, log_write, piston::Piston, read_or},
};

/// Tuning for the goal clamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoClampConfig {
    /// Furthest goal distance (`255 - proximity`) that counts as detected.
    pub max_distance:   u8,
    /// Consecutive detections before clamping.
    pub min_detections: u32,
}

impl Default for AutoClampConfig {
    fn default() -> Self {
        AutoClampConfig {
            max_distance:   10,
            min_detections: 3,
        }
    }
}

/// What one poll of the clamp loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClampEvent {
    Disabled,
    /// The clamp is already extended; nothing to do.
    Clamped,
    /// No goal; the clamp is retracted.
    Searching,
    /// Goal seen this many times in a row.
    Pending(u32),
    /// The clamp fired on this poll.
    Fired,
}

struct AutoClampState {
    enabled:   bool,
    debouncer: Debouncer,
}

/// The goal clamp controller.
///
/// # Example
///
/// ```ignore
/// let auto_clamp = AutoClamp::new(goal_sensor, clamp.clone(), drivetrain.clone(), AutoClampConfig::default());
/// auto_clamp.init();
///
/// // Driver control: clamp as soon as a goal is backed into.
/// auto_clamp.enable();
///
/// // Autonomous: back up slowly and wait for the goal.
/// drivetrain.set_power(-40.0, -40.0);
/// let clamped = auto_clamp.wait_until_clamp(&VexClock, 24.0, Duration::from_millis(1500)).await;
/// drivetrain.brake();
/// ```
#[derive(Clone)]
pub struct AutoClamp {
    pub sensor:     Rc<RefCell<dyn OpticalSensor>>,
    pub clamp:      Shared<Piston>,
    pub drivetrain: Differential,
    config:         AutoClampConfig,
    state:          Rc<RefCell<AutoClampState>>,
}

impl AutoClamp {
    pub fn new(
        sensor: Rc<RefCell<dyn OpticalSensor>>,
        clamp: Shared<Piston>,
        drivetrain: Differential,
        config: AutoClampConfig,
    ) -> Self {
        AutoClamp {
            sensor,
            clamp,
            drivetrain,
            config,
            state: Rc::new(RefCell::new(AutoClampState {
                enabled:   false,
                debouncer: Debouncer::new(config.min_detections),
            })),
        }
    }

    pub fn config(&self) -> &AutoClampConfig { &self.config }

    pub fn enable(&self) {
        let mut state = self.state.borrow_mut();
        if !state.enabled {
            state.enabled = true;
            state.debouncer.reset();
            info!("Auto clamp enabled");
        }
    }

    pub fn disable(&self) {
        let mut state = self.state.borrow_mut();
        if state.enabled {
            state.enabled = false;
            info!("Auto clamp disabled");
        }
    }

    pub fn is_enabled(&self) -> bool { self.state.borrow().enabled }

    /// Goal distance, `255 - proximity`. `None` when the sensor cannot be read.
    pub fn distance(&self) -> Option<u8> {
        match self.sensor.borrow().proximity() {
            Ok(raw) => Some(255 - raw),
            Err(e) => {
                warn!("Goal Sensor Read Error: {}", e);
                None
            }
        }
    }

    /// Whether a goal is within `max_distance` right now.
    pub fn is_detected(&self) -> bool {
        self.distance()
            .is_some_and(|d| d <= self.config.max_distance)
    }

    /// Whether a goal is in range and the clamp is extended.
    pub fn is_goal_clamped(&self) -> bool { self.is_detected() && self.clamp.borrow().is_extended() }

    /// Runs one poll of the clamp loop.
    pub fn step(&self) -> ClampEvent {
        let mut state = self.state.borrow_mut();
        if !state.enabled {
            return ClampEvent::Disabled;
        }
        if self.clamp.borrow().is_extended() {
            return ClampEvent::Clamped;
        }

        match state.debouncer.poll(self.is_detected()) {
            DetectionEvent::Miss => {
                self.clamp.borrow_mut().retract();
                ClampEvent::Searching
            }
            DetectionEvent::Pending(n) => ClampEvent::Pending(n),
            DetectionEvent::Detected | DetectionEvent::Holding => {
                self.clamp.borrow_mut().extend();
                state.debouncer.reset();
                info!("Goal detected, clamping");
                ClampEvent::Fired
            }
        }
    }

    /// The clamp loop. Polls every [`LOOPRATE`] forever.
    pub async fn run<C: Clock>(&self, clock: &C) {
        info!("Auto Clamp Loop Started");
        loop {
            self.step();
            clock.sleep(LOOPRATE).await;
        }
    }

    /// Retracts the clamp and waits for a goal, clamping it on success.
    ///
    /// The left drive encoders are zeroed first; the wait gives up once they
    /// report more than `max_distance` inches of travel in either direction, or
    /// after `timeout`. The caller is responsible for moving the robot. Returns
    /// whether the clamp fired.
    pub async fn wait_until_clamp<C: Clock>(
        &self,
        clock: &C,
        max_distance: f64,
        timeout: Duration,
    ) -> bool {
        self.clamp.borrow_mut().retract();
        log_write(
            self.drivetrain.left.borrow_mut().reset_position(),
            "Left Drive",
        );
        let max_rotations = self
            .drivetrain
            .config
            .inches_to_rotations(max_distance.abs());

        let mut debouncer = Debouncer::new(self.config.min_detections);
        let outcome = wait_until_or_abort(
            clock,
            &mut debouncer,
            timeout,
            LOOPRATE,
            || self.is_detected(),
            || {
                let travelled = read_or(self.drivetrain.left.borrow().position(), "Left Drive", 0.0);
                travelled.abs() >= max_rotations
            },
        )
        .await;

        match outcome {
            WaitOutcome::Detected => {
                self.clamp.borrow_mut().extend();
                info!("Goal clamped");
                true
            }
            WaitOutcome::TimedOut => {
                warn!("No goal found before timeout");
                false
            }
            WaitOutcome::Aborted => {
                warn!("No goal found within {:.1} in", max_distance);
                false
            }
        }
    }
}

#[cfg(target_os = "vexos")]
impl AutoClamp {
    /// Spawns the clamp loop on the vexide executor.
    pub fn init(&self) {
        let auto_clamp = self.clone();
        crate::peripherals::vex::spawn(async move {
            auto_clamp.run(&crate::peripherals::vex::VexClock).await;
        });
    }
}
