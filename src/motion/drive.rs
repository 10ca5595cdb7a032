//! Distance and heading moves for the differential drivetrain.
//!
//! # Distance moves
//!
//! A distance move runs `IDLE -> MOVING -> SETTLING -> DONE` (or `TIMEDOUT`).
//! Every poll reads the averaged drive encoders, feeds the remaining distance
//! to a PID and commands both sides with the clamped output. The move is done
//! once the error has stayed inside the goal threshold for a number of
//! consecutive polls that grows with the distance, bounded to `[1, 5]`.
//!
//! When a clamp trigger distance is set the clamp piston fires once as soon as
//! the remaining distance drops below it, independently of the settling logic.
//!
//! # Heading moves
//!
//! A heading move turns in place using the inertial sensor. The error is
//! normalised into `[-180, 180)` so the robot always takes the short way round.

use std::{cell::RefCell, rc::Rc, time::Duration};

use log::{debug, info, warn};

use super::pid::{PIDController, PidGains};
use crate::{
    detect::debounce::LOOPRATE,
    drivetrain::{Differential, DrivetrainConfig},
    peripherals::{Clock, HeadingSensor, Shared, piston::Piston, read_or},
};

/// Distance in inches that adds one required settle poll per poll-interval ms.
const SETTLE_SCALE_INCHES: f64 = 5.0;
/// Upper bound on the settle polls of a distance move.
const MAX_SETTLE_POLLS: u32 = 5;
/// Heading error, in degrees, that counts as on target.
pub const HEADING_THRESHOLD: f64 = 1.5;
/// Consecutive on-target polls that finish a heading move.
pub const HEADING_SETTLE_POLLS: u32 = 2;

/// Where a move is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Idle,
    Moving,
    /// Inside the goal threshold for this many consecutive polls.
    Settling(u32),
    Done,
    TimedOut,
}

impl MotionState {
    pub fn is_finished(self) -> bool { matches!(self, MotionState::Done | MotionState::TimedOut) }
}

/// How a move ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionOutcome {
    Done,
    TimedOut,
}

/// Parameters of a distance move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveParams {
    /// Signed distance in inches.
    pub distance:       f64,
    pub timeout:        Duration,
    pub gains:          PidGains,
    /// Error in inches that counts as on target.
    pub goal_threshold: f64,
    /// Fire the clamp once the remaining distance drops below this many inches.
    pub clamp_distance: Option<f64>,
}

impl DriveParams {
    pub fn new(distance: f64, timeout: Duration, gains: PidGains, goal_threshold: f64) -> Self {
        DriveParams {
            distance,
            timeout,
            gains,
            goal_threshold,
            clamp_distance: None,
        }
    }

    /// Fires the clamp when the remaining distance drops below `distance` inches.
    pub fn with_clamp(mut self, distance: f64) -> Self {
        self.clamp_distance = Some(distance);
        self
    }
}

/// Output of one poll of a move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionStep {
    /// Power to command, already clamped.
    pub output:     f64,
    /// Whether the clamp should fire on this poll.
    pub fire_clamp: bool,
    pub state:      MotionState,
}

/// Number of consecutive in-threshold polls a move of `distance` inches needs.
pub fn required_settle_polls(distance: f64, poll_interval: Duration) -> u32 {
    let polls = (distance.abs() / SETTLE_SCALE_INCHES) * poll_interval.as_millis() as f64;
    (polls.ceil() as u32).clamp(1, MAX_SETTLE_POLLS)
}

/// Normalises an angle difference into `[-180, 180)`.
pub fn wrap_degrees(angle: f64) -> f64 { (angle + 180.0).rem_euclid(360.0) - 180.0 }

/// The per-poll state machine of a distance move, in encoder rotations.
#[derive(Debug, Clone)]
pub struct DistanceMotion {
    target:        f64,
    threshold:     f64,
    clamp_trigger: Option<f64>,
    required:      u32,
    in_goal:       u32,
    clamp_fired:   bool,
    timeout:       Duration,
    pid:           PIDController,
    state:         MotionState,
}

impl DistanceMotion {
    pub fn new(params: &DriveParams, config: &DrivetrainConfig) -> Self {
        DistanceMotion {
            target:        config.inches_to_rotations(params.distance),
            threshold:     config.inches_to_rotations(params.goal_threshold.abs()),
            clamp_trigger: params
                .clamp_distance
                .map(|d| config.inches_to_rotations(d.abs())),
            required:      required_settle_polls(params.distance, LOOPRATE),
            in_goal:       0,
            clamp_fired:   false,
            timeout:       params.timeout,
            pid:           PIDController::new(params.gains),
            state:         MotionState::Idle,
        }
    }

    pub fn state(&self) -> MotionState { self.state }

    pub fn required_polls(&self) -> u32 { self.required }

    pub fn clamp_fired(&self) -> bool { self.clamp_fired }

    /// Advances one poll given the current encoder `position` (rotations) and
    /// the time since the move started.
    pub fn step(&mut self, position: f64, elapsed: Duration) -> MotionStep {
        if self.state.is_finished() {
            return self.idle_step();
        }
        if elapsed >= self.timeout {
            self.state = MotionState::TimedOut;
            self.pid.reset();
            return self.idle_step();
        }

        let error = self.target - position;
        let output = self.pid.update(error);

        if error.abs() < self.threshold {
            self.in_goal += 1;
        } else {
            self.in_goal = 0;
        }

        let fire_clamp = match self.clamp_trigger {
            Some(trigger) => !self.clamp_fired && error.abs() < trigger,
            None => false,
        };
        if fire_clamp {
            self.clamp_fired = true;
        }

        self.state = if self.in_goal >= self.required {
            self.pid.reset();
            MotionState::Done
        } else if self.in_goal > 0 {
            MotionState::Settling(self.in_goal)
        } else {
            MotionState::Moving
        };

        MotionStep {
            output,
            fire_clamp,
            state: self.state,
        }
    }

    fn idle_step(&self) -> MotionStep {
        MotionStep {
            output:     0.0,
            fire_clamp: false,
            state:      self.state,
        }
    }
}

/// The per-poll state machine of a turn to an absolute heading.
#[derive(Debug, Clone)]
pub struct HeadingMotion {
    target:  f64,
    in_goal: u32,
    timeout: Duration,
    pid:     PIDController,
    state:   MotionState,
}

impl HeadingMotion {
    pub fn new(target: f64, timeout: Duration, gains: PidGains) -> Self {
        HeadingMotion {
            target: target.rem_euclid(360.0),
            in_goal: 0,
            timeout,
            pid: PIDController::new(gains),
            state: MotionState::Idle,
        }
    }

    pub fn state(&self) -> MotionState { self.state }

    /// Advances one poll given the current `heading` in degrees. The returned
    /// output is applied positively to the left side and negatively to the
    /// right side.
    pub fn step(&mut self, heading: f64, elapsed: Duration) -> MotionStep {
        if !self.state.is_finished() && elapsed >= self.timeout {
            self.state = MotionState::TimedOut;
            self.pid.reset();
        }
        if self.state.is_finished() {
            return MotionStep {
                output:     0.0,
                fire_clamp: false,
                state:      self.state,
            };
        }

        let error = wrap_degrees(self.target - heading);
        let output = self.pid.update(error);

        if error.abs() < HEADING_THRESHOLD {
            self.in_goal += 1;
        } else {
            self.in_goal = 0;
        }
        self.state = if self.in_goal >= HEADING_SETTLE_POLLS {
            self.pid.reset();
            MotionState::Done
        } else if self.in_goal > 0 {
            MotionState::Settling(self.in_goal)
        } else {
            MotionState::Moving
        };

        MotionStep {
            output,
            fire_clamp: false,
            state: self.state,
        }
    }
}

/// Drives the robot by distance or to a heading using PID.
///
/// # Example
///
/// ```ignore
/// let drive = LinearMotionController::new(drivetrain)
///     .with_clamp(clamp.clone())
///     .with_imu(imu.clone());
///
/// let gains = PidGains::new(20.0, 0.0, 4.0);
/// drive
///     .drive_distance(&clock, DriveParams::new(24.0, Duration::from_secs(2), gains, 0.5))
///     .await;
/// drive.turn_to_heading(&clock, 90.0, Duration::from_secs(1), PidGains::new(2.0, 0.0, 10.0)).await;
/// ```
#[derive(Clone)]
pub struct LinearMotionController {
    pub drivetrain: Differential,
    pub clamp:      Option<Shared<Piston>>,
    pub imu:        Option<Rc<RefCell<dyn HeadingSensor>>>,
}

impl LinearMotionController {
    pub fn new(drivetrain: Differential) -> Self {
        LinearMotionController {
            drivetrain,
            clamp: None,
            imu: None,
        }
    }

    /// Attaches the clamp piston fired by clamping moves.
    pub fn with_clamp(mut self, clamp: Shared<Piston>) -> Self {
        self.clamp = Some(clamp);
        self
    }

    /// Attaches the heading source used by turns.
    pub fn with_imu(mut self, imu: Rc<RefCell<dyn HeadingSensor>>) -> Self {
        self.imu = Some(imu);
        self
    }

    /// Drives a signed distance in inches. Always brakes on exit.
    pub async fn drive_distance<C: Clock>(&self, clock: &C, params: DriveParams) -> MotionOutcome {
        if params.clamp_distance.is_some() && self.clamp.is_none() {
            warn!("Clamping drive requested without a clamp attached");
        }
        let mut motion = DistanceMotion::new(&params, &self.drivetrain.config);
        info!(
            "Drive {:.2} in (settle polls: {})",
            params.distance,
            motion.required_polls()
        );

        self.drivetrain.reset_position();
        let start = clock.uptime();
        let outcome = loop {
            let position = self.drivetrain.position();
            let step = motion.step(position, clock.uptime().saturating_sub(start));
            if step.state == MotionState::TimedOut {
                break MotionOutcome::TimedOut;
            }
            self.drivetrain.set_power(step.output, step.output);
            if step.fire_clamp {
                self.fire_clamp();
            }
            if step.state == MotionState::Done {
                break MotionOutcome::Done;
            }
            clock.sleep(LOOPRATE).await;
        };
        self.drivetrain.brake();
        info!("Drive finished: {:?}", outcome);
        outcome
    }

    /// Drives a signed distance and fires the clamp `clamp_distance` inches
    /// before the target.
    pub async fn drive_distance_clamp<C: Clock>(
        &self,
        clock: &C,
        params: DriveParams,
        clamp_distance: f64,
    ) -> MotionOutcome {
        self.drive_distance(clock, params.with_clamp(clamp_distance))
            .await
    }

    /// Turns in place to an absolute heading in degrees. Always brakes on exit.
    ///
    /// Without an inertial sensor attached the turn is skipped and reported
    /// as timed out.
    pub async fn turn_to_heading<C: Clock>(
        &self,
        clock: &C,
        heading: f64,
        timeout: Duration,
        gains: PidGains,
    ) -> MotionOutcome {
        let Some(imu) = self.imu.as_ref() else {
            warn!("Turn requested without an inertial sensor attached");
            return MotionOutcome::TimedOut;
        };
        let mut motion = HeadingMotion::new(heading, timeout, gains);
        info!("Turn to {:.1} deg", heading);

        let start = clock.uptime();
        let outcome = loop {
            let current = read_or(imu.borrow().heading(), "IMU Heading", heading);
            let step = motion.step(current, clock.uptime().saturating_sub(start));
            if step.state == MotionState::TimedOut {
                break MotionOutcome::TimedOut;
            }
            self.drivetrain.set_power(step.output, -step.output);
            if step.state == MotionState::Done {
                break MotionOutcome::Done;
            }
            clock.sleep(LOOPRATE).await;
        };
        self.drivetrain.brake();
        info!("Turn finished: {:?}", outcome);
        outcome
    }

    fn fire_clamp(&self) {
        if let Some(clamp) = &self.clamp {
            debug!("Clamp fired during drive");
            clamp.borrow_mut().extend();
        }
    }
}
