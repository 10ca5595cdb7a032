//! Overclock arm position control.
//!
//! The overclock is a single rotating arm read by an absolute rotation sensor.
//! Each [`MechanismPosition`] chooses how the arm gets there:
//!
//! - **PID**: velocity from a PID on `target - angle`, clamped to the
//!   configured limit. Done once `|error|` drops under the goal threshold.
//! - **Open loop**: a fixed velocity in the required direction. A clockwise
//!   approach is done once the arm has passed the target (`error < 0`), a
//!   counterclockwise one once `error > 0`, and a direction-agnostic one once
//!   `|error|` drops under the goal threshold.
//!
//! A torque reading over `max_torque` counts as arrival whatever the mode.
//! The arrival condition has to hold for `settle_polls` consecutive polls
//! before the arm brakes and the controller disables itself.
//!
//! Positive motor output is expected to increase the sensor angle and
//! clockwise means increasing angle. Reverse the motors if the arm is built
//! the other way round.

use std::{cell::RefCell, fmt, rc::Rc, time::Duration};

use log::{debug, info, warn};

use crate::{
    detect::debounce::{DetectionEvent, Debouncer, LOOPRATE},
    motion::pid::{PIDController, PidGains},
    peripherals::{AngleSensor, BrakeMode, Clock, DeviceError, MotorGroup, log_write, read_or},
};

/// Required approach direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards increasing angle.
    Clockwise,
    /// Towards decreasing angle.
    Counterclockwise,
    /// Whichever way is shorter.
    Either,
}

/// A named arm target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MechanismPosition {
    pub name:       &'static str,
    /// Target angle in degrees.
    pub angle:      f64,
    pub direction:  Direction,
    pub uses_pid:   bool,
    /// Brake mode applied on arrival.
    pub brake_mode: BrakeMode,
}

impl MechanismPosition {
    pub const HIGH: MechanismPosition =
        MechanismPosition::new("high", 101.0, Direction::Counterclockwise, false, BrakeMode::Hold);
    pub const LOW: MechanismPosition =
        MechanismPosition::new("low", 333.0, Direction::Clockwise, true, BrakeMode::Coast);
    pub const TOP: MechanismPosition =
        MechanismPosition::new("top", 200.0, Direction::Either, true, BrakeMode::Hold);
    pub const MID: MechanismPosition =
        MechanismPosition::new("mid", 247.0, Direction::Counterclockwise, true, BrakeMode::Hold);

    pub const fn new(
        name: &'static str,
        angle: f64,
        direction: Direction,
        uses_pid: bool,
        brake_mode: BrakeMode,
    ) -> Self {
        MechanismPosition {
            name,
            angle,
            direction,
            uses_pid,
            brake_mode,
        }
    }

    /// Signed distance from `angle` to this position, in degrees.
    pub fn error_from(&self, angle: f64) -> f64 { self.angle - angle }
}

impl fmt::Display for MechanismPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.0} deg)", self.name, self.angle)
    }
}

/// Tuning for the overclock arm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverclockConfig {
    /// Error in degrees that counts as arrived.
    pub goal_threshold:     f64,
    /// Torque in Nm above which the arm is treated as stalled (arrived).
    pub max_torque:         f64,
    /// Consecutive arrived polls before the arm stops.
    pub settle_polls:       u32,
    pub gains:              PidGains,
    /// Velocity bound of the PID output, in rpm.
    pub pid_limit:          f64,
    /// Velocity of open-loop moves, in rpm.
    pub open_loop_velocity: f64,
    /// Velocity used to find the hard stop while homing, in rpm.
    pub homing_velocity:    f64,
    /// Current draw in mA that, together with a near-zero velocity, means the
    /// arm has reached its hard stop.
    pub stall_current:      f64,
    pub stall_velocity:     f64,
}

impl Default for OverclockConfig {
    fn default() -> Self {
        OverclockConfig {
            goal_threshold:     3.0,
            max_torque:         1.0,
            settle_polls:       3,
            gains:              PidGains::new(0.7, 0.0, 0.4),
            pid_limit:          200.0,
            open_loop_velocity: 40.0,
            homing_velocity:    -50.0,
            stall_current:      1500.0,
            stall_velocity:     5.0,
        }
    }
}

/// What one poll of the control loop did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverclockEvent {
    /// The controller is disabled.
    Idle,
    /// Commanded this velocity (rpm).
    Moving(f64),
    /// Arrival condition held for this many consecutive polls.
    Settling(u32),
    /// Arrived; the arm is braked and the controller disabled (or chained to
    /// the low position).
    Arrived,
    /// The angle could not be read; the arm was stopped for this poll.
    NoReading,
}

/// Snapshot for telemetry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverclockStatus {
    pub target:     Option<MechanismPosition>,
    pub active:     bool,
    pub error:      f64,
    pub goal_count: u32,
}

struct OverclockState {
    target:                Option<MechanismPosition>,
    active:                bool,
    arrival:               Debouncer,
    error:                 f64,
    return_low_after_move: bool,
    pid:                   PIDController,
}

/// The overclock arm controller.
///
/// # Example
///
/// ```ignore
/// let overclock = Overclock::new(arm, rotation, OverclockConfig::default());
/// overclock.init();
///
/// overclock.set_target(Some(MechanismPosition::MID));
/// if !overclock.wait_until_done(&VexClock, Duration::from_millis(1000)).await {
///     overclock.disable();
/// }
/// ```
#[derive(Clone)]
pub struct Overclock {
    pub motor:  Rc<RefCell<dyn MotorGroup>>,
    pub sensor: Rc<RefCell<dyn AngleSensor>>,
    config:     OverclockConfig,
    state:      Rc<RefCell<OverclockState>>,
}

impl Overclock {
    pub fn new<M: MotorGroup + 'static, S: AngleSensor + 'static>(
        motor: M,
        sensor: S,
        config: OverclockConfig,
    ) -> Self {
        Self::from_shared(
            Rc::new(RefCell::new(motor)),
            Rc::new(RefCell::new(sensor)),
            config,
        )
    }

    pub fn from_shared(
        motor: Rc<RefCell<dyn MotorGroup>>,
        sensor: Rc<RefCell<dyn AngleSensor>>,
        config: OverclockConfig,
    ) -> Self {
        let pid = PIDController::new(config.gains).with_output_limit(config.pid_limit);
        Overclock {
            motor,
            sensor,
            config,
            state: Rc::new(RefCell::new(OverclockState {
                target: None,
                active: false,
                arrival: Debouncer::new(config.settle_polls),
                error: 0.0,
                return_low_after_move: false,
                pid,
            })),
        }
    }

    pub fn config(&self) -> &OverclockConfig { &self.config }

    /// Starts moving towards the current target.
    ///
    /// Does nothing without a target.
    pub fn enable(&self) {
        let mut state = self.state.borrow_mut();
        let Some(target) = state.target else {
            warn!("Overclock enabled without a target");
            return;
        };
        if !state.active {
            self.activate(&mut state, target);
        }
    }

    /// Stops the arm immediately.
    pub fn disable(&self) {
        let mut state = self.state.borrow_mut();
        if state.active {
            self.stop(&mut state);
            info!("Overclock disabled");
        }
    }

    pub fn is_active(&self) -> bool { self.state.borrow().active }

    /// Sets a new target and activates the controller. `None` disables it.
    pub fn set_target(&self, target: Option<MechanismPosition>) {
        let Some(target) = target else {
            self.disable();
            return;
        };
        let mut state = self.state.borrow_mut();
        state.target = Some(target);
        self.activate(&mut state, target);
    }

    pub fn target(&self) -> Option<MechanismPosition> { self.state.borrow().target }

    /// After every completed move (other than to the low position itself),
    /// head back to [`MechanismPosition::LOW`].
    pub fn set_return_low_after_move(&self, enabled: bool) {
        self.state.borrow_mut().return_low_after_move = enabled;
    }

    /// Current arm angle in degrees.
    pub fn current_angle(&self) -> Result<f64, DeviceError> {
        Ok(self.sensor.borrow().angle()? as f64 / 100.0)
    }

    /// Whether `error` satisfies the arrival condition of the current target.
    pub fn is_goal_met(&self, error: f64) -> bool {
        match self.state.borrow().target {
            Some(target) => self.goal_met(&target, error),
            None => false,
        }
    }

    pub fn status(&self) -> OverclockStatus {
        let state = self.state.borrow();
        OverclockStatus {
            target:     state.target,
            active:     state.active,
            error:      state.error,
            goal_count: state.arrival.count(),
        }
    }

    /// Runs one poll of the control loop.
    pub fn step(&self) -> OverclockEvent {
        let mut state = self.state.borrow_mut();
        if !state.active {
            return OverclockEvent::Idle;
        }
        let Some(target) = state.target else {
            state.active = false;
            return OverclockEvent::Idle;
        };

        let angle = match self.current_angle() {
            Ok(angle) => angle,
            Err(e) => {
                warn!("Overclock Angle Read Error: {}", e);
                log_write(self.motor.borrow_mut().brake(), "Overclock");
                return OverclockEvent::NoReading;
            }
        };
        let error = target.error_from(angle);
        state.error = error;

        let torque = read_or(self.motor.borrow().torque(), "Overclock Torque", 0.0);
        let stalled = torque > self.config.max_torque;
        if stalled {
            debug!("Overclock stall: {:.2} Nm", torque);
        }
        match state.arrival.poll(stalled || self.goal_met(&target, error)) {
            DetectionEvent::Miss => {}
            DetectionEvent::Pending(n) => return OverclockEvent::Settling(n),
            DetectionEvent::Detected | DetectionEvent::Holding => {
                self.stop(&mut state);
                info!("Overclock reached {} (error {:.1})", target, error);
                if state.return_low_after_move && target != MechanismPosition::LOW {
                    state.target = Some(MechanismPosition::LOW);
                    self.activate(&mut state, MechanismPosition::LOW);
                }
                return OverclockEvent::Arrived;
            }
        }

        let velocity = if target.uses_pid {
            state.pid.update(error)
        } else {
            let v = self.config.open_loop_velocity.abs();
            match target.direction {
                Direction::Clockwise => v,
                Direction::Counterclockwise => -v,
                Direction::Either => v.copysign(error),
            }
        };
        log_write(self.motor.borrow_mut().set_velocity(velocity), "Overclock");
        OverclockEvent::Moving(velocity)
    }

    /// The control loop. Polls every [`LOOPRATE`] forever.
    pub async fn run<C: Clock>(&self, clock: &C) {
        info!("Overclock Control Loop Started");
        loop {
            self.step();
            clock.sleep(LOOPRATE).await;
        }
    }

    /// Waits until the controller disables itself. Returns `false` on timeout.
    pub async fn wait_until_done<C: Clock>(&self, clock: &C, timeout: Duration) -> bool {
        let start = clock.uptime();
        loop {
            if !self.is_active() {
                return true;
            }
            if clock.uptime().saturating_sub(start) >= timeout {
                return false;
            }
            clock.sleep(LOOPRATE).await;
        }
    }

    /// Drives the arm into its hard stop and zeroes the rotation sensor there.
    ///
    /// The hard stop is found by stall: current draw above `stall_current`
    /// while moving slower than `stall_velocity`. Returns `false` on timeout.
    /// The controller is disabled first.
    pub async fn home<C: Clock>(&self, clock: &C, timeout: Duration) -> bool {
        self.disable();
        {
            let mut motor = self.motor.borrow_mut();
            log_write(motor.set_brake_mode(BrakeMode::Hold), "Overclock");
            log_write(motor.set_velocity(self.config.homing_velocity), "Overclock");
        }
        info!("Overclock homing");

        let start = clock.uptime();
        loop {
            if clock.uptime().saturating_sub(start) >= timeout {
                log_write(self.motor.borrow_mut().brake(), "Overclock");
                warn!("Overclock homing timed out");
                return false;
            }
            let (current, velocity) = {
                let motor = self.motor.borrow();
                (
                    read_or(motor.current(), "Overclock Current", 0.0),
                    read_or(motor.velocity(), "Overclock Velocity", f64::INFINITY),
                )
            };
            if current > self.config.stall_current && velocity.abs() < self.config.stall_velocity {
                log_write(self.motor.borrow_mut().brake(), "Overclock");
                log_write(self.sensor.borrow_mut().reset_position(), "Overclock Rotation");
                info!("Overclock homed");
                return true;
            }
            clock.sleep(LOOPRATE).await;
        }
    }

    fn goal_met(&self, target: &MechanismPosition, error: f64) -> bool {
        let within = error.abs() < self.config.goal_threshold;
        if target.uses_pid {
            return within;
        }
        match target.direction {
            Direction::Clockwise => error < 0.0,
            Direction::Counterclockwise => error > 0.0,
            Direction::Either => within,
        }
    }

    fn activate(&self, state: &mut OverclockState, target: MechanismPosition) {
        state.active = true;
        state.arrival.reset();
        state.pid.reset();
        log_write(
            self.motor.borrow_mut().set_brake_mode(target.brake_mode),
            "Overclock",
        );
        info!("Overclock moving to {}", target);
    }

    fn stop(&self, state: &mut OverclockState) {
        state.active = false;
        state.arrival.reset();
        state.pid.reset();
        let mut motor = self.motor.borrow_mut();
        if let Some(target) = state.target {
            log_write(motor.set_brake_mode(target.brake_mode), "Overclock");
        }
        log_write(motor.brake(), "Overclock");
    }
}

#[cfg(target_os = "vexos")]
impl Overclock {
    /// Spawns the control loop on the vexide executor.
    pub fn init(&self) {
        let overclock = self.clone();
        crate::peripherals::vex::spawn(async move {
            overclock.run(&crate::peripherals::vex::VexClock).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc, time::Duration};

    use embassy_futures::{block_on, select::{Either, select}};

    use super::*;
    use crate::peripherals::mock::{MockMotor, MockRotation, SimClock};

    fn arm(angles: &[f64]) -> (Overclock, Rc<RefCell<MockMotor>>, Rc<RefCell<MockRotation>>) {
        let motor = Rc::new(RefCell::new(MockMotor::default()));
        let sensor = Rc::new(RefCell::new(MockRotation::new(angles)));
        let oc = Overclock::from_shared(motor.clone(), sensor.clone(), OverclockConfig::default());
        (oc, motor, sensor)
    }

    #[test]
    fn open_loop_clockwise_stops_once_past_target() {
        let target = MechanismPosition::new("test", 100.0, Direction::Clockwise, false, BrakeMode::Hold);
        let (oc, motor, _) = arm(&[90.0, 95.0, 99.9, 100.5, 101.0, 102.0]);
        oc.set_target(Some(target));

        assert_eq!(oc.step(), OverclockEvent::Moving(40.0));
        assert_eq!(oc.step(), OverclockEvent::Moving(40.0));
        // Within the threshold but not yet past the target.
        assert_eq!(oc.step(), OverclockEvent::Moving(40.0));

        assert_eq!(oc.step(), OverclockEvent::Settling(1));
        assert!(oc.is_goal_met(oc.status().error));
        assert_eq!(oc.step(), OverclockEvent::Settling(2));
        // The last command is held until arrival.
        assert_eq!(motor.borrow().brakes, 0);
        assert_eq!(oc.step(), OverclockEvent::Arrived);
        assert_eq!(motor.borrow().brakes, 1);
        assert!(!oc.is_active());
        assert_eq!(motor.borrow().brake_mode, BrakeMode::Hold);
        assert_eq!(oc.step(), OverclockEvent::Idle);
    }

    #[test]
    fn open_loop_counterclockwise_drives_negative() {
        let (oc, motor, _) = arm(&[150.0, 100.5]);
        oc.set_target(Some(MechanismPosition::HIGH));
        assert_eq!(oc.step(), OverclockEvent::Moving(-40.0));
        assert_eq!(oc.step(), OverclockEvent::Settling(1));
        assert_eq!(motor.borrow().commands, vec![-40.0]);
    }

    #[test]
    fn either_direction_follows_error_sign() {
        let target = MechanismPosition::new("test", 200.0, Direction::Either, false, BrakeMode::Hold);
        let (oc, _, _) = arm(&[210.0, 190.0, 201.0]);
        oc.set_target(Some(target));
        assert_eq!(oc.step(), OverclockEvent::Moving(-40.0));
        assert_eq!(oc.step(), OverclockEvent::Moving(40.0));
        assert_eq!(oc.step(), OverclockEvent::Settling(1));
    }

    #[test]
    fn pid_mode_settles_inside_threshold() {
        let (oc, motor, _) = arm(&[300.0, 320.0, 331.0, 332.0, 333.5]);
        oc.set_target(Some(MechanismPosition::LOW));

        match oc.step() {
            OverclockEvent::Moving(v) => assert!((v - 23.1).abs() < 1e-9),
            other => panic!("unexpected {:?}", other),
        }
        match oc.step() {
            // 0.7 * 13 + 0.4 * (13 - 33) / 20
            OverclockEvent::Moving(v) => assert!((v - 8.7).abs() < 1e-9),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(oc.step(), OverclockEvent::Settling(1));
        assert_eq!(oc.step(), OverclockEvent::Settling(2));
        assert_eq!(oc.step(), OverclockEvent::Arrived);
        assert_eq!(motor.borrow().brake_mode, BrakeMode::Coast);
        assert!(!oc.is_active());
    }

    #[test]
    fn pid_output_is_limited() {
        let (oc, _, _) = arm(&[0.0]);
        oc.set_target(Some(MechanismPosition::LOW));
        assert_eq!(oc.step(), OverclockEvent::Moving(200.0));
    }

    #[test]
    fn leaving_goal_resets_count() {
        let (oc, _, _) = arm(&[199.0, 198.5, 190.0, 199.5]);
        oc.set_target(Some(MechanismPosition::TOP));
        assert_eq!(oc.step(), OverclockEvent::Settling(1));
        assert_eq!(oc.step(), OverclockEvent::Settling(2));
        assert!(matches!(oc.step(), OverclockEvent::Moving(_)));
        assert_eq!(oc.step(), OverclockEvent::Settling(1));
    }

    #[test]
    fn stall_counts_as_arrival() {
        let (oc, motor, _) = arm(&[150.0]);
        {
            let mut m = motor.borrow_mut();
            m.jammed = true;
            m.load_torque = 2.0;
        }
        oc.set_target(Some(MechanismPosition::TOP));

        // Torque only builds up once the arm is pushing into the jam.
        assert!(matches!(oc.step(), OverclockEvent::Moving(_)));
        assert_eq!(oc.step(), OverclockEvent::Settling(1));
        assert_eq!(oc.step(), OverclockEvent::Settling(2));
        assert_eq!(oc.step(), OverclockEvent::Arrived);
        assert!(!oc.is_active());

        let m = motor.borrow();
        assert_eq!(m.commands.len(), 1);
        assert_eq!(m.brakes, 1);
        assert_eq!(m.brake_mode, BrakeMode::Hold);
        drop(m);
        for _ in 0..5 {
            assert_eq!(oc.step(), OverclockEvent::Idle);
        }
        assert_eq!(motor.borrow().commands.len(), 1);
    }

    #[test]
    fn no_target_disables_and_brakes() {
        let (oc, motor, _) = arm(&[0.0]);
        oc.set_target(Some(MechanismPosition::MID));
        assert!(oc.is_active());
        oc.set_target(None);
        assert!(!oc.is_active());
        assert_eq!(motor.borrow().brakes, 1);
        assert_eq!(oc.target(), Some(MechanismPosition::MID));
        assert_eq!(oc.step(), OverclockEvent::Idle);
    }

    #[test]
    fn enable_without_target_is_ignored() {
        let (oc, _, _) = arm(&[0.0]);
        oc.enable();
        assert!(!oc.is_active());
    }

    #[test]
    fn chains_back_to_low() {
        let (oc, _, _) = arm(&[200.0]);
        oc.set_return_low_after_move(true);
        oc.set_target(Some(MechanismPosition::TOP));
        oc.step();
        oc.step();
        assert_eq!(oc.step(), OverclockEvent::Arrived);
        assert!(oc.is_active());
        assert_eq!(oc.target(), Some(MechanismPosition::LOW));
    }

    #[test]
    fn wait_until_done_with_running_loop() {
        let clock = SimClock::default();
        let (oc, _, _) = arm(&[240.0, 244.0, 246.0]);
        oc.set_target(Some(MechanismPosition::MID));

        let result = block_on(select(
            oc.wait_until_done(&clock, Duration::from_millis(1000)),
            oc.run(&clock),
        ));
        assert!(matches!(result, Either::First(true)));
        assert!(!oc.is_active());
    }

    #[test]
    fn wait_until_done_times_out() {
        let clock = SimClock::default();
        let (oc, _, _) = arm(&[0.0]);
        oc.set_target(Some(MechanismPosition::MID));
        assert!(!block_on(oc.wait_until_done(&clock, Duration::from_millis(100))));
        assert_eq!(clock.uptime(), Duration::from_millis(100));
    }

    #[test]
    fn homing_zeroes_sensor_on_stall() {
        let clock = SimClock::default();
        let (oc, motor, sensor) = arm(&[0.0]);
        {
            let mut m = motor.borrow_mut();
            m.jammed = true;
            m.current = 2000.0;
        }
        assert!(block_on(oc.home(&clock, Duration::from_millis(1000))));
        assert_eq!(sensor.borrow().resets, 1);
        assert_eq!(motor.borrow().commands, vec![-50.0]);
        assert_eq!(motor.borrow().brake_mode, BrakeMode::Hold);
    }

    #[test]
    fn homing_times_out_while_moving() {
        let clock = SimClock::default();
        let (oc, motor, sensor) = arm(&[0.0]);
        motor.borrow_mut().current = 2000.0;
        assert!(!block_on(oc.home(&clock, Duration::from_millis(200))));
        assert_eq!(sensor.borrow().resets, 0);
        assert_eq!(motor.borrow().brakes, 1);
    }
}
