//! PID controller.
//!
//! PID control calculates motor output based on three terms:
//!
//! - **P (Proportional)**: Output proportional to the error (distance from target).
//! - **I (Integral)**: Output proportional to accumulated error over time.
//! - **D (Derivative)**: Output proportional to the rate of error change.
//!
//! The formula is: `output = Kp*error + Ki*integral + Kd*derivative`
//!
//! The integral term is held inside a band to stop windup and the total output
//! is clamped to the actuator range.
//!
//! # Tuning
//!
//! Start with Kp and increase until the robot reaches the target.
//! Add Kd to reduce overshoot. Only add Ki if the robot consistently
//! undershoots.
//!
//! # Example
//!
//! ```ignore
//! use highstakes::motion::pid::{PIDController, PidGains};
//!
//! let mut pid = PIDController::new(PidGains::new(0.7, 0.0, 0.4)).with_output_limit(200.0);
//! let velocity = pid.update(target - current);
//! ```

use std::time::Duration;

use crate::detect::debounce::LOOPRATE;

/// Proportional, integral and derivative gains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain. Usually 0 unless the mechanism consistently undershoots.
    pub ki: f64,
    /// Derivative gain. Dampens oscillation.
    pub kd: f64,
}

impl PidGains {
    pub const fn new(kp: f64, ki: f64, kd: f64) -> Self { PidGains { kp, ki, kd } }
}

/// Output bound for drive motors on the `-127..=127` power scale.
pub const DRIVE_OUTPUT_LIMIT: f64 = 127.0;
/// Default bound on the integral term.
pub const INTEGRAL_LIMIT: f64 = 50.0;

/// A PID controller with integral and output clamping.
///
/// One instance belongs to exactly one control loop.
#[derive(Debug, Clone, PartialEq)]
pub struct PIDController {
    gains:          PidGains,
    output_limit:   f64,
    integral_limit: f64,
    poll_interval:  Duration,
    integral:       f64,
    prev_error:     Option<f64>,
}

impl PIDController {
    /// Creates a controller with drive defaults: ±127 output, ±50 integral
    /// term, 20 ms poll interval.
    pub fn new(gains: PidGains) -> Self {
        PIDController {
            gains,
            output_limit: DRIVE_OUTPUT_LIMIT,
            integral_limit: INTEGRAL_LIMIT,
            poll_interval: LOOPRATE,
            integral: 0.0,
            prev_error: None,
        }
    }

    pub fn with_output_limit(mut self, limit: f64) -> Self {
        self.output_limit = limit.abs();
        self
    }

    /// Bounds the integral term (`ki * accumulated error`) to `±limit`.
    pub fn with_integral_limit(mut self, limit: f64) -> Self {
        self.integral_limit = limit.abs();
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Replaces the gains. The accumulated state is kept.
    pub fn tune(&mut self, gains: PidGains) { self.gains = gains; }

    pub fn gains(&self) -> PidGains { self.gains }

    pub fn output_limit(&self) -> f64 { self.output_limit }

    /// Computes the next output for `error`.
    ///
    /// The first update after construction or [`reset`](Self::reset) has no
    /// derivative term.
    pub fn update(&mut self, error: f64) -> f64 {
        let PidGains { kp, ki, kd } = self.gains;

        self.integral += error;
        if ki != 0.0 {
            let i_max = self.integral_limit / ki.abs();
            self.integral = self.integral.clamp(-i_max, i_max);
        }

        let dt = self.poll_interval.as_millis().max(1) as f64;
        let derivative = match self.prev_error {
            Some(prev) => (error - prev) / dt,
            None => 0.0,
        };
        self.prev_error = Some(error);

        let output = kp * error + ki * self.integral + kd * derivative;
        abscap(output, self.output_limit)
    }

    /// Clears the integral accumulator and previous error.
    ///
    /// Call whenever a new target is set or a goal is reached, otherwise the
    /// stale integral carries into the next motion.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
    }

    pub fn integral(&self) -> f64 { self.integral }
}

/// Clamps `val` into `[-cap, cap]`.
pub fn abscap(val: f64, cap: f64) -> f64 {
    if val > cap {
        cap
    } else if val < -cap {
        -cap
    } else {
        val
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proportional_only() {
        let mut pid = PIDController::new(PidGains::new(2.0, 0.0, 0.0));
        assert_eq!(pid.update(10.0), 20.0);
        assert_eq!(pid.update(-3.0), -6.0);
    }

    #[test]
    fn output_is_clamped() {
        let mut pid = PIDController::new(PidGains::new(100.0, 0.0, 0.0));
        assert_eq!(pid.update(10.0), 127.0);
        assert_eq!(pid.update(-10.0), -127.0);

        let mut small = PIDController::new(PidGains::new(100.0, 0.0, 0.0)).with_output_limit(200.0);
        assert_eq!(small.update(10.0), 200.0);
    }

    #[test]
    fn integral_term_is_banded() {
        let mut pid = PIDController::new(PidGains::new(0.0, 1.0, 0.0)).with_output_limit(1000.0);
        for _ in 0..100 {
            pid.update(10.0);
        }
        assert_eq!(pid.update(10.0), 50.0);
        // Unwinds immediately once the error changes sign.
        assert!(pid.update(-10.0) < 50.0);
    }

    #[test]
    fn derivative_uses_poll_interval() {
        let mut pid = PIDController::new(PidGains::new(0.0, 0.0, 20.0));
        assert_eq!(pid.update(5.0), 0.0);
        // (9 - 5) / 20 ms * 20
        assert!((pid.update(9.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn reset_matches_fresh_controller() {
        let gains = PidGains::new(0.7, 0.1, 0.4);
        let mut used = PIDController::new(gains);
        for e in [30.0, 20.0, 12.0, 5.0] {
            used.update(e);
        }
        used.reset();
        let mut fresh = PIDController::new(gains);
        assert_eq!(used.integral(), 0.0);
        assert_eq!(used.update(8.0), fresh.update(8.0));
        assert_eq!(used.update(3.0), fresh.update(3.0));
    }

    #[test]
    fn abscap_bounds() {
        assert_eq!(abscap(5.0, 3.0), 3.0);
        assert_eq!(abscap(-5.0, 3.0), -3.0);
        assert_eq!(abscap(1.5, 3.0), 1.5);
    }
}
