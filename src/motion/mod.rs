//! Autonomous motion control algorithms.
//!
//! This module provides tools for precise robot movement during autonomous
//! periods. It includes:
//!
//! - **PID Control**: a reusable Proportional-Integral-Derivative controller
//!   with integral and output clamping.
//! - **Drive**: distance and heading moves that settle over several polls,
//!   with an optional clamp trigger that fires mid-motion.
//!
//! # Architecture
//!
//! Each movement is a small state machine stepped once per poll
//! (`read -> compute -> command`). The async movement methods run that state
//! machine against a [`Clock`](crate::peripherals::Clock) and brake the
//! drivetrain on exit, whatever the outcome.
//!
//! # Example
//!
//! ```ignore
//! use highstakes::motion::drive::{DriveParams, LinearMotionController};
//! use highstakes::motion::pid::PidGains;
//!
//! let drive = LinearMotionController::new(drivetrain).with_clamp(clamp);
//! let params = DriveParams::new(-24.0, Duration::from_millis(2000), PidGains::new(20.0, 0.0, 4.0), 0.5)
//!     .with_clamp(1.0);
//! drive.drive_distance(&clock, params).await;
//! ```

/// PID controller.
pub mod pid;

/// Distance and heading moves.
pub mod drive;
