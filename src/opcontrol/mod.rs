//! Operator control utilities for driver control periods.
//!
//! This module simplifies mapping controller inputs to robot actions
//! during the driver-controlled portion of a match.
//!
//! # Features
//!
//! - **Drive curve**: squared joystick response for tank drive.
//! - **Button-to-piston mapping**: toggle or hold control of pistons.
//! - **Button-to-motor mapping**: run mechanisms with button holds.
//! - **Control button modifiers**: combine buttons for extended controls.
//!
//! # Example
//!
//! ```ignore
//! use highstakes::opcontrol::{controller::*, curve};
//!
//! let (left, right) = curve::tank(state.left_stick.y(), state.right_stick.y(), Gearset::Blue);
//! drivetrain.set_velocity(left, right);
//!
//! let control = ControllerControl::new(state.button_a.into());
//! control.button_to_piston(state.button_b.into(), &mut clamp.borrow_mut(), ControlType::Toggle, false);
//! ```

/// Controller input mapping utilities.
///
/// Provides [`ControllerControl`](controller::ControllerControl) for
/// mapping buttons to pistons, motors and the overclock arm.
pub mod controller;

/// Joystick response curve.
pub mod curve;
