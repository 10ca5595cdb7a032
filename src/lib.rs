//! # High Stakes
//!
//! Closed-loop control and sensor automation for a VEX V5 competition robot,
//! built on top of [Vexide](https://vexide.dev). It provides:
//!
//! - **Drivetrain Control**: a differential drivetrain with inch-based
//!   conversions.
//! - **Motion Control**: PID distance drives with settling and an optional
//!   mid-motion clamp trigger, and PID turns to a heading.
//! - **Mechanisms**: the overclock arm position controller, ring color
//!   sorting and automatic goal clamping, each running as its own loop.
//! - **Detection**: wraparound-aware hue matching and debounced detection.
//! - **Operator Control**: drive curve and button mappings.
//! - **Autonomous Selection**: a registry of routines with one signature.
//! - **Logging**: a console and file logger.
//!
//! ## Quick Start
//!
//! ```ignore
//! use highstakes::{
//!     drivetrain::{Differential, DrivetrainConfig},
//!     mechanisms::auto_clamp::*,
//!     peripherals::{make_cloneable, piston::Piston, vex::*},
//! };
//! use vexide::prelude::*;
//!
//! #[vexide::main]
//! async fn main(peripherals: Peripherals) {
//!     let _ = highstakes::fs::logger::init(log::LevelFilter::Info);
//!
//!     let drivetrain = Differential::new(
//!         VexMotors::new(vec![Motor::new(peripherals.port_1, Gearset::Blue, Direction::Reverse)]),
//!         VexMotors::new(vec![Motor::new(peripherals.port_2, Gearset::Blue, Direction::Forward)]),
//!         DrivetrainConfig::default(),
//!     );
//!     let clamp = make_cloneable(Piston::new(AdiDigitalOut::new(peripherals.adi_a), false));
//!     let goal_sensor = make_cloneable(OpticalSensor::new(peripherals.port_9));
//!     let auto_clamp = AutoClamp::new(goal_sensor, clamp, drivetrain.clone(), AutoClampConfig::default());
//!     auto_clamp.init();
//!     auto_clamp.enable();
//! }
//! ```
//!
//! ## Modules
//!
//! - [`drivetrain`]: differential drivetrain and its physical config.
//! - [`detect`]: hue matching and debounced detection.
//! - [`motion`]: PID controller, distance drives and turns.
//! - [`mechanisms`]: overclock arm, color sort and goal clamp.
//! - [`opcontrol`]: controller input mapping.
//! - [`auton`]: autonomous routine selection.
//! - [`peripherals`]: hardware capability traits and their vexide implementations.
//! - [`fs`]: filesystem utilities including logging.

/// Differential drivetrain control module.
///
/// Provides the [`Differential`](drivetrain::Differential) struct for
/// controlling robots with left and right motor groups, and the
/// [`DrivetrainConfig`](drivetrain::DrivetrainConfig) used to convert inches
/// into encoder rotations.
pub mod drivetrain;

/// Detection primitives.
///
/// - **Hue**: circular hue ranges that wrap through 0°.
/// - **Debounce**: N consecutive positive samples, with a bounded wait.
pub mod detect;

/// Autonomous motion control module.
pub mod motion;

/// Mechanism controllers that run as background loops.
pub mod mechanisms;

/// Operator control utilities module.
///
/// Maps controller buttons to pistons, motors and the overclock arm, with
/// toggle, hold and dual-button controls, and shapes joystick input for tank
/// drive.
pub mod opcontrol;

/// Autonomous routine selection.
pub mod auton;

/// Hardware capability interfaces.
pub mod peripherals;

/// Filesystem utilities module.
///
/// Contains logging functionality for recording robot telemetry and debug
/// information to files on the V5 Brain's SD card.
pub mod fs;
