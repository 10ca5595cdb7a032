//! Sensor-driven mechanism controllers.
//!
//! Each controller owns its state behind an `Rc<RefCell<..>>` and is `Clone`,
//! so one handle can run the background loop while another issues commands
//! from driver control or an autonomous routine:
//!
//! ```ignore
//! let overclock = Overclock::new(arm_motors, arm_rotation, OverclockConfig::default());
//! overclock.init(); // spawns the 20 ms control loop
//!
//! overclock.set_target(Some(MechanismPosition::HIGH));
//! overclock.wait_until_done(&VexClock, Duration::from_millis(1500)).await;
//! ```
//!
//! Every loop checks its enabled flag at the top of each poll, so disabling a
//! controller takes effect within one [`LOOPRATE`](crate::detect::debounce::LOOPRATE).

/// Angular position control for the overclock arm.
pub mod overclock;

/// Ring color sorting.
pub mod color_sort;

/// Automatic goal clamping.
pub mod auto_clamp;
