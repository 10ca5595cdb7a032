//! Joystick shaping for tank drive.
//!
//! Small stick deflections are squared down so the robot is easy to place
//! precisely, while full deflection still reaches full speed:
//! `curve(x) = sign(x) * x² / 100` on a `-100..=100` percent scale.

use crate::peripherals::Gearset;

/// Applies the squared drive curve to a joystick percent in `-100..=100`.
///
/// Inputs outside that range are clamped first.
pub fn drive_curve(percent: f64) -> f64 {
    let x = percent.clamp(-100.0, 100.0);
    x * x.abs() / 100.0
}

/// Converts a raw joystick axis in `-1.0..=1.0` to a curved wheel velocity in
/// rpm for `gearset`.
pub fn stick_to_rpm(axis: f64, gearset: Gearset) -> f64 {
    drive_curve(axis * 100.0) * gearset.max_rpm() / 100.0
}

/// Tank drive: each stick drives one side. Returns `(left, right)` in rpm.
pub fn tank(left_axis: f64, right_axis: f64, gearset: Gearset) -> (f64, f64) {
    (stick_to_rpm(left_axis, gearset), stick_to_rpm(right_axis, gearset))
}
