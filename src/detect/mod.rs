//! Sensor classification and debouncing.
//!
//! These are the shared building blocks of the mechanisms:
//!
//! - **[`hue`]**: wraparound-aware hue range matching and the named ring colors.
//! - **[`debounce`]**: the consecutive-sample detector and the blocking
//!   [`wait_until`](debounce::wait_until) loop used by ring detection, goal
//!   detection and clamp confirmation.

/// Hue range matching.
pub mod hue;

/// Debounced detection and bounded waits.
pub mod debounce;
