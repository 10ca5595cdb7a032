/// Autonomous routine registry where every routine takes the robot and an
/// integer parameter.
pub mod selector;
