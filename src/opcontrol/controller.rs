//! Controller input mapping for operator control.
//!
//! This module maps button states to pistons, motors and the overclock arm.
//! It supports:
//!
//! - **Toggle controls**: a new press flips a piston.
//! - **Hold controls**: a piston is extended only while the button is held.
//! - **Dual-button controls**: two buttons for forward/reverse.
//! - **Control button modifiers**: require a "shift" button to be held.
//!
//! Button states are plain [`ButtonInput`] values so the mappings can be
//! driven by anything; on the brain they come from the vexide controller state.
//!
//! # Example
//!
//! ```ignore
//! use highstakes::opcontrol::controller::{ControlType, ControllerControl};
//!
//! let control = ControllerControl::new(state.button_a.into());
//!
//! control.button_to_piston(state.button_b.into(), &mut clamp.borrow_mut(), ControlType::Toggle, false);
//! control.dual_button_to_motors(
//!     state.button_r1.into(),
//!     state.button_r2.into(),
//!     &mut *intake.borrow_mut(),
//!     127.0, -127.0, 0.0, false,
//! );
//! ```

use crate::{
    mechanisms::overclock::{MechanismPosition, Overclock},
    peripherals::{MotorGroup, log_write, piston::Piston},
};

/// The state of one controller button for the current poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonInput {
    /// The button is held down.
    pub pressed:   bool,
    /// The button went down since the previous poll.
    pub new_press: bool,
}

impl ButtonInput {
    pub const RELEASED: ButtonInput = ButtonInput {
        pressed:   false,
        new_press: false,
    };

    pub fn new(pressed: bool, new_press: bool) -> Self { ButtonInput { pressed, new_press } }

    /// A button that went down on this poll.
    pub fn just_pressed() -> Self { ButtonInput::new(true, true) }

    /// A button held since an earlier poll.
    pub fn held() -> Self { ButtonInput::new(true, false) }
}

/// How a button drives a piston.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlType {
    /// Each new press flips the piston.
    #[default]
    Toggle,
    /// Extended while held, retracted on release.
    Hold,
}

/// Applies one poll of `button` to `piston`.
pub fn handle_piston(piston: &mut Piston, control: ControlType, button: ButtonInput) {
    match control {
        ControlType::Toggle => {
            if button.new_press {
                piston.toggle();
            }
        }
        ControlType::Hold => piston.set(button.pressed),
    }
}

/// Controller input mapper for operator control.
///
/// The control button enables extended controls. When `ctrl: true` is passed
/// to a mapping method, the action only triggers if the control button is
/// also held; with `ctrl: false` it only triggers while the control button is
/// up. This effectively doubles the available controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerControl {
    /// The button designated as the control/modifier button.
    controlkey: ButtonInput,
}

impl ControllerControl {
    pub fn new(controlkey: ButtonInput) -> Self { ControllerControl { controlkey } }

    fn modifier_matches(&self, ctrl: bool) -> bool { self.controlkey.pressed == ctrl }

    /// Maps a button to a piston using `control`.
    pub fn button_to_piston(
        &self,
        button: ButtonInput,
        piston: &mut Piston,
        control: ControlType,
        ctrl: bool,
    ) {
        if self.modifier_matches(ctrl) {
            handle_piston(piston, control, button);
        }
    }

    /// Maps two buttons to a motor group. The high button wins when both are
    /// held; with neither held the group runs at `passive_pwr`.
    #[allow(clippy::too_many_arguments)]
    pub fn dual_button_to_motors(
        &self,
        button_high: ButtonInput,
        button_low: ButtonInput,
        motors: &mut dyn MotorGroup,
        high_pwr: f64,
        low_pwr: f64,
        passive_pwr: f64,
        ctrl: bool,
    ) {
        if !self.modifier_matches(ctrl) {
            return;
        }
        let power = if button_high.pressed {
            high_pwr
        } else if button_low.pressed {
            low_pwr
        } else {
            passive_pwr
        };
        log_write(motors.set_power(power), "Motor Set Power");
    }

    /// Sends the overclock arm to `position` on a new press.
    pub fn button_to_mechanism(
        &self,
        button: ButtonInput,
        overclock: &Overclock,
        position: MechanismPosition,
        ctrl: bool,
    ) {
        if button.new_press && self.modifier_matches(ctrl) {
            overclock.set_target(Some(position));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::{
        mechanisms::overclock::OverclockConfig,
        peripherals::mock::{MockMotor, MockOut, MockRotation},
    };

    #[test]
    fn toggle_flips_on_new_press_only() {
        let mut piston = Piston::new(MockOut::default(), false);
        handle_piston(&mut piston, ControlType::Toggle, ButtonInput::just_pressed());
        assert!(piston.is_extended());
        handle_piston(&mut piston, ControlType::Toggle, ButtonInput::held());
        assert!(piston.is_extended());
        handle_piston(&mut piston, ControlType::Toggle, ButtonInput::RELEASED);
        handle_piston(&mut piston, ControlType::Toggle, ButtonInput::just_pressed());
        assert!(!piston.is_extended());
    }

    #[test]
    fn hold_follows_button() {
        let mut piston = Piston::new(MockOut::default(), false);
        handle_piston(&mut piston, ControlType::Hold, ButtonInput::just_pressed());
        assert!(piston.is_extended());
        handle_piston(&mut piston, ControlType::Hold, ButtonInput::held());
        assert!(piston.is_extended());
        handle_piston(&mut piston, ControlType::Hold, ButtonInput::RELEASED);
        assert!(!piston.is_extended());
    }

    #[test]
    fn control_key_gates_mappings() {
        let mut piston = Piston::new(MockOut::default(), false);
        let shifted = ControllerControl::new(ButtonInput::held());
        shifted.button_to_piston(ButtonInput::just_pressed(), &mut piston, ControlType::Toggle, false);
        assert!(!piston.is_extended());
        shifted.button_to_piston(ButtonInput::just_pressed(), &mut piston, ControlType::Toggle, true);
        assert!(piston.is_extended());
    }

    #[test]
    fn dual_buttons_pick_power() {
        let control = ControllerControl::new(ButtonInput::RELEASED);
        let mut intake = MockMotor::default();
        control.dual_button_to_motors(ButtonInput::held(), ButtonInput::held(), &mut intake, 127.0, -127.0, 0.0, false);
        control.dual_button_to_motors(ButtonInput::RELEASED, ButtonInput::held(), &mut intake, 127.0, -127.0, 0.0, false);
        control.dual_button_to_motors(ButtonInput::RELEASED, ButtonInput::RELEASED, &mut intake, 127.0, -127.0, 0.0, false);
        assert_eq!(intake.commands, vec![127.0, -127.0, 0.0]);
    }

    #[test]
    fn mechanism_button_sets_target() {
        let motor = Rc::new(RefCell::new(MockMotor::default()));
        let sensor = Rc::new(RefCell::new(MockRotation::new(&[0.0])));
        let oc = Overclock::from_shared(motor, sensor, OverclockConfig::default());
        let control = ControllerControl::new(ButtonInput::RELEASED);

        control.button_to_mechanism(ButtonInput::held(), &oc, MechanismPosition::HIGH, false);
        assert_eq!(oc.target(), None);
        control.button_to_mechanism(ButtonInput::just_pressed(), &oc, MechanismPosition::HIGH, false);
        assert_eq!(oc.target(), Some(MechanismPosition::HIGH));
        assert!(oc.is_active());
    }
}
