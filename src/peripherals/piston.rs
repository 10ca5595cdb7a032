//! Pneumatic pistons.
//!
//! A [`Piston`] wraps any [`DigitalOut`] and remembers whether it is extended,
//! so the decision logic in the mechanisms never has to read the solenoid back.
//!
//! ```ignore
//! use highstakes::peripherals::piston::Piston;
//!
//! let mut clamp = Piston::new(adi_g, false);
//! clamp.extend();
//! assert!(clamp.is_extended());
//! ```

use log::warn;

use super::DigitalOut;

/// A single-acting pneumatic piston.
pub struct Piston {
    output:   Box<dyn DigitalOut>,
    extended: bool,
    /// Whether a high output level retracts the piston.
    inverted: bool,
}

impl Piston {
    /// Creates a piston and drives the output to the requested start state.
    pub fn new<O: DigitalOut + 'static>(output: O, start_extended: bool) -> Self {
        let mut piston = Piston {
            output:   Box::new(output),
            extended: start_extended,
            inverted: false,
        };
        piston.write(start_extended);
        piston
    }

    /// Creates a piston whose valve is plumbed so that a low level extends it.
    pub fn new_inverted<O: DigitalOut + 'static>(output: O, start_extended: bool) -> Self {
        let mut piston = Piston {
            output:   Box::new(output),
            extended: start_extended,
            inverted: true,
        };
        piston.write(start_extended);
        piston
    }

    pub fn extend(&mut self) { self.set(true); }

    pub fn retract(&mut self) { self.set(false); }

    pub fn toggle(&mut self) { self.set(!self.extended); }

    /// Moves the piston to `extended`. Writes only when the state changes.
    pub fn set(&mut self, extended: bool) {
        if self.extended == extended {
            return;
        }
        if self.write(extended) {
            self.extended = extended;
        }
    }

    fn write(&mut self, extended: bool) -> bool {
        match self.output.set_level(extended != self.inverted) {
            Ok(()) => true,
            Err(e) => {
                warn!("Piston Write Error: {}", e);
                false
            }
        }
    }

    pub fn is_extended(&self) -> bool { self.extended }
}
