//! Autonomous routine registry.
//!
//! Every routine has the same shape: it borrows the robot mutably and takes a
//! single integer parameter (commonly an alliance side or a variant number).
//! Routines are registered by name with their parameter bound up front, so
//! running the selection never needs to know what kind of routine it is.
//!
//! ```ignore
//! fn rush(robot: &mut Robot, side: i32) -> RoutineFuture<'_> {
//!     Box::pin(async move {
//!         robot.drive.drive_distance(&VexClock, params(side)).await;
//!     })
//! }
//!
//! let mut selector: AutonSelector<Robot> = AutonSelector::new();
//! selector.register("Rush (left)", rush, -1)?;
//! selector.register("Rush (right)", rush, 1)?;
//!
//! selector.next();
//! selector.run(&mut robot).await;
//! ```

use std::{fmt, future::Future, pin::Pin};

use heapless::Vec;
use log::{info, warn};

/// Default routine capacity of a selector.
pub const MAX_ROUTINES: usize = 16;

/// The future returned by a routine.
pub type RoutineFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a>>;

/// The single routine signature: the robot plus an integer parameter.
pub type RoutineFn<R> = for<'a> fn(&'a mut R, i32) -> RoutineFuture<'a>;

/// A named routine with its parameter bound.
pub struct Routine<R> {
    pub name:      &'static str,
    pub func:      RoutineFn<R>,
    pub parameter: i32,
}

impl<R> Clone for Routine<R> {
    fn clone(&self) -> Self { *self }
}

impl<R> Copy for Routine<R> {}

impl<R> fmt::Debug for Routine<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Routine")
            .field("name", &self.name)
            .field("parameter", &self.parameter)
            .finish()
    }
}

/// Errors from registering or selecting routines.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("no room for routine \"{0}\"")]
    Full(&'static str),
    #[error("selection {index} out of range ({len} routines)")]
    OutOfRange { index: usize, len: usize },
}

/// A fixed-capacity list of routines with a wrap-around cursor.
pub struct AutonSelector<R, const N: usize = MAX_ROUTINES> {
    routines: Vec<Routine<R>, N>,
    selected: usize,
}

impl<R, const N: usize> Default for AutonSelector<R, N> {
    fn default() -> Self { Self::new() }
}

impl<R, const N: usize> AutonSelector<R, N> {
    pub fn new() -> Self {
        AutonSelector {
            routines: Vec::new(),
            selected: 0,
        }
    }

    /// Adds a routine at the end of the list.
    pub fn register(
        &mut self,
        name: &'static str,
        func: RoutineFn<R>,
        parameter: i32,
    ) -> Result<(), SelectorError> {
        self.routines
            .push(Routine {
                name,
                func,
                parameter,
            })
            .map_err(|_| SelectorError::Full(name))
    }

    /// Appends every routine of `other`, e.g. to combine the competition and
    /// testing lists. Stops at the first routine that does not fit.
    pub fn extend_from<const M: usize>(
        &mut self,
        other: &AutonSelector<R, M>,
    ) -> Result<(), SelectorError> {
        for routine in other.routines.iter() {
            self.routines
                .push(*routine)
                .map_err(|r| SelectorError::Full(r.name))?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize { self.routines.len() }

    pub fn is_empty(&self) -> bool { self.routines.is_empty() }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.routines.iter().map(|r| r.name)
    }

    /// Moves the cursor forward, wrapping to the first routine.
    pub fn next(&mut self) {
        if !self.is_empty() {
            self.selected = (self.selected + 1) % self.len();
        }
    }

    /// Moves the cursor back, wrapping to the last routine.
    pub fn prev(&mut self) {
        if !self.is_empty() {
            self.selected = (self.selected + self.len() - 1) % self.len();
        }
    }

    /// Selects the routine at `index`. The selection is unchanged on error.
    pub fn select(&mut self, index: usize) -> Result<(), SelectorError> {
        if index >= self.len() {
            return Err(SelectorError::OutOfRange {
                index,
                len: self.len(),
            });
        }
        self.selected = index;
        Ok(())
    }

    pub fn selected_index(&self) -> usize { self.selected }

    pub fn selected(&self) -> Option<&Routine<R>> { self.routines.get(self.selected) }

    /// Runs the selected routine to completion. Returns `false` when there is
    /// nothing to run.
    pub async fn run(&self, robot: &mut R) -> bool {
        let Some(routine) = self.selected().copied() else {
            warn!("No autonomous routine registered");
            return false;
        };
        info!("Running autonomous: {} ({})", routine.name, routine.parameter);
        (routine.func)(robot, routine.parameter).await;
        info!("Autonomous finished: {}", routine.name);
        true
    }
}
