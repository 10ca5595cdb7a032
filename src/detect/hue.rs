//! Hue classification.
//!
//! Hues are angles on the color wheel, so a range centred near 0° spills over
//! into the high 300s. [`Hue::matches`] handles that split explicitly.
//!
//! ```ignore
//! use highstakes::detect::hue::Hue;
//!
//! let red = Hue::new(0.0, 10.0);
//! assert!(red.matches(355.0));
//! assert!(red.matches(5.0));
//! assert!(!red.matches(20.0));
//! ```

/// Exact hue of a red ring.
pub const RED_RING_HUE: f64 = 0.0;
/// Exact hue of a blue ring.
pub const BLUE_RING_HUE: f64 = 210.0;
/// One-sided hue range that is considered close enough.
pub const HUE_RANGE: f64 = 10.0;

/// A target hue with an acceptable half-width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hue {
    center: f64,
    range:  f64,
}

impl Hue {
    /// Matches every valid hue.
    pub const ANY: Hue = Hue {
        center: 0.0,
        range:  180.0,
    };

    pub const fn new(center: f64, range: f64) -> Self { Hue { center, range } }

    pub fn center(&self) -> f64 { self.center }

    pub fn range(&self) -> f64 { self.range }

    /// Whether this hue covers the whole color wheel.
    pub fn is_any(&self) -> bool { self.range >= 180.0 }

    /// Lower and upper bounds, each normalised into `[0, 360)`.
    ///
    /// `min > max` means the interval wraps through 0°.
    pub fn bounds(&self) -> (f64, f64) {
        (
            (self.center - self.range).rem_euclid(360.0),
            (self.center + self.range).rem_euclid(360.0),
        )
    }

    /// Whether `sample` lies within `[center - range, center + range]` on the
    /// color wheel.
    ///
    /// Readings outside `[0, 360)` are sensor noise and never match.
    pub fn matches(&self, sample: f64) -> bool {
        if !(0.0..360.0).contains(&sample) {
            return false;
        }
        if self.is_any() {
            return true;
        }
        let (min, max) = self.bounds();
        if min <= max {
            sample >= min && sample <= max
        } else {
            sample >= min || sample <= max
        }
    }
}

/// The ring colors the robot knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RingColor {
    Red,
    Blue,
    /// Any ring at all. Disables color-specific behavior.
    Any,
}

impl RingColor {
    pub fn hue(self) -> Hue {
        match self {
            RingColor::Red => Hue::new(RED_RING_HUE, HUE_RANGE),
            RingColor::Blue => Hue::new(BLUE_RING_HUE, HUE_RANGE),
            RingColor::Any => Hue::ANY,
        }
    }

    /// The other alliance's color. `Any` has no opposite.
    pub fn opposite(self) -> RingColor {
        match self {
            RingColor::Red => RingColor::Blue,
            RingColor::Blue => RingColor::Red,
            RingColor::Any => RingColor::Any,
        }
    }

    /// Classifies a hue sample as red or blue, if it is either.
    pub fn classify(sample: f64) -> Option<RingColor> {
        [RingColor::Red, RingColor::Blue]
            .into_iter()
            .find(|color| color.hue().matches(sample))
    }
}
