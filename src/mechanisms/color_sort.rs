//! Ring color sorting.
//!
//! An optical sensor watches rings passing through the intake. Rings of the
//! redirect color extend the redirect piston so they are thrown out; rings of
//! the intake color retract it again so they pass through. Anything else
//! leaves the piston where it is.
//!
//! A ring counts as present when its distance (`255 - proximity`) is at most
//! `max_ring_distance`. Hue readings outside `[0, 360)` never match.
//!
//! ```ignore
//! let sorter = ColorSortController::new(ring_sensor, redirect, ColorSortConfig::default());
//! sorter.set_redirect_color(RingColor::Blue); // we are red alliance
//! sorter.enable();
//! sorter.init();
//! ```

use std::{cell::RefCell, rc::Rc, time::Duration};

use log::{debug, info, warn};

use crate::{
    detect::{
        debounce::{Debouncer, LOOPRATE, wait_until},
        hue::{Hue, RingColor},
    },
    peripherals::{Clock, OpticalSensor, Shared, log_write, piston::Piston},
};

/// Tuning for the color sorter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSortConfig {
    /// Furthest distance (`255 - proximity`) at which a ring is considered
    /// to be in the intake.
    pub max_ring_distance: u8,
    /// Consecutive matching samples before acting.
    pub min_detections:    u32,
    /// LED brightness while sorting or waiting for a ring, `0.0..=1.0`.
    pub led_brightness:    f64,
}

impl Default for ColorSortConfig {
    fn default() -> Self {
        ColorSortConfig {
            max_ring_distance: 10,
            min_detections:    1,
            led_brightness:    1.0,
        }
    }
}

/// What one poll of the sorter did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortAction {
    Disabled,
    /// A redirect-colored ring extended the redirect piston.
    Redirect,
    /// An intake-colored ring retracted the redirect piston.
    PassThrough,
    /// Nothing matched; the piston kept its state.
    Hold,
}

/// Snapshot for telemetry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSortStatus {
    pub enabled:     bool,
    pub redirect:    Hue,
    pub intake:      Hue,
    pub redirecting: bool,
}

/// Last time a ring of each color was seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LastSeen {
    any:  Option<Duration>,
    red:  Option<Duration>,
    blue: Option<Duration>,
}

struct ColorSortState {
    enabled:           bool,
    redirect:          Hue,
    intake:            Hue,
    redirect_debounce: Debouncer,
    intake_debounce:   Debouncer,
    last_seen:         LastSeen,
}

/// The color sort controller.
#[derive(Clone)]
pub struct ColorSortController {
    pub sensor:   Rc<RefCell<dyn OpticalSensor>>,
    pub redirect: Shared<Piston>,
    config:       ColorSortConfig,
    state:        Rc<RefCell<ColorSortState>>,
}

impl ColorSortController {
    /// Creates a disabled sorter that redirects blue rings and keeps red ones.
    pub fn new(
        sensor: Rc<RefCell<dyn OpticalSensor>>,
        redirect: Shared<Piston>,
        config: ColorSortConfig,
    ) -> Self {
        ColorSortController {
            sensor,
            redirect,
            config,
            state: Rc::new(RefCell::new(ColorSortState {
                enabled:           false,
                redirect:          RingColor::Blue.hue(),
                intake:            RingColor::Red.hue(),
                redirect_debounce: Debouncer::new(config.min_detections),
                intake_debounce:   Debouncer::new(config.min_detections),
                last_seen:         LastSeen::default(),
            })),
        }
    }

    pub fn config(&self) -> &ColorSortConfig { &self.config }

    /// Starts sorting and turns the LED on.
    ///
    /// Refused while the redirect hue is "any".
    pub fn enable(&self) {
        let mut state = self.state.borrow_mut();
        if state.redirect.is_any() {
            warn!("Color sort cannot be enabled with an \"any\" redirect hue");
            return;
        }
        if !state.enabled {
            state.enabled = true;
            self.set_led(self.config.led_brightness);
            info!("Color sort enabled");
        }
    }

    /// Stops sorting and turns the LED off. The piston is left where it is.
    pub fn disable(&self) {
        let mut state = self.state.borrow_mut();
        if state.enabled {
            state.enabled = false;
            state.redirect_debounce.reset();
            state.intake_debounce.reset();
            self.set_led(0.0);
            info!("Color sort disabled");
        }
    }

    pub fn is_enabled(&self) -> bool { self.state.borrow().enabled }

    /// Sets the hue of rings to throw out.
    ///
    /// "Any" is ambiguous: it is rejected, the previous hue is kept and the
    /// sorter is disabled.
    pub fn set_redirect_hue(&self, hue: Hue) {
        if hue.is_any() {
            warn!("Color sort redirect hue cannot be \"any\"; disabling");
            self.disable();
            return;
        }
        let mut state = self.state.borrow_mut();
        state.redirect = hue;
        state.redirect_debounce.reset();
    }

    /// Sets the hue of rings to keep.
    pub fn set_intake_hue(&self, hue: Hue) {
        let mut state = self.state.borrow_mut();
        state.intake = hue;
        state.intake_debounce.reset();
    }

    /// Redirects `color` and keeps its opposite.
    pub fn set_redirect_color(&self, color: RingColor) {
        self.set_redirect_hue(color.hue());
        if color != RingColor::Any {
            self.set_intake_hue(color.opposite().hue());
        }
    }

    pub fn redirect_hue(&self) -> Hue { self.state.borrow().redirect }

    pub fn intake_hue(&self) -> Hue { self.state.borrow().intake }

    /// Takes one sample and reports whether a ring of `color` is in the intake.
    ///
    /// Any ring present stamps the last-seen times with `now`.
    pub fn is_detected(&self, color: RingColor, now: Duration) -> bool {
        match self.sample() {
            Some((hue, distance)) if self.ring_present(distance) => {
                record(&mut self.state.borrow_mut().last_seen, now, hue);
                color.hue().matches(hue)
            }
            _ => false,
        }
    }

    /// Uptime at which a ring of `color` was last seen. `Any` reports rings of
    /// every color.
    pub fn last_detection(&self, color: RingColor) -> Option<Duration> {
        let last = self.state.borrow().last_seen;
        match color {
            RingColor::Any => last.any,
            RingColor::Red => last.red,
            RingColor::Blue => last.blue,
        }
    }

    pub fn status(&self) -> ColorSortStatus {
        let state = self.state.borrow();
        ColorSortStatus {
            enabled:     state.enabled,
            redirect:    state.redirect,
            intake:      state.intake,
            redirecting: self.redirect.borrow().is_extended(),
        }
    }

    /// Runs one poll of the sorter. `now` stamps any detection.
    pub fn step(&self, now: Duration) -> SortAction {
        let mut state = self.state.borrow_mut();
        if !state.enabled {
            return SortAction::Disabled;
        }

        let (redirect_hit, intake_hit) = match self.sample() {
            Some((hue, distance)) if self.ring_present(distance) => {
                record(&mut state.last_seen, now, hue);
                let redirect_hit = state.redirect.matches(hue);
                (redirect_hit, !redirect_hit && state.intake.matches(hue))
            }
            _ => (false, false),
        };

        let redirect = state.redirect_debounce.poll(redirect_hit);
        let intake = state.intake_debounce.poll(intake_hit);
        if redirect.is_detected() {
            self.redirect.borrow_mut().extend();
            SortAction::Redirect
        } else if intake.is_detected() {
            self.redirect.borrow_mut().retract();
            SortAction::PassThrough
        } else {
            SortAction::Hold
        }
    }

    /// The sorting loop. Polls every [`LOOPRATE`] forever.
    pub async fn run<C: Clock>(&self, clock: &C) {
        info!("Color Sort Loop Started");
        loop {
            self.step(clock.uptime());
            clock.sleep(LOOPRATE).await;
        }
    }

    /// Waits until a ring of `color` has been seen `min_detections` times in a
    /// row. Returns `false` on timeout.
    pub async fn wait_until_detected<C: Clock>(
        &self,
        clock: &C,
        timeout: Duration,
        color: RingColor,
    ) -> bool {
        self.set_led(self.config.led_brightness);
        let hue = color.hue();
        let mut debouncer = Debouncer::new(self.config.min_detections);
        let found = wait_until(clock, &mut debouncer, timeout, LOOPRATE, || {
            match self.sample() {
                Some((sample, distance)) if self.ring_present(distance) => {
                    record(&mut self.state.borrow_mut().last_seen, clock.uptime(), sample);
                    hue.matches(sample)
                }
                _ => false,
            }
        })
        .await;
        if !self.is_enabled() {
            self.set_led(0.0);
        }
        if found {
            debug!("Ring detected: {:?}", color);
        }
        found
    }

    fn ring_present(&self, distance: u8) -> bool { distance <= self.config.max_ring_distance }

    /// Reads hue and distance. `None` when either read fails.
    fn sample(&self) -> Option<(f64, u8)> {
        let sensor = self.sensor.borrow();
        let reading = sensor
            .hue()
            .and_then(|hue| sensor.proximity().map(|raw| (hue, 255 - raw)));
        reading
            .map_err(|e| warn!("Ring Sensor Read Error: {}", e))
            .ok()
    }

    fn set_led(&self, brightness: f64) {
        log_write(
            self.sensor.borrow_mut().set_led_brightness(brightness),
            "Ring Sensor LED",
        );
    }
}

fn record(last: &mut LastSeen, now: Duration, hue: f64) {
    last.any = Some(now);
    match RingColor::classify(hue) {
        Some(RingColor::Red) => last.red = Some(now),
        Some(RingColor::Blue) => last.blue = Some(now),
        _ => {}
    }
}

#[cfg(target_os = "vexos")]
impl ColorSortController {
    /// Spawns the sorting loop on the vexide executor.
    pub fn init(&self) {
        let sorter = self.clone();
        crate::peripherals::vex::spawn(async move {
            sorter.run(&crate::peripherals::vex::VexClock).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc, time::Duration};

    use embassy_futures::block_on;

    use super::*;
    use crate::peripherals::{
        make_cloneable,
        mock::{MockOptical, MockOut, SimClock},
    };

    const NEAR: u8 = 250;
    const FAR: u8 = 100;

    fn sorter(hues: &[f64], proximities: &[u8]) -> (ColorSortController, Rc<RefCell<MockOptical>>) {
        let sensor = Rc::new(RefCell::new(MockOptical::new(hues, proximities)));
        let redirect = make_cloneable(Piston::new(MockOut::default(), false));
        let cs = ColorSortController::new(sensor.clone(), redirect, ColorSortConfig::default());
        (cs, sensor)
    }

    #[test]
    fn redirects_red_and_passes_blue() {
        let (cs, _) = sorter(&[2.0, 120.0, 214.0, 120.0, 355.0], &[NEAR]);
        cs.set_redirect_color(RingColor::Red);
        assert_eq!(cs.intake_hue(), RingColor::Blue.hue());
        cs.enable();

        let t = Duration::ZERO;
        assert_eq!(cs.step(t), SortAction::Redirect);
        assert!(cs.redirect.borrow().is_extended());
        assert_eq!(cs.step(t), SortAction::Hold);
        assert!(cs.redirect.borrow().is_extended());
        assert_eq!(cs.step(t), SortAction::PassThrough);
        assert!(!cs.redirect.borrow().is_extended());
        assert_eq!(cs.step(t), SortAction::Hold);
        assert!(!cs.redirect.borrow().is_extended());
        assert_eq!(cs.step(t), SortAction::Redirect);
    }

    #[test]
    fn far_rings_are_ignored() {
        let (cs, _) = sorter(&[0.0], &[FAR]);
        cs.set_redirect_color(RingColor::Red);
        cs.enable();
        assert_eq!(cs.step(Duration::ZERO), SortAction::Hold);
        assert!(!cs.redirect.borrow().is_extended());
        assert_eq!(cs.last_detection(RingColor::Any), None);
    }

    #[test]
    fn disabled_does_nothing() {
        let (cs, sensor) = sorter(&[0.0], &[NEAR]);
        cs.set_redirect_color(RingColor::Red);
        assert_eq!(cs.step(Duration::ZERO), SortAction::Disabled);
        assert!(!cs.redirect.borrow().is_extended());

        cs.enable();
        assert_eq!(sensor.borrow().brightness, 1.0);
        cs.disable();
        assert_eq!(sensor.borrow().brightness, 0.0);
        assert_eq!(cs.step(Duration::ZERO), SortAction::Disabled);
    }

    #[test]
    fn any_redirect_is_rejected() {
        let (cs, _) = sorter(&[0.0], &[NEAR]);
        cs.set_redirect_color(RingColor::Red);
        cs.enable();
        cs.set_redirect_hue(Hue::ANY);
        assert!(!cs.is_enabled());
        assert_eq!(cs.redirect_hue(), RingColor::Red.hue());

        cs.set_redirect_color(RingColor::Any);
        assert_eq!(cs.intake_hue(), RingColor::Blue.hue());
    }

    #[test]
    fn debounces_with_min_detections() {
        let sensor = Rc::new(RefCell::new(MockOptical::new(&[0.0, 0.0, 120.0, 0.0, 0.0], &[NEAR])));
        let redirect = make_cloneable(Piston::new(MockOut::default(), false));
        let config = ColorSortConfig {
            min_detections: 2,
            ..ColorSortConfig::default()
        };
        let cs = ColorSortController::new(sensor, redirect, config);
        cs.set_redirect_color(RingColor::Red);
        cs.enable();
        assert_eq!(cs.step(Duration::ZERO), SortAction::Hold);
        assert_eq!(cs.step(Duration::ZERO), SortAction::Redirect);
        cs.redirect.borrow_mut().retract();
        assert_eq!(cs.step(Duration::ZERO), SortAction::Hold);
        assert_eq!(cs.step(Duration::ZERO), SortAction::Hold);
        assert_eq!(cs.step(Duration::ZERO), SortAction::Redirect);
    }

    #[test]
    fn records_last_detections() {
        let (cs, _) = sorter(&[3.0, 208.0, 120.0], &[NEAR]);
        cs.set_redirect_color(RingColor::Blue);
        cs.enable();
        cs.step(Duration::from_millis(20));
        cs.step(Duration::from_millis(40));
        cs.step(Duration::from_millis(60));
        assert_eq!(cs.last_detection(RingColor::Red), Some(Duration::from_millis(20)));
        assert_eq!(cs.last_detection(RingColor::Blue), Some(Duration::from_millis(40)));
        assert_eq!(cs.last_detection(RingColor::Any), Some(Duration::from_millis(60)));
    }

    #[test]
    fn single_sample_detection() {
        let (cs, _) = sorter(&[205.0, 205.0], &[NEAR, FAR]);
        assert!(cs.is_detected(RingColor::Blue, Duration::from_millis(20)));
        assert!(!cs.is_detected(RingColor::Blue, Duration::from_millis(40)));
    }

    #[test]
    fn single_sample_detection_records_last_seen() {
        let (cs, _) = sorter(&[205.0, 4.0, 205.0], &[NEAR, NEAR, FAR]);
        assert!(cs.is_detected(RingColor::Blue, Duration::from_millis(20)));
        assert_eq!(cs.last_detection(RingColor::Blue), Some(Duration::from_millis(20)));
        assert_eq!(cs.last_detection(RingColor::Any), Some(Duration::from_millis(20)));
        assert_eq!(cs.last_detection(RingColor::Red), None);

        // A red ring is still seen while looking for blue.
        assert!(!cs.is_detected(RingColor::Blue, Duration::from_millis(40)));
        assert_eq!(cs.last_detection(RingColor::Red), Some(Duration::from_millis(40)));
        assert_eq!(cs.last_detection(RingColor::Any), Some(Duration::from_millis(40)));

        // Nothing in the intake leaves the timestamps alone.
        assert!(!cs.is_detected(RingColor::Blue, Duration::from_millis(60)));
        assert_eq!(cs.last_detection(RingColor::Blue), Some(Duration::from_millis(20)));
        assert_eq!(cs.last_detection(RingColor::Any), Some(Duration::from_millis(40)));
    }

    #[test]
    fn wait_until_detected_finds_ring() {
        let clock = SimClock::default();
        let (cs, sensor) = sorter(&[120.0, 120.0, 212.0], &[FAR, NEAR]);
        assert!(block_on(cs.wait_until_detected(&clock, Duration::from_millis(500), RingColor::Blue)));
        assert_eq!(clock.uptime(), Duration::from_millis(40));
        assert_eq!(cs.last_detection(RingColor::Blue), Some(Duration::from_millis(40)));
        assert_eq!(sensor.borrow().brightness, 0.0);
    }

    #[test]
    fn wait_until_detected_times_out() {
        let clock = SimClock::default();
        let (cs, _) = sorter(&[0.0], &[NEAR]);
        assert!(!block_on(cs.wait_until_detected(&clock, Duration::from_millis(100), RingColor::Blue)));
        assert_eq!(clock.uptime(), Duration::from_millis(100));
    }
}
