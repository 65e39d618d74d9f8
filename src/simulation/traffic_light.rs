//! Two-axis traffic light controller
//!
//! One axis at a time cycles GREEN -> AMBER -> RED while the other is held at
//! RED. After a one second RED/RED clearance the waiting axis turns GREEN and
//! becomes the active phase. Night mode overrides everything with flashing
//! amber, and manual mode freezes the automatic cycle.

use std::collections::HashMap;

use log::debug;

use super::scenario::ScenarioKind;
use super::types::{Axis, SignalState};

/// Green time used when a scenario does not provide one
pub const DEFAULT_GREEN_SECS: f64 = 5.0;
/// Amber time used when a scenario does not provide one
pub const DEFAULT_AMBER_SECS: f64 = 2.0;
/// RED/RED clearance before the waiting axis turns green
pub const CLEARANCE_SECS: f64 = 1.0;
/// Interval between blink phase toggles in night mode
pub const BLINK_INTERVAL_SECS: f64 = 0.5;

/// Duration of each signal state, in simulated seconds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightDurations(HashMap<SignalState, f64>);

impl LightDurations {
    pub fn new(entries: &[(SignalState, f64)]) -> Self {
        Self(entries.iter().copied().collect())
    }

    pub fn get(&self, state: SignalState) -> Option<f64> {
        self.0.get(&state).copied()
    }

    pub fn green(&self) -> f64 {
        self.get(SignalState::Green).unwrap_or(DEFAULT_GREEN_SECS)
    }

    pub fn amber(&self) -> f64 {
        self.get(SignalState::Amber).unwrap_or(DEFAULT_AMBER_SECS)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A transition of the signal heads, reported back to the engine for logging
#[derive(Debug, Clone, PartialEq)]
pub struct SignalChange {
    pub description: &'static str,
    pub ns: SignalState,
    pub eo: SignalState,
}

impl SignalChange {
    /// "NS:<state>, EO:<state>"
    pub fn state_label(&self) -> String {
        format!("NS:{}, EO:{}", self.ns, self.eo)
    }
}

/// The signal controller for the single junction
#[derive(Debug, Clone)]
pub struct TrafficLightController {
    ns: SignalState,
    eo: SignalState,
    active_phase: Axis,
    last_change: f64,
    manual_mode: bool,
    blink_phase: bool,
    last_blink: f64,
}

impl Default for TrafficLightController {
    fn default() -> Self {
        Self::new()
    }
}

impl TrafficLightController {
    /// NS held at RED, EO at GREEN, automatic mode
    pub fn new() -> Self {
        Self {
            ns: SignalState::Red,
            eo: SignalState::Green,
            active_phase: Axis::EastWest,
            last_change: 0.0,
            manual_mode: false,
            blink_phase: true,
            last_blink: 0.0,
        }
    }

    pub fn ns(&self) -> SignalState {
        self.ns
    }

    pub fn eo(&self) -> SignalState {
        self.eo
    }

    pub fn state_of(&self, axis: Axis) -> SignalState {
        match axis {
            Axis::NorthSouth => self.ns,
            Axis::EastWest => self.eo,
        }
    }

    pub fn active_phase(&self) -> Axis {
        self.active_phase
    }

    pub fn is_manual(&self) -> bool {
        self.manual_mode
    }

    pub fn blink_phase(&self) -> bool {
        self.blink_phase
    }

    pub fn last_change(&self) -> f64 {
        self.last_change
    }

    fn set_state(&mut self, axis: Axis, state: SignalState) {
        match axis {
            Axis::NorthSouth => self.ns = state,
            Axis::EastWest => self.eo = state,
        }
    }

    fn change(&self, description: &'static str) -> SignalChange {
        SignalChange {
            description,
            ns: self.ns,
            eo: self.eo,
        }
    }

    /// Advance the controller by one tick.
    ///
    /// Returns the transition that happened, if any.
    pub fn advance(
        &mut self,
        durations: &LightDurations,
        scenario: ScenarioKind,
        now: f64,
    ) -> Option<SignalChange> {
        if scenario == ScenarioKind::Night {
            return self.advance_night(now);
        }

        if self.ns == SignalState::FlashingAmber || self.eo == SignalState::FlashingAmber {
            return Some(self.reinstate_phase(now));
        }

        if self.manual_mode {
            return None;
        }

        let active = self.active_phase;
        let elapsed = now - self.last_change;
        let change = match self.state_of(active) {
            SignalState::Green if elapsed >= durations.green() => {
                self.set_state(active, SignalState::Amber);
                self.last_change = now;
                Some(self.change(match active {
                    Axis::NorthSouth => "NS turns AMBER",
                    Axis::EastWest => "EO turns AMBER",
                }))
            }
            SignalState::Amber if elapsed >= durations.amber() => {
                self.set_state(active, SignalState::Red);
                self.last_change = now;
                Some(self.change(match active {
                    Axis::NorthSouth => "NS turns RED",
                    Axis::EastWest => "EO turns RED",
                }))
            }
            SignalState::Red if elapsed >= CLEARANCE_SECS => {
                let next = active.other();
                self.active_phase = next;
                self.set_state(next, SignalState::Green);
                self.last_change = now;
                Some(self.change(match next {
                    Axis::NorthSouth => "NS turns GREEN",
                    Axis::EastWest => "EO turns GREEN",
                }))
            }
            _ => None,
        };

        debug_assert!(
            !(self.ns.is_permissive() && self.eo.is_permissive()),
            "both axes permissive: NS={} EO={}",
            self.ns,
            self.eo
        );

        if let Some(change) = &change {
            debug!("Signal change: {} ({})", change.description, change.state_label());
        }
        change
    }

    fn advance_night(&mut self, now: f64) -> Option<SignalChange> {
        if now - self.last_blink > BLINK_INTERVAL_SECS {
            self.blink_phase = !self.blink_phase;
            self.last_blink = now;
        }

        if self.ns == SignalState::FlashingAmber && self.eo == SignalState::FlashingAmber {
            return None;
        }
        self.ns = SignalState::FlashingAmber;
        self.eo = SignalState::FlashingAmber;
        self.last_change = now;
        Some(self.change("Night mode flashing amber"))
    }

    /// Leaving night mode: the active axis gets green back, the other red
    fn reinstate_phase(&mut self, now: f64) -> SignalChange {
        let active = self.active_phase;
        self.set_state(active, SignalState::Green);
        self.set_state(active.other(), SignalState::Red);
        self.last_change = now;
        self.change("Signal cycle resumed")
    }

    /// Force an immediate swap of the phases and freeze automatic control
    pub fn manual_change(&mut self, now: f64) -> SignalChange {
        self.manual_mode = true;

        let next = self.active_phase.other();
        self.set_state(self.active_phase, SignalState::Red);
        self.set_state(next, SignalState::Green);
        self.active_phase = next;
        self.last_change = now;

        self.change("Manual change")
    }

    /// Resume automatic phase advancement. Does not force a transition.
    pub fn set_auto_mode(&mut self) {
        self.manual_mode = false;
    }

    /// Restart the timer of the current signal state
    pub fn restart_phase_timer(&mut self, now: f64) {
        self.last_change = now;
    }

    /// Back to the default state, with the phase timer starting at `now`
    pub fn reset(&mut self, now: f64) {
        *self = Self::new();
        self.last_change = now;
        self.last_blink = now;
    }
}
