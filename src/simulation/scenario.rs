//! Scenario policies
//!
//! A scenario bundles the light timings, the traffic density and the rule a
//! driver follows when no vehicle ahead is in the way. The engine holds one
//! boxed policy at a time and swaps the whole object on a scenario change.

use std::fmt;
use std::str::FromStr;

use super::traffic_light::LightDurations;
use super::types::{Action, SignalState};
use super::vehicle::SimVehicle;

/// The named scenarios that can be selected at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioKind {
    Normal,
    RushHour,
    Night,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 3] = [ScenarioKind::Normal, ScenarioKind::RushHour, ScenarioKind::Night];

    pub fn display_name(self) -> &'static str {
        match self {
            ScenarioKind::Normal => "Normal traffic",
            ScenarioKind::RushHour => "Rush hour",
            ScenarioKind::Night => "Night mode",
        }
    }

    /// Build a fresh policy object for this scenario
    pub fn into_policy(self) -> Box<dyn ScenarioPolicy> {
        match self {
            ScenarioKind::Normal => Box::new(NormalTraffic::new()),
            ScenarioKind::RushHour => Box::new(RushHour::new()),
            ScenarioKind::Night => Box::new(NightMode::new()),
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ScenarioKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(ScenarioKind::Normal),
            "rush-hour" | "rush_hour" | "rushhour" => Ok(ScenarioKind::RushHour),
            "night" => Ok(ScenarioKind::Night),
            other => Err(format!(
                "unknown scenario '{other}' (expected normal, rush-hour or night)"
            )),
        }
    }
}

/// Fixed configuration values of a scenario
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioConfig {
    pub light_durations: LightDurations,
    pub target_vehicle_count: usize,
    /// Simulated seconds between two spawns
    pub spawn_interval: f64,
    /// Safety distance handed to every vehicle spawned under this scenario
    pub safety_distance: f32,
}

/// Shared contract of the scenario variants
pub trait ScenarioPolicy: fmt::Debug + Send {
    fn kind(&self) -> ScenarioKind;

    fn config(&self) -> &ScenarioConfig;

    /// Decide what a vehicle does given the signal governing its lane.
    ///
    /// Only consulted when no vehicle ahead blocks the lane.
    fn decide(&self, vehicle: &SimVehicle, signal: SignalState) -> Action;

    fn name(&self) -> &'static str {
        self.kind().display_name()
    }

    fn should_spawn(&self, last_spawn: f64, now: f64) -> bool {
        now - last_spawn > self.config().spawn_interval
    }
}

/// Regular traffic with strict stop-line discipline
#[derive(Debug, Clone)]
pub struct NormalTraffic {
    config: ScenarioConfig,
}

impl NormalTraffic {
    /// Half-width of the junction box where a vehicle never stops
    pub const INTERSECTION_ZONE: f32 = 50.0;
    /// Beyond this distance from the centre the signal is not evaluated
    pub const DECISION_DISTANCE: f32 = 100.0;
    /// On amber, vehicles still farther than this stop; closer ones clear
    pub const AMBER_STOP_DISTANCE: f32 = 80.0;

    pub fn new() -> Self {
        Self {
            config: ScenarioConfig {
                light_durations: LightDurations::new(&[
                    (SignalState::Red, 4.0),
                    (SignalState::Green, 6.0),
                    (SignalState::Amber, 2.0),
                ]),
                target_vehicle_count: 5,
                spawn_interval: 4.0,
                safety_distance: 40.0,
            },
        }
    }
}

impl Default for NormalTraffic {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioPolicy for NormalTraffic {
    fn kind(&self) -> ScenarioKind {
        ScenarioKind::Normal
    }

    fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    fn decide(&self, vehicle: &SimVehicle, signal: SignalState) -> Action {
        if vehicle.position.within_box(Self::INTERSECTION_ZONE) {
            return Action::Accelerate;
        }

        let distance = vehicle.direction.distance_before_center(&vehicle.position);
        if distance > Self::DECISION_DISTANCE || distance <= Self::INTERSECTION_ZONE {
            // Far upstream, or already past the stop line
            return Action::Accelerate;
        }

        match signal {
            SignalState::Red => Action::Stop,
            SignalState::Amber if distance > Self::AMBER_STOP_DISTANCE => Action::Stop,
            _ => Action::Accelerate,
        }
    }
}

/// Dense traffic with long greens; drivers slow on amber instead of stopping
#[derive(Debug, Clone)]
pub struct RushHour {
    config: ScenarioConfig,
}

impl RushHour {
    pub const INTERSECTION_ZONE: f32 = 60.0;
    /// Vehicles farther than this stop on red
    pub const STOP_DISTANCE: f32 = 70.0;

    pub fn new() -> Self {
        Self {
            config: ScenarioConfig {
                light_durations: LightDurations::new(&[
                    (SignalState::Red, 3.0),
                    (SignalState::Green, 7.0),
                    (SignalState::Amber, 1.0),
                ]),
                target_vehicle_count: 6,
                spawn_interval: 2.5,
                safety_distance: 30.0,
            },
        }
    }
}

impl Default for RushHour {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioPolicy for RushHour {
    fn kind(&self) -> ScenarioKind {
        ScenarioKind::RushHour
    }

    fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    fn decide(&self, vehicle: &SimVehicle, signal: SignalState) -> Action {
        if vehicle.position.within_box(Self::INTERSECTION_ZONE) {
            return Action::Accelerate;
        }

        let distance = vehicle.direction.distance_before_center(&vehicle.position);
        match signal {
            SignalState::Red if distance > Self::STOP_DISTANCE => Action::Stop,
            SignalState::Amber if distance > Self::INTERSECTION_ZONE => Action::Slow,
            _ => Action::Accelerate,
        }
    }
}

/// Sparse night traffic under flashing amber; everyone crawls
#[derive(Debug, Clone)]
pub struct NightMode {
    config: ScenarioConfig,
}

impl NightMode {
    pub fn new() -> Self {
        Self {
            config: ScenarioConfig {
                light_durations: LightDurations::default(),
                target_vehicle_count: 3,
                spawn_interval: 8.0,
                safety_distance: 60.0,
            },
        }
    }
}

impl Default for NightMode {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioPolicy for NightMode {
    fn kind(&self) -> ScenarioKind {
        ScenarioKind::Night
    }

    fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    fn decide(&self, _vehicle: &SimVehicle, _signal: SignalState) -> Action {
        Action::Slow
    }
}
