//! Standalone intersection simulation module
//!
//! This module contains the signal controller, the scenario policies, the
//! vehicle model and the collision checks, tied together by the engine. It
//! runs without any renderer and can be driven from the console.

mod collision;
mod control;
mod engine;
mod events;
mod scenario;
mod traffic_light;
mod types;
mod vehicle;

pub use collision::{CollisionDetector, CollisionEvent, ScanReport, ViolationEvent};
pub use control::{ControlCommand, ScheduledCommand};
pub use engine::{EngineSnapshot, RunState, SimulationEngine, VehicleSnapshot};
pub use events::{
    ChannelSink, EventCategory, EventSink, FieldValue, LogSink, MemorySink, NullSink, SimEvent,
    DEFAULT_QUEUE_CAPACITY,
};
pub use scenario::{
    NightMode, NormalTraffic, RushHour, ScenarioConfig, ScenarioKind, ScenarioPolicy,
};
pub use traffic_light::{
    LightDurations, SignalChange, TrafficLightController, BLINK_INTERVAL_SECS, CLEARANCE_SECS,
    DEFAULT_AMBER_SECS, DEFAULT_GREEN_SECS,
};
pub use types::{
    Action, Axis, Direction, Position, SignalState, VehicleId, COLLISION_DISTANCE,
    DEFAULT_MAX_SPEED, FOLLOWING_THRESHOLD, INTERSECTION_FOOTPRINT, LEADER_CRAWL_SPEED,
    VIOLATION_COOLDOWN, VISIBLE_BOUND,
};
pub use vehicle::{SimVehicle, VehicleTransition};
