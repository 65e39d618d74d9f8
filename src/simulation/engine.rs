//! Simulation engine that ties everything together
//!
//! Owns the signal controller, the active scenario policy, the live vehicles
//! and the collision detector, and runs one discrete tick at a time. Events
//! go to the attached sink and are never read back.

use log::{debug, info, trace, warn};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use serde::Serialize;

use super::collision::{CollisionDetector, ScanReport};
use super::events::{EventCategory, EventSink, SimEvent};
use super::scenario::{ScenarioKind, ScenarioPolicy};
use super::traffic_light::{SignalChange, TrafficLightController};
use super::types::{Action, Direction, Position, SignalState, VehicleId, LEADER_CRAWL_SPEED};
use super::vehicle::{SimVehicle, VehicleTransition};

/// Whether ticks currently do anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Stopped,
    Running,
    Paused,
}

impl RunState {
    pub fn label(self) -> &'static str {
        match self {
            RunState::Stopped => "stopped",
            RunState::Running => "running",
            RunState::Paused => "paused",
        }
    }
}

/// Read-only view of one vehicle for renderers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    pub direction: Direction,
    pub position: Position,
    pub heading: f32,
    pub speed: f32,
    pub stopped: bool,
}

/// Read-only view of the whole engine, taken between ticks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineSnapshot {
    pub time: f64,
    pub run_state: RunState,
    pub scenario: &'static str,
    pub ns: SignalState,
    pub eo: SignalState,
    pub blink_phase: bool,
    pub manual_mode: bool,
    pub vehicles: Vec<VehicleSnapshot>,
    pub collisions: u32,
    pub violations: u32,
}

/// The simulation of the single junction
pub struct SimulationEngine {
    controller: TrafficLightController,

    scenario: Box<dyn ScenarioPolicy>,

    /// Live vehicles in insertion order
    vehicles: Vec<SimVehicle>,

    detector: CollisionDetector,

    run_state: RunState,

    /// Next ID to assign
    next_id: u64,

    /// Sim time of the last spawn
    last_spawn: f64,

    /// Simulation time in seconds
    time: f64,

    /// Optional seeded RNG for reproducible simulations
    rng: Option<StdRng>,

    sink: Box<dyn EventSink>,
}

impl SimulationEngine {
    fn new_internal(kind: ScenarioKind, sink: Box<dyn EventSink>, rng: Option<StdRng>) -> Self {
        let mut engine = Self {
            controller: TrafficLightController::new(),
            scenario: kind.into_policy(),
            vehicles: Vec::new(),
            detector: CollisionDetector::new(),
            run_state: RunState::Stopped,
            next_id: 1,
            last_spawn: 0.0,
            time: 0.0,
            rng,
            sink,
        };

        engine.record(
            SimEvent::new(0.0, EventCategory::System, "Traffic light initialised")
                .with("signal", engine.signal_label()),
        );
        engine.spawn_initial_vehicles();
        engine.record(
            SimEvent::new(0.0, EventCategory::System, "Simulation initialised")
                .with("scenario", engine.scenario.name()),
        );
        engine
    }

    /// Create an engine with its initial batch of vehicles
    pub fn new(kind: ScenarioKind, sink: Box<dyn EventSink>) -> Self {
        Self::new_internal(kind, sink, None)
    }

    /// Create an engine with a seeded RNG for reproducible simulations
    pub fn new_with_seed(kind: ScenarioKind, sink: Box<dyn EventSink>, seed: u64) -> Self {
        Self::new_internal(kind, sink, Some(StdRng::seed_from_u64(seed)))
    }

    fn record(&self, event: SimEvent) {
        self.sink.record(event);
    }

    fn next_vehicle_id(&mut self) -> VehicleId {
        let id = VehicleId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Pick a direction uniformly, using the seeded RNG if available
    fn random_direction(&mut self) -> Direction {
        let choice = match &mut self.rng {
            Some(rng) => Direction::ALL.choose(rng).copied(),
            None => Direction::ALL.choose(&mut rand::rng()).copied(),
        };
        choice.unwrap_or(Direction::East)
    }

    fn spawn_vehicle(&mut self, direction: Direction) -> VehicleId {
        let id = self.next_vehicle_id();
        let vehicle = SimVehicle::new(id, direction, self.scenario.config().safety_distance);
        debug!("Spawned vehicle {} heading {}", id, direction);
        self.record(
            SimEvent::new(self.time, EventCategory::Vehicle, "Vehicle created")
                .with("vehicle_id", id)
                .at(vehicle.position)
                .with("speed", vehicle.speed),
        );
        self.vehicles.push(vehicle);
        id
    }

    /// Initial batch, directions cycling EAST, WEST, NORTH, SOUTH
    fn spawn_initial_vehicles(&mut self) {
        let target = self.scenario.config().target_vehicle_count;
        for direction in Direction::ALL.iter().cycle().take(target) {
            self.spawn_vehicle(*direction);
        }
    }

    /// Add random-direction vehicles or retire the newest ones until the
    /// live count matches the scenario's target
    fn reconcile_vehicle_count(&mut self) {
        let target = self.scenario.config().target_vehicle_count;

        while self.vehicles.len() < target {
            let direction = self.random_direction();
            self.spawn_vehicle(direction);
        }

        while self.vehicles.len() > target {
            if let Some(vehicle) = self.vehicles.pop() {
                debug!("Retired vehicle {}", vehicle.id);
                self.record(
                    SimEvent::new(self.time, EventCategory::Vehicle, "Vehicle retired")
                        .with("vehicle_id", vehicle.id),
                );
            }
        }
    }

    /// Insert a vehicle at an arbitrary spot on its lane.
    ///
    /// Used to set up situations directly; the vehicle gets a fresh id and the
    /// active scenario's safety distance.
    pub fn place_vehicle(&mut self, direction: Direction, position: Position) -> VehicleId {
        let id = self.next_vehicle_id();
        let vehicle =
            SimVehicle::new(id, direction, self.scenario.config().safety_distance).at(position);
        self.vehicles.push(vehicle);
        id
    }

    /// Remove every vehicle without touching anything else
    pub fn clear_vehicles(&mut self) {
        self.vehicles.clear();
    }

    pub fn start(&mut self) {
        if self.run_state == RunState::Stopped {
            self.run_state = RunState::Running;
            info!("Simulation started ({})", self.scenario.name());
            self.record(SimEvent::new(self.time, EventCategory::System, "Simulation started"));
        }
    }

    /// Toggle pause, or start the simulation if it is not running
    pub fn pause(&mut self) {
        match self.run_state {
            RunState::Stopped => self.start(),
            RunState::Paused => {
                self.run_state = RunState::Running;
                info!("Simulation resumed");
                self.record(SimEvent::new(self.time, EventCategory::System, "Simulation resumed"));
            }
            RunState::Running => {
                self.run_state = RunState::Paused;
                info!("Simulation paused");
                self.record(SimEvent::new(self.time, EventCategory::System, "Simulation paused"));
            }
        }
    }

    pub fn stop(&mut self) {
        if self.run_state != RunState::Stopped {
            self.run_state = RunState::Stopped;
            info!("Simulation stopped");
            self.record(SimEvent::new(self.time, EventCategory::System, "Simulation stopped"));
        }
    }

    /// Clear all vehicles, put the lights back to their default state and stop.
    /// Vehicle ids keep counting from where they were.
    pub fn reset(&mut self) {
        self.vehicles.clear();
        self.controller.reset(self.time);
        self.detector.reset_counters();
        self.run_state = RunState::Stopped;
        info!("Simulation reset");
        self.record(SimEvent::new(self.time, EventCategory::System, "Simulation reset"));
    }

    /// Swap the active scenario, return the lights to automatic mode and
    /// reconcile the vehicle count with the new target
    pub fn change_scenario(&mut self, kind: ScenarioKind) {
        let previous = self.scenario.name();
        self.scenario = kind.into_policy();
        self.controller.restart_phase_timer(self.time);
        self.set_auto_mode();
        self.reconcile_vehicle_count();

        info!("Scenario changed from {} to {}", previous, self.scenario.name());
        self.record(
            SimEvent::new(self.time, EventCategory::System, "Scenario changed")
                .with("scenario", self.scenario.name()),
        );
    }

    pub fn manual_light_change(&mut self) {
        let change = self.controller.manual_change(self.time);
        info!("Manual light change ({})", change.state_label());
        self.record_signal_change(&change);
    }

    pub fn set_auto_mode(&mut self) {
        self.controller.set_auto_mode();
        self.record(SimEvent::new(self.time, EventCategory::System, "Automatic mode"));
    }

    fn record_signal_change(&self, change: &SignalChange) {
        self.record(
            SimEvent::new(self.time, EventCategory::Signal, change.description)
                .with("signal", change.state_label()),
        );
    }

    fn record_transition(
        &self,
        vehicle: &SimVehicle,
        transition: VehicleTransition,
        signal: Option<SignalState>,
    ) {
        let description = match transition {
            VehicleTransition::Halted => "Vehicle halted",
            VehicleTransition::Resumed => "Vehicle resumed",
        };
        let mut event = SimEvent::new(self.time, EventCategory::Vehicle, description)
            .with("vehicle_id", vehicle.id)
            .at(vehicle.position)
            .with("speed", vehicle.speed);
        if let Some(signal) = signal {
            event = event.with("signal", signal.label());
        }
        self.record(event);
    }

    fn record_scan(&self, report: &ScanReport) {
        for collision in &report.collisions {
            warn!(
                "Collision between {} and {} at ({:.1}, {:.1})",
                collision.first, collision.second, collision.midpoint.x, collision.midpoint.y
            );
            self.record(
                SimEvent::new(self.time, EventCategory::Collision, "Collision detected")
                    .with("vehicle_id", collision.first)
                    .with("other_vehicle_id", collision.second)
                    .at(collision.midpoint)
                    .with("speed", 0.0f32),
            );
        }

        for (id, position) in &report.halted {
            self.record(
                SimEvent::new(self.time, EventCategory::Vehicle, "Vehicle halted")
                    .with("vehicle_id", *id)
                    .at(*position)
                    .with("speed", 0.0f32),
            );
        }

        for violation in &report.violations {
            debug!(
                "Safety distance violated by {}: {:.1} < {:.1}",
                violation.follower, violation.gap, violation.required
            );
            self.record(
                SimEvent::new(self.time, EventCategory::Violation, "Safety distance violated")
                    .with("vehicle_id", violation.follower)
                    .with("leader_id", violation.leader)
                    .at(violation.position)
                    .with("gap", violation.gap),
            );
        }
    }

    /// Decide what the vehicle at `index` does this tick.
    ///
    /// A blocking vehicle ahead takes priority; the scenario policy is only
    /// consulted when the lane is clear. Returns the action and the signal
    /// that was read, if any.
    fn resolve_action(&self, index: usize) -> (Action, Option<SignalState>) {
        let vehicle = &self.vehicles[index];

        if let Some(leader) = vehicle.check_vehicle_ahead(&self.vehicles) {
            let action = if leader.stopped || leader.speed < LEADER_CRAWL_SPEED {
                Action::Stop
            } else {
                Action::Slow
            };
            return (action, None);
        }

        let signal = self.controller.state_of(vehicle.direction.axis());
        (self.scenario.decide(vehicle, signal), Some(signal))
    }

    /// Main simulation tick
    pub fn tick(&mut self, delta_secs: f64) {
        if self.run_state != RunState::Running {
            return;
        }
        self.time += delta_secs;
        trace!("Tick at {:.2}s with {} vehicles", self.time, self.vehicles.len());

        // Spawn
        if self.scenario.should_spawn(self.last_spawn, self.time)
            && self.vehicles.len() < self.scenario.config().target_vehicle_count
        {
            let direction = self.random_direction();
            self.spawn_vehicle(direction);
            self.last_spawn = self.time;
        }

        // Lights
        let kind = self.scenario.kind();
        if let Some(change) =
            self.controller
                .advance(&self.scenario.config().light_durations, kind, self.time)
        {
            self.record_signal_change(&change);
        }

        // Collisions
        let report = self.detector.scan(&mut self.vehicles, self.time);
        self.record_scan(&report);

        // Decide, apply and move each vehicle in insertion order. Later
        // vehicles see the positions earlier ones reached this tick.
        for index in 0..self.vehicles.len() {
            let (action, signal) = self.resolve_action(index);

            let transition = self.vehicles[index].apply(action);
            if let Some(transition) = transition {
                self.record_transition(&self.vehicles[index], transition, signal);
            }

            if self.vehicles[index].move_forward() {
                let vehicle = &self.vehicles[index];
                self.record(
                    SimEvent::new(self.time, EventCategory::Vehicle, "Vehicle respawned")
                        .with("vehicle_id", vehicle.id)
                        .at(vehicle.position),
                );
            }
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }

    pub fn scenario(&self) -> &dyn ScenarioPolicy {
        self.scenario.as_ref()
    }

    pub fn scenario_name(&self) -> &'static str {
        self.scenario.name()
    }

    pub fn controller(&self) -> &TrafficLightController {
        &self.controller
    }

    pub fn vehicles(&self) -> &[SimVehicle] {
        &self.vehicles
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&SimVehicle> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    pub fn collision_count(&self) -> u32 {
        self.detector.collision_count()
    }

    pub fn violation_count(&self) -> u32 {
        self.detector.violation_count()
    }

    fn signal_label(&self) -> String {
        format!("NS:{}, EO:{}", self.controller.ns(), self.controller.eo())
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            time: self.time,
            run_state: self.run_state,
            scenario: self.scenario.name(),
            ns: self.controller.ns(),
            eo: self.controller.eo(),
            blink_phase: self.controller.blink_phase(),
            manual_mode: self.controller.is_manual(),
            vehicles: self
                .vehicles
                .iter()
                .map(|v| VehicleSnapshot {
                    id: v.id,
                    direction: v.direction,
                    position: v.position,
                    heading: v.heading_degrees(),
                    speed: v.speed,
                    stopped: v.stopped,
                })
                .collect(),
            collisions: self.collision_count(),
            violations: self.violation_count(),
        }
    }

    /// One-line status, as shown next to the control buttons
    pub fn status_line(&self) -> String {
        format!(
            "Scenario: {} | State: {} | Vehicles: {} | Lights: {} | Collisions: {} | Violations: {}",
            self.scenario.name(),
            self.run_state.label(),
            self.vehicles.len(),
            self.signal_label(),
            self.collision_count(),
            self.violation_count()
        )
    }

    /// Print a summary of the engine state
    pub fn print_summary(&self) {
        println!("=== Intersection Simulation Summary ===");
        println!("Time: {:.2}s", self.time);
        println!("{}", self.status_line());
        println!(
            "Active phase: {} ({})",
            self.controller.active_phase().label(),
            if self.controller.is_manual() { "manual" } else { "auto" }
        );

        if !self.vehicles.is_empty() {
            println!("--- Vehicles ---");
            for vehicle in &self.vehicles {
                println!(
                    "  Vehicle {}: {} speed={:.1}, position=({:.1}, {:.1}){}",
                    vehicle.id,
                    vehicle.direction,
                    vehicle.speed,
                    vehicle.position.x,
                    vehicle.position.y,
                    if vehicle.stopped { " [stopped]" } else { "" }
                );
            }
        }
    }

    /// Draw the junction and its vehicles in the terminal
    pub fn draw_map(&self) {
        const HALF_WIDTH: f32 = 450.0;
        const COLS: usize = 61;
        const ROWS: usize = 31;

        let to_grid = |position: &Position| -> (usize, usize) {
            let col = ((position.x + HALF_WIDTH) / (2.0 * HALF_WIDTH) * (COLS - 1) as f32).round();
            // Flip y so north is up
            let row = ((HALF_WIDTH - position.y) / (2.0 * HALF_WIDTH) * (ROWS - 1) as f32).round();
            (
                (row.max(0.0) as usize).min(ROWS - 1),
                (col.max(0.0) as usize).min(COLS - 1),
            )
        };

        let mut grid = vec![vec![' '; COLS]; ROWS];
        let (center_row, center_col) = to_grid(&Position::default());

        // Roads
        for cell in grid[center_row].iter_mut() {
            *cell = '-';
        }
        for row in grid.iter_mut() {
            row[center_col] = '|';
        }
        grid[center_row][center_col] = '+';

        // Vehicles
        for vehicle in &self.vehicles {
            let (row, col) = to_grid(&vehicle.position);
            grid[row][col] = match (vehicle.stopped, vehicle.direction) {
                (true, _) => 'X',
                (false, Direction::East) => '>',
                (false, Direction::West) => '<',
                (false, Direction::North) => '^',
                (false, Direction::South) => 'v',
            };
        }

        println!("\n=== Junction Map ===");
        println!(
            "Legend: >/</^/v=Moving vehicle, X=Stopped vehicle | NS: {} EO: {}",
            self.controller.ns(),
            self.controller.eo()
        );
        println!();
        for row in &grid {
            let line: String = row.iter().collect();
            println!("{}", line);
        }
        println!();
    }
}
