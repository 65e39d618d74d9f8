//! Vehicle kinematics for the intersection simulation
//!
//! A vehicle only holds plain kinematic state. Anything that draws it maps
//! the id to its own handle.

use ordered_float::OrderedFloat;

use super::types::{
    Action, Direction, Position, VehicleId, DEFAULT_MAX_SPEED, FOLLOWING_THRESHOLD, VISIBLE_BOUND,
};

/// Fraction of top speed a stopped vehicle pulls away with when told to slow
const CREEP_FACTOR: f32 = 0.3;
/// Fraction of top speed a moving vehicle drops to when told to slow
const SLOW_FACTOR: f32 = 0.4;
/// Floor for the slowed speed so repeated slow decisions never reach zero
const SLOW_FLOOR: f32 = 0.3;

/// A state change worth reporting to the event sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleTransition {
    Halted,
    Resumed,
}

/// A vehicle travelling on one straight lane through the junction
#[derive(Debug, Clone)]
pub struct SimVehicle {
    pub id: VehicleId,
    pub direction: Direction,
    pub position: Position,
    pub speed: f32,
    pub max_speed: f32,
    pub stopped: bool,
    /// Gap the driver tries to keep to the vehicle ahead, fixed at spawn
    pub safety_distance: f32,
}

impl SimVehicle {
    /// Create a vehicle at its direction's spawn point, moving at top speed
    pub fn new(id: VehicleId, direction: Direction, safety_distance: f32) -> Self {
        Self {
            id,
            direction,
            position: direction.spawn_point(),
            speed: DEFAULT_MAX_SPEED,
            max_speed: DEFAULT_MAX_SPEED,
            stopped: false,
            safety_distance,
        }
    }

    /// Place the vehicle somewhere else on its lane
    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Halt the vehicle. Returns true only when it was moving before.
    pub fn stop(&mut self) -> bool {
        if self.stopped {
            return false;
        }
        self.stopped = true;
        self.speed = 0.0;
        true
    }

    /// Resume at top speed. Returns true when the vehicle was stopped.
    pub fn accelerate(&mut self) -> bool {
        let resumed = self.stopped;
        self.stopped = false;
        self.speed = self.max_speed;
        resumed
    }

    pub fn slow_down(&mut self) {
        if self.stopped {
            self.stopped = false;
            self.speed = self.max_speed * CREEP_FACTOR;
        } else {
            self.speed = SLOW_FLOOR.max(self.max_speed * SLOW_FACTOR);
        }
    }

    /// Apply a policy decision and report the resulting transition, if any
    pub fn apply(&mut self, action: Action) -> Option<VehicleTransition> {
        match action {
            Action::Accelerate => self.accelerate().then_some(VehicleTransition::Resumed),
            Action::Slow => {
                self.slow_down();
                None
            }
            Action::Stop => self.stop().then_some(VehicleTransition::Halted),
        }
    }

    /// Advance one tick along the lane.
    ///
    /// Returns true if the vehicle left the visible area and was wrapped back
    /// to its spawn point.
    pub fn move_forward(&mut self) -> bool {
        if !self.stopped {
            let (dx, dy) = self.direction.unit_vector();
            self.position.x += dx * self.speed;
            self.position.y += dy * self.speed;
        }

        if self.position.x.abs() > VISIBLE_BOUND || self.position.y.abs() > VISIBLE_BOUND {
            self.position = self.direction.spawn_point();
            return true;
        }
        false
    }

    /// True if `other` is strictly ahead of this vehicle along its direction
    pub fn is_behind(&self, other: &SimVehicle) -> bool {
        match self.direction {
            Direction::East => self.position.x < other.position.x,
            Direction::West => self.position.x > other.position.x,
            Direction::North => self.position.y < other.position.y,
            Direction::South => self.position.y > other.position.y,
        }
    }

    /// Nearest same-lane vehicle ahead, with its distance, however far away
    pub fn nearest_leader<'a>(&self, vehicles: &'a [SimVehicle]) -> Option<(&'a SimVehicle, f32)> {
        vehicles
            .iter()
            .filter(|other| other.id != self.id && other.direction == self.direction)
            .filter(|other| self.is_behind(other))
            .map(|other| (other, self.position.distance(&other.position)))
            .min_by_key(|(_, distance)| OrderedFloat(*distance))
    }

    /// The vehicle ahead that blocks this one, if it is within following range
    pub fn check_vehicle_ahead<'a>(&self, vehicles: &'a [SimVehicle]) -> Option<&'a SimVehicle> {
        self.nearest_leader(vehicles)
            .filter(|(_, distance)| *distance < FOLLOWING_THRESHOLD)
            .map(|(leader, _)| leader)
    }

    pub fn heading_degrees(&self) -> f32 {
        self.direction.heading_degrees()
    }
}
