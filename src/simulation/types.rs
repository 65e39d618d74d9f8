//! Core types for the intersection simulation
//!
//! Plain value types shared by the controller, the scenario policies and the
//! vehicles. Nothing in here knows about rendering or logging.

use serde::Serialize;
use std::fmt;

/// A unique identifier for a vehicle
///
/// Issued by the engine's own counter and never reused, even after the
/// vehicle has been retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VehicleId(pub u64);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Direction of travel. Each direction owns one straight lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    East,
    West,
    North,
    South,
}

impl Direction {
    /// All directions, in the order the initial batch cycles through them
    pub const ALL: [Direction; 4] = [
        Direction::East,
        Direction::West,
        Direction::North,
        Direction::South,
    ];

    /// Where a vehicle heading this way enters the visible area
    pub fn spawn_point(self) -> Position {
        match self {
            Direction::East => Position::new(-420.0, -20.0),
            Direction::West => Position::new(420.0, 20.0),
            Direction::North => Position::new(20.0, -300.0),
            Direction::South => Position::new(-20.0, 300.0),
        }
    }

    /// Unit vector of travel
    pub fn unit_vector(self) -> (f32, f32) {
        match self {
            Direction::East => (1.0, 0.0),
            Direction::West => (-1.0, 0.0),
            Direction::North => (0.0, 1.0),
            Direction::South => (0.0, -1.0),
        }
    }

    /// Heading in degrees, counter-clockwise from east
    pub fn heading_degrees(self) -> f32 {
        match self {
            Direction::East => 0.0,
            Direction::West => 180.0,
            Direction::North => 90.0,
            Direction::South => 270.0,
        }
    }

    /// The signal axis that governs this lane
    pub fn axis(self) -> Axis {
        match self {
            Direction::East | Direction::West => Axis::EastWest,
            Direction::North | Direction::South => Axis::NorthSouth,
        }
    }

    /// Distance still to travel before reaching the centre of the junction,
    /// measured along this direction's axis. Negative once past the centre.
    pub fn distance_before_center(self, position: &Position) -> f32 {
        match self {
            Direction::East => -position.x,
            Direction::West => position.x,
            Direction::North => -position.y,
            Direction::South => position.y,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::East => "EAST",
            Direction::West => "WEST",
            Direction::North => "NORTH",
            Direction::South => "SOUTH",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One of the two perpendicular flows sharing the junction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Axis {
    NorthSouth,
    EastWest,
}

impl Axis {
    pub fn other(self) -> Axis {
        match self {
            Axis::NorthSouth => Axis::EastWest,
            Axis::EastWest => Axis::NorthSouth,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Axis::NorthSouth => "NS",
            Axis::EastWest => "EO",
        }
    }
}

/// State of one axis' signal heads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SignalState {
    Red,
    Amber,
    Green,
    FlashingAmber,
}

impl SignalState {
    pub fn label(self) -> &'static str {
        match self {
            SignalState::Red => "RED",
            SignalState::Amber => "AMBER",
            SignalState::Green => "GREEN",
            SignalState::FlashingAmber => "FLASHING_AMBER",
        }
    }

    /// Green or amber: traffic on this axis may still be entering the junction
    pub fn is_permissive(self) -> bool {
        matches!(self, SignalState::Green | SignalState::Amber)
    }
}

impl fmt::Display for SignalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a vehicle should do this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Accelerate,
    Slow,
    Stop,
}

/// A 2D position in the simulation plane, centred on the junction
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn midpoint(&self, other: &Position) -> Position {
        Position {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }

    /// True if both coordinates lie strictly inside a square of the given
    /// half-width around the centre
    pub fn within_box(&self, half_width: f32) -> bool {
        self.x.abs() < half_width && self.y.abs() < half_width
    }
}

/// Half-width of the visible area; vehicles beyond it wrap to their spawn point
pub const VISIBLE_BOUND: f32 = 450.0;

/// Default top speed of a vehicle in units per tick
pub const DEFAULT_MAX_SPEED: f32 = 2.0;

/// Distance under which a same-lane vehicle ahead pre-empts the signal policy
pub const FOLLOWING_THRESHOLD: f32 = 50.0;

/// A leader slower than this makes its follower stop rather than slow down
pub const LEADER_CRAWL_SPEED: f32 = 0.5;

/// Half-width of the junction footprint used by the collision gate
pub const INTERSECTION_FOOTPRINT: f32 = 70.0;

/// Distance under which two vehicles are considered to have collided
pub const COLLISION_DISTANCE: f32 = 18.0;

/// Minimum simulated seconds between two safety-distance violation events
pub const VIOLATION_COOLDOWN: f64 = 2.0;
