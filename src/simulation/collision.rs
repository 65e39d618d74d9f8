//! Pairwise collision and safety-distance checks

use super::types::{
    Position, VehicleId, COLLISION_DISTANCE, INTERSECTION_FOOTPRINT, VIOLATION_COOLDOWN,
};
use super::vehicle::SimVehicle;

/// Two vehicles closer than the collision distance
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionEvent {
    pub first: VehicleId,
    pub second: VehicleId,
    pub midpoint: Position,
    pub distance: f32,
}

/// A follower closer to its leader than its safety distance allows
#[derive(Debug, Clone, PartialEq)]
pub struct ViolationEvent {
    pub follower: VehicleId,
    pub leader: VehicleId,
    pub position: Position,
    pub gap: f32,
    pub required: f32,
}

/// Everything one scan found
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    pub collisions: Vec<CollisionEvent>,
    pub violations: Vec<ViolationEvent>,
    /// Vehicles that went from moving to stopped because of a collision,
    /// with the position they stopped at
    pub halted: Vec<(VehicleId, Position)>,
}

impl ScanReport {
    pub fn is_empty(&self) -> bool {
        self.collisions.is_empty() && self.violations.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct CollisionDetector {
    distance_threshold: f32,
    collision_count: u32,
    violation_count: u32,
    last_violation: Option<f64>,
}

impl Default for CollisionDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionDetector {
    pub fn new() -> Self {
        Self::with_threshold(COLLISION_DISTANCE)
    }

    pub fn with_threshold(distance_threshold: f32) -> Self {
        Self {
            distance_threshold,
            collision_count: 0,
            violation_count: 0,
            last_violation: None,
        }
    }

    pub fn collision_count(&self) -> u32 {
        self.collision_count
    }

    pub fn violation_count(&self) -> u32 {
        self.violation_count
    }

    pub fn reset_counters(&mut self) {
        self.collision_count = 0;
        self.violation_count = 0;
        self.last_violation = None;
    }

    /// Whether a close pair is at risk. Vehicles on perpendicular approaches
    /// only conflict once both are inside the junction footprint.
    fn conflicts(a: &SimVehicle, b: &SimVehicle) -> bool {
        a.direction == b.direction
            || (a.position.within_box(INTERSECTION_FOOTPRINT)
                && b.position.within_box(INTERSECTION_FOOTPRINT))
    }

    /// Check every unordered pair once, stop colliding vehicles, and report
    /// safety-distance violations.
    pub fn scan(&mut self, vehicles: &mut [SimVehicle], now: f64) -> ScanReport {
        let mut report = ScanReport::default();

        for i in 0..vehicles.len() {
            for j in (i + 1)..vehicles.len() {
                let distance = vehicles[i].position.distance(&vehicles[j].position);
                if distance >= self.distance_threshold || !Self::conflicts(&vehicles[i], &vehicles[j]) {
                    continue;
                }

                self.collision_count += 1;
                report.collisions.push(CollisionEvent {
                    first: vehicles[i].id,
                    second: vehicles[j].id,
                    midpoint: vehicles[i].position.midpoint(&vehicles[j].position),
                    distance,
                });

                for k in [i, j] {
                    if vehicles[k].stop() {
                        report.halted.push((vehicles[k].id, vehicles[k].position));
                    }
                }
            }
        }

        self.check_safety_distances(vehicles, now, &mut report);
        report
    }

    fn check_safety_distances(&mut self, vehicles: &[SimVehicle], now: f64, report: &mut ScanReport) {
        for follower in vehicles {
            let Some((leader, gap)) = follower.nearest_leader(vehicles) else {
                continue;
            };
            if gap < self.distance_threshold || gap >= follower.safety_distance {
                continue;
            }
            if self
                .last_violation
                .is_some_and(|last| now - last < VIOLATION_COOLDOWN)
            {
                continue;
            }

            self.last_violation = Some(now);
            self.violation_count += 1;
            report.violations.push(ViolationEvent {
                follower: follower.id,
                leader: leader.id,
                position: follower.position,
                gap,
                required: follower.safety_distance,
            });
        }
    }
}
