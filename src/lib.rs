//! Intersection Simulation Library
//!
//! Simulates traffic at a single four-way signalized intersection. The
//! engine runs headless; renderers and loggers consume its snapshots and
//! events.

pub mod simulation;
