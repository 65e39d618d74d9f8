//! Simulation events and the sinks that receive them
//!
//! The engine records events fire-and-forget: `EventSink::record` returns
//! nothing, never blocks, and a failing sink never reaches the engine.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use log::{debug, trace, warn};
use serde::Serialize;

use super::types::{Position, VehicleId};

/// Default capacity of the channel between the engine and the writer thread
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Broad class of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCategory {
    System,
    Signal,
    Vehicle,
    Collision,
    Violation,
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EventCategory::System => "SYSTEM",
            EventCategory::Signal => "SIGNAL",
            EventCategory::Vehicle => "VEHICLE",
            EventCategory::Collision => "COLLISION",
            EventCategory::Violation => "VIOLATION",
        };
        f.write_str(label)
    }
}

/// A named scalar attached to an event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(u64),
    Float(f64),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(value) => write!(f, "{value}"),
            FieldValue::Float(value) => write!(f, "{value:.1}"),
            FieldValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<VehicleId> for FieldValue {
    fn from(value: VehicleId) -> Self {
        FieldValue::Int(value.0)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        FieldValue::Float(f64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// One recorded state change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimEvent {
    /// Simulated seconds since the engine was created
    pub sim_time: f64,
    pub category: EventCategory,
    pub description: String,
    pub fields: BTreeMap<&'static str, FieldValue>,
}

impl SimEvent {
    pub fn new(sim_time: f64, category: EventCategory, description: impl Into<String>) -> Self {
        Self {
            sim_time,
            category,
            description: description.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: &'static str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name, value.into());
        self
    }

    /// Attach `x` and `y` fields
    pub fn at(self, position: Position) -> Self {
        self.with("x", position.x).with("y", position.y)
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

impl fmt::Display for SimEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>8.2}s] {} {}", self.sim_time, self.category, self.description)?;
        for (name, value) in &self.fields {
            write!(f, " {name}={value}")?;
        }
        Ok(())
    }
}

/// Receiver of simulation events
pub trait EventSink: Send {
    fn record(&self, event: SimEvent);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _event: SimEvent) {}
}

/// Forwards events to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn record(&self, event: SimEvent) {
        debug!(target: "intersection_sim::events", "{event}");
    }
}

/// Keeps every event in a shared buffer. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<SimEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<SimEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Events of one category whose description matches
    pub fn matching(&self, category: EventCategory, description: &str) -> Vec<SimEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.category == category && event.description == description)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: SimEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Bounded queue in front of a writer thread that stores events as JSON lines.
///
/// When the queue is full the newest event is dropped and counted. Dropping
/// the sink closes the queue and waits for the writer to flush.
pub struct ChannelSink {
    sender: Option<SyncSender<SimEvent>>,
    writer: Option<JoinHandle<()>>,
    dropped: Arc<AtomicU64>,
}

impl ChannelSink {
    pub fn spawn<W>(output: W, capacity: usize) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        let (sender, receiver) = mpsc::sync_channel::<SimEvent>(capacity.max(1));

        let writer = std::thread::Builder::new()
            .name("event-writer".to_string())
            .spawn(move || {
                let mut output = std::io::BufWriter::new(output);
                let mut written = 0u64;
                for event in receiver {
                    match write_line(&mut output, &event) {
                        Ok(()) => written += 1,
                        Err(e) => warn!("Failed to write event: {}", e),
                    }
                }
                debug!("Event writer finished after {} events", written);
            })
            .context("Failed to spawn event writer thread")?;

        Ok(Self {
            sender: Some(sender),
            writer: Some(writer),
            dropped: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Open (truncating) a file and write events to it
    pub fn to_file(path: &std::path::Path, capacity: usize) -> Result<Self> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create event log {}", path.display()))?;
        Self::spawn(file, capacity)
    }

    /// Shared counter of events dropped because the queue was full
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.dropped)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// One JSON object per line, flushed so each line reaches the output whole
fn write_line<W: Write>(output: &mut W, event: &SimEvent) -> std::io::Result<()> {
    serde_json::to_writer(&mut *output, event)?;
    output.write_all(b"\n")?;
    output.flush()
}

impl EventSink for ChannelSink {
    fn record(&self, event: SimEvent) {
        let Some(sender) = &self.sender else {
            return;
        };
        match sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                trace!("Event queue full, dropping: {}", event);
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

impl Drop for ChannelSink {
    fn drop(&mut self) {
        // Closing the queue ends the writer's receive loop
        self.sender.take();
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                warn!("Event writer thread panicked");
            }
        }
    }
}

impl fmt::Debug for ChannelSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSink")
            .field("open", &self.sender.is_some())
            .field("dropped", &self.dropped())
            .finish()
    }
}
