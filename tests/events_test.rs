//! Event recording and sink validation tests

use std::io::{self, Write};
use std::sync::{Arc, Condvar, Mutex};

use intersection_sim::simulation::{
    ChannelSink, EventCategory, EventSink, FieldValue, MemorySink, Position, ScenarioKind,
    SimEvent, SimulationEngine, VehicleId,
};

/// Writer whose bytes stay readable after the sink is gone
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn lines(&self) -> Vec<serde_json::Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).expect("each line is a JSON object"))
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writer that blocks every write until the gate is opened
struct GatedWriter {
    gate: Arc<(Mutex<bool>, Condvar)>,
    inner: SharedBuffer,
}

impl Write for GatedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let (lock, opened) = &*self.gate;
        let mut open = lock.lock().unwrap();
        while !*open {
            open = opened.wait(open).unwrap();
        }
        drop(open);
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn open_gate(gate: &Arc<(Mutex<bool>, Condvar)>) {
    let (lock, opened) = &**gate;
    *lock.lock().unwrap() = true;
    opened.notify_all();
}

fn sample_event(n: u64) -> SimEvent {
    SimEvent::new(n as f64, EventCategory::Vehicle, "Vehicle created").with("vehicle_id", n)
}

#[test]
fn test_event_display() {
    let event = SimEvent::new(1.5, EventCategory::Collision, "Collision detected")
        .with("vehicle_id", VehicleId(3))
        .with("gap", 12.345f32);
    assert_eq!(
        event.to_string(),
        "[    1.50s] COLLISION Collision detected gap=12.3 vehicle_id=3"
    );
}

#[test]
fn test_event_fields() {
    let event = SimEvent::new(2.0, EventCategory::Signal, "Manual change")
        .with("signal", "NS:GREEN, EO:RED")
        .at(Position::new(-20.0, 300.0));

    assert_eq!(event.field("signal"), Some(&FieldValue::Text("NS:GREEN, EO:RED".to_string())));
    assert_eq!(event.field("x"), Some(&FieldValue::Float(-20.0)));
    assert_eq!(event.field("y"), Some(&FieldValue::Float(300.0)));
    assert_eq!(event.field("speed"), None);
}

#[test]
fn test_event_serialization() {
    let event = SimEvent::new(0.5, EventCategory::Violation, "Safety distance violated")
        .with("vehicle_id", VehicleId(4))
        .with("gap", 30.0f32);

    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["sim_time"], 0.5);
    assert_eq!(json["category"], "VIOLATION");
    assert_eq!(json["description"], "Safety distance violated");
    assert_eq!(json["fields"]["vehicle_id"], 4);
    assert_eq!(json["fields"]["gap"], 30.0);
}

#[test]
fn test_memory_sink_clones_share_events() {
    let sink = MemorySink::new();
    let clone = sink.clone();

    clone.record(sample_event(1));
    clone.record(SimEvent::new(1.0, EventCategory::System, "Simulation started"));
    assert_eq!(sink.events().len(), 2);
    assert_eq!(sink.matching(EventCategory::Vehicle, "Vehicle created").len(), 1);
    assert!(sink.matching(EventCategory::System, "Vehicle created").is_empty());

    sink.clear();
    assert!(clone.events().is_empty());
}

#[test]
fn test_channel_sink_writes_json_lines_in_order() {
    let buffer = SharedBuffer::default();
    let sink = ChannelSink::spawn(buffer.clone(), 16).unwrap();

    for n in 1..=3 {
        sink.record(sample_event(n));
    }
    // Dropping waits for the writer to drain the queue
    drop(sink);

    let lines = buffer.lines();
    assert_eq!(lines.len(), 3);
    for (n, line) in (1..=3u64).zip(&lines) {
        assert_eq!(line["fields"]["vehicle_id"], n);
        assert_eq!(line["category"], "VEHICLE");
    }
}

#[test]
fn test_channel_sink_drops_newest_when_full() {
    let gate = Arc::new((Mutex::new(false), Condvar::new()));
    let buffer = SharedBuffer::default();
    let writer = GatedWriter {
        gate: Arc::clone(&gate),
        inner: buffer.clone(),
    };
    let sink = ChannelSink::spawn(writer, 1).unwrap();
    let counter = sink.dropped_counter();

    // The writer holds at most one event while blocked, the queue one more
    for n in 1..=5 {
        sink.record(sample_event(n));
    }
    let dropped = sink.dropped();
    assert!(dropped >= 3, "only {dropped} dropped");

    open_gate(&gate);
    drop(sink);

    let lines = buffer.lines();
    assert_eq!(lines.len() as u64 + dropped, 5);
    assert_eq!(counter.load(std::sync::atomic::Ordering::Relaxed), dropped);
    // The oldest event always survives
    assert_eq!(lines[0]["fields"]["vehicle_id"], 1);
}

#[test]
fn test_channel_sink_to_file() {
    let path = std::env::temp_dir().join(format!("intersection_sim_events_{}.jsonl", std::process::id()));
    let sink = ChannelSink::to_file(&path, 8).unwrap();
    sink.record(sample_event(9));
    drop(sink);

    let content = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();
    let line: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
    assert_eq!(line["description"], "Vehicle created");
    assert_eq!(line["sim_time"], 9.0);
}

#[test]
fn test_channel_sink_bad_path_fails() {
    let path = std::path::Path::new("/nonexistent-dir/intersection_sim/events.jsonl");
    assert!(ChannelSink::to_file(path, 8).is_err());
}

#[test]
fn test_engine_events_reach_channel_sink() {
    let buffer = SharedBuffer::default();
    let sink = ChannelSink::spawn(buffer.clone(), 256).unwrap();
    let mut engine = SimulationEngine::new_with_seed(ScenarioKind::Normal, Box::new(sink), 1);
    engine.start();
    engine.manual_light_change();
    drop(engine);

    let descriptions: Vec<String> = buffer
        .lines()
        .iter()
        .map(|line| line["description"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(descriptions[0], "Traffic light initialised");
    assert!(descriptions.iter().any(|d| d == "Simulation started"));
    assert_eq!(descriptions.last().map(String::as_str), Some("Manual change"));
}
