use crate::lane::LaneId;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

/// The state of a lane's traffic light.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LightState {
    Red,
    Green,
}

/// A change in the state of a lane's traffic light.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LightEvent {
    /// The lane whose light changed.
    pub lane: LaneId,
    /// The new state of the light.
    pub state: LightState,
    /// The simulated time of the change in s.
    pub time: f64,
    /// The vehicle being let through.
    pub vehicle: usize,
}

/// A period during which a lane's light was green for a single vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GreenPhase {
    /// The lane which was green.
    pub lane: LaneId,
    /// The vehicle which crossed.
    pub vehicle: usize,
    /// The simulated time the light turned green, in s.
    pub start: f64,
    /// The simulated time the light turned back to red, in s.
    pub end: f64,
}

/// Receives traffic light state changes as they happen.
///
/// Observers are shared between the lane controller threads, so they must
/// be safe to call concurrently.
pub trait LightObserver: Sync {
    /// Called whenever a lane's light changes state.
    fn on_transition(&self, event: &LightEvent);
}

/// An observer which discards every event.
pub struct NullObserver;

/// An observer which forwards every event to the `log` facade.
pub struct LogObserver;

/// An observer which records every event, in the order they were observed.
#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<LightEvent>>,
}

impl fmt::Display for LightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LightState::Red => f.write_str("RED"),
            LightState::Green => f.write_str("GREEN"),
        }
    }
}

impl fmt::Display for LightEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:.2} traffic light on side {} direction {}: {}",
            self.time,
            self.lane.side(),
            self.lane.direction(),
            self.state
        )
    }
}

impl LightObserver for NullObserver {
    fn on_transition(&self, _event: &LightEvent) {}
}

impl LightObserver for LogObserver {
    fn on_transition(&self, event: &LightEvent) {
        log::info!("{} (vehicle {})", event, event.vehicle);
    }
}

impl GreenPhase {
    /// Gets how long the light stayed green, in s.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Checks whether both lights were green at some instant.
    /// Phases which only meet at a transition do not overlap, since the
    /// first light turns red before the second turns green.
    pub fn overlaps(&self, other: &GreenPhase) -> bool {
        self.end > other.start && other.end > self.start
    }
}

impl EventLog {
    /// Creates an empty event log.
    pub fn new() -> Self {
        Default::default()
    }

    /// Gets a copy of the recorded events.
    pub fn events(&self) -> Vec<LightEvent> {
        self.events.lock().expect("event log poisoned").clone()
    }

    /// Pairs up each green event with the red event that follows it on the same lane.
    ///
    /// A lane still green at the end of the log is reported as green until its last event.
    pub fn green_phases(&self) -> Vec<GreenPhase> {
        let mut open: HashMap<LaneId, (usize, f64)> = HashMap::new();
        let mut phases = vec![];
        let events = self.events();
        for event in &events {
            match event.state {
                LightState::Green => {
                    open.insert(event.lane, (event.vehicle, event.time));
                }
                LightState::Red => {
                    if let Some((vehicle, start)) = open.remove(&event.lane) {
                        phases.push(GreenPhase {
                            lane: event.lane,
                            vehicle,
                            start,
                            end: event.time,
                        });
                    }
                }
            }
        }
        let end = events.last().map_or(0.0, |event| event.time);
        phases.extend(open.into_iter().map(|(lane, (vehicle, start))| GreenPhase {
            lane,
            vehicle,
            start,
            end,
        }));
        phases
    }

    /// Serializes the recorded events as a JSON array.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!(self.events())
    }
}

impl LightObserver for EventLog {
    fn on_transition(&self, event: &LightEvent) {
        self.events.lock().expect("event log poisoned").push(*event);
    }
}
