//! Events the mission reports to its owner.

use chrono::{DateTime, Local};
use crossbeam_channel::Sender;
use serde::Serialize;

use crate::mission::actuator::PadId;
use crate::mission::state::MissionPhase;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Coords {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Where the vehicle is along the patrol, for the operator's map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionReport {
    pub current_pad: Option<PadId>,
    pub coords: Coords,
    pub target_pad: Option<PadId>,
    /// Percent along the round trip, when known
    pub progress: Option<f32>,
    pub note: String,
    pub timestamp: DateTime<Local>,
}

impl PositionReport {
    pub fn at_pad(pad: PadId, coords: Coords, progress: f32, note: impl Into<String>) -> Self {
        Self {
            current_pad: Some(pad),
            coords,
            target_pad: Some(pad),
            progress: Some(progress),
            note: note.into(),
            timestamp: Local::now(),
        }
    }
}

/// Final result of a mission run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MissionSummary {
    pub successful_rounds: u8,
    pub rounds: u8,
    /// `Completed` or `Aborted`
    pub final_phase: MissionPhase,
    /// A stop request or an internal failure cut the sequence short
    pub aborted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum MissionEvent {
    /// Human-readable progress narration, already throttled
    Status(String),
    Position(PositionReport),
    /// Emitted once when the worker has finished its terminal path
    Completed(MissionSummary),
}

/// Receiver of mission events. Called on the mission worker thread, in order.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: MissionEvent);
}

impl EventSink for Sender<MissionEvent> {
    fn emit(&self, event: MissionEvent) {
        // A dropped receiver only means nobody is listening anymore.
        let _ = self.send(event);
    }
}

/// Adapter for plain closures.
pub struct FnSink<F>(pub F);

impl<F> EventSink for FnSink<F>
where
    F: Fn(MissionEvent) + Send + Sync,
{
    fn emit(&self, event: MissionEvent) {
        (self.0)(event)
    }
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: MissionEvent) {}
}
