//! Challenge-pad patrol for autonomous aerial vehicles.
//!
//! Two layers live in this crate:
//!
//! - [`tracker`]: a nearest-centroid multi-object tracker with temporal
//!   stability scoring and track expiry, shared by every detection subsystem.
//! - [`mission`]: the patrol mission controller (take off, find a pad, shuttle
//!   between pads 1 and 6, land) running on a dedicated worker thread.
//!
//! [`integration`] glues detectors, the tracker and the pad signal consumed by
//! the mission together.

pub mod config;
pub mod error;
pub mod integration;
pub mod mission;
pub mod tracker;

pub use config::PatrolConfig;
pub use error::{ActuatorError, MissionError};
pub use integration::{
    ActuatorPadSignal, DetectionBuilder, DetectionSource, PadSignal, TrackedPadSignal,
    TrackerPipeline,
};
pub use mission::{
    Actuator, CleanupRegistry, MissionController, MissionEvent, MissionPhase, MissionPlan,
    MissionTiming, PadId, PadLocator, PadMove, PositionReport, RcCommand, StatusThrottle,
};
pub use tracker::{
    Detection, Rect, SharedTracker, Track, TrackId, TrackState, Tracker, TrackerConfig,
};
