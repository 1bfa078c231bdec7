//! Integration module for connecting detectors, the tracker and the mission.
//!
//! Detectors implement [`DetectionSource`]; [`TrackerPipeline`] runs one
//! frame through a detector and a (shared) tracker. [`TrackedPadSignal`]
//! turns tracked pad detections into the [`PadSignal`] the mission's pad
//! locator polls.

mod builder;
mod detector;
mod pad_signal;
mod pipeline;

pub use builder::DetectionBuilder;
pub use detector::DetectionSource;
pub use pad_signal::{ActuatorPadSignal, PadSignal, TrackedPadSignal, parse_pad_identity};
pub use pipeline::TrackerPipeline;
