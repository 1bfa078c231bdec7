mod centroid_tracker;
mod detection;
mod matching;
mod rect;
mod track;
mod track_state;

pub use centroid_tracker::{SharedTracker, Tracker, TrackerConfig};
pub use detection::Detection;
pub use rect::Rect;
pub use track::{HISTORY_LEN, STABLE_CONFIDENCE, STABLE_COUNT, Track, TrackId};
pub use track_state::TrackState;
