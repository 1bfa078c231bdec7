//! Single tracked object and its rolling detection history.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use nalgebra::Point2;

use crate::tracker::detection::Detection;
use crate::tracker::track_state::TrackState;

/// Track identifier, unique for the lifetime of the process.
pub type TrackId = u64;

/// Capacity of the position and confidence histories.
pub const HISTORY_LEN: usize = 5;
/// Confidence every one of the last three samples must exceed to count as stable.
pub const STABLE_CONFIDENCE: f32 = 0.7;
/// Number of recent samples inspected by the stability check.
const STABILITY_WINDOW: usize = 3;
/// `stability_count` at which a track is reported stable.
pub const STABLE_COUNT: u32 = 3;

/// Global track ID counter. Never reset, so ids are never reused.
static TRACK_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_track_id() -> TrackId {
    TRACK_ID_COUNTER.fetch_add(1, Ordering::SeqCst) + 1
}

/// One physical object accumulated across detection batches.
#[derive(Debug, Clone)]
pub struct Track {
    /// Unique track identifier
    pub id: TrackId,
    /// Freshness in the most recent batch
    pub state: TrackState,
    /// Most recent matched detection, stamped with `id`
    pub last_detection: Detection,
    /// Recent centers, oldest first
    pub position_history: VecDeque<Point2<i32>>,
    /// Recent confidences, oldest first
    pub confidence_history: VecDeque<f32>,
    pub first_seen: Instant,
    pub last_updated: Instant,
    /// Number of detections attached, including the one that created the track
    pub update_count: u32,
    pub stability_count: u32,
}

impl Track {
    /// Start a new track from an unmatched detection.
    pub(crate) fn new(detection: Detection, now: Instant) -> Self {
        let mut track = Self {
            id: next_track_id(),
            state: TrackState::Refreshed,
            last_detection: detection.clone(),
            position_history: VecDeque::with_capacity(HISTORY_LEN),
            confidence_history: VecDeque::with_capacity(HISTORY_LEN),
            first_seen: now,
            last_updated: now,
            update_count: 0,
            stability_count: 0,
        };
        track.update(detection, now);
        track
    }

    /// Attach a matched detection.
    pub(crate) fn update(&mut self, mut detection: Detection, now: Instant) {
        detection.track_id = Some(self.id);

        push_bounded(&mut self.position_history, detection.center);
        push_bounded(&mut self.confidence_history, detection.confidence);

        self.last_detection = detection;
        self.last_updated = now;
        self.update_count += 1;
        self.state = TrackState::Refreshed;

        if self.confidence_history.len() >= STABILITY_WINDOW {
            let recent_confident = self
                .confidence_history
                .iter()
                .rev()
                .take(STABILITY_WINDOW)
                .all(|&c| c > STABLE_CONFIDENCE);
            if recent_confident {
                self.stability_count += 1;
            } else {
                self.stability_count = self.stability_count.saturating_sub(1);
            }
        }
    }

    /// Last known center, used for association.
    pub fn last_center(&self) -> Point2<i32> {
        self.position_history
            .back()
            .copied()
            .unwrap_or(self.last_detection.center)
    }

    pub fn is_stable(&self) -> bool {
        self.stability_count >= STABLE_COUNT
    }

    pub fn average_confidence(&self) -> f32 {
        if self.confidence_history.is_empty() {
            return 0.0;
        }
        self.confidence_history.iter().sum::<f32>() / self.confidence_history.len() as f32
    }

    /// Time since the last matched detection. Zero if `now` is earlier.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_updated)
    }

    /// Active means `age <= timeout`; the boundary itself is still active.
    pub fn is_active(&self, now: Instant, timeout: Duration) -> bool {
        self.age(now) <= timeout
    }
}

fn push_bounded<T>(history: &mut VecDeque<T>, value: T) {
    if history.len() == HISTORY_LEN {
        history.pop_front();
    }
    history.push_back(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn det(confidence: f32) -> Detection {
        Detection::new(0.0, 0.0, 10.0, 10.0, confidence, "pad_1")
    }

    #[test]
    fn test_new_track_has_one_update() {
        let now = Instant::now();
        let track = Track::new(det(0.9), now);
        assert_eq!(track.update_count, 1);
        assert_eq!(track.stability_count, 0);
        assert_eq!(track.last_detection.track_id, Some(track.id));
        assert_eq!(track.first_seen, now);
    }

    #[test]
    fn test_ids_are_unique() {
        let now = Instant::now();
        let a = Track::new(det(0.9), now);
        let b = Track::new(det(0.9), now);
        assert!(b.id > a.id);
    }

    #[test]
    fn test_stability_needs_three_confident_samples() {
        let now = Instant::now();
        let mut track = Track::new(det(0.9), now);
        track.update(det(0.9), now);
        assert_eq!(track.stability_count, 0);

        track.update(det(0.9), now);
        assert_eq!(track.stability_count, 1);
        track.update(det(0.8), now);
        track.update(det(0.75), now);
        assert_eq!(track.stability_count, 3);
        assert!(track.is_stable());

        track.update(det(0.5), now);
        assert_eq!(track.stability_count, 2);
        assert!(!track.is_stable());
    }

    #[test]
    fn test_stability_floors_at_zero() {
        let now = Instant::now();
        let mut track = Track::new(det(0.2), now);
        for _ in 0..4 {
            track.update(det(0.2), now);
        }
        assert_eq!(track.stability_count, 0);
    }

    #[test]
    fn test_exactly_threshold_is_not_confident() {
        let now = Instant::now();
        let mut track = Track::new(det(0.7), now);
        track.update(det(0.7), now);
        track.update(det(0.7), now);
        assert_eq!(track.stability_count, 0);
    }

    #[test]
    fn test_histories_are_bounded() {
        let now = Instant::now();
        let mut track = Track::new(det(0.1), now);
        for i in 0..10 {
            track.update(det(i as f32 / 10.0), now);
        }
        assert_eq!(track.confidence_history.len(), HISTORY_LEN);
        assert_eq!(track.position_history.len(), HISTORY_LEN);
        assert_relative_eq!(*track.confidence_history.front().unwrap(), 0.5);
        assert_relative_eq!(track.average_confidence(), 0.7, epsilon = 1e-6);
    }

    #[test]
    fn test_activity_boundary_is_inclusive() {
        let start = Instant::now();
        let track = Track::new(det(0.9), start);
        let timeout = Duration::from_secs(2);
        assert!(track.is_active(start + timeout, timeout));
        assert!(!track.is_active(start + timeout + Duration::from_millis(1), timeout));
    }
}
