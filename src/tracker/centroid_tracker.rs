//! Nearest-centroid tracker with timeout-based expiry.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use nalgebra::Point2;

use crate::tracker::detection::Detection;
use crate::tracker::matching::{self, AssignmentResult};
use crate::tracker::track::{Track, TrackId};
use crate::tracker::track_state::TrackState;

/// Configuration for the [`Tracker`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Maximum center distance (pixels, exclusive) for a detection to join a track
    pub distance_threshold: f32,
    /// Tracks not refreshed for longer than this are dropped
    pub track_timeout: Duration,
}

impl TrackerConfig {
    pub const DISTANCE_RANGE: (f32, f32) = (1.0, 1000.0);
    pub const TIMEOUT_RANGE: (Duration, Duration) =
        (Duration::from_millis(100), Duration::from_secs(30));

    pub fn new(distance_threshold: f32, track_timeout: Duration) -> Self {
        Self {
            distance_threshold,
            track_timeout,
        }
        .clamped()
    }

    /// Clamp both parameters into their accepted ranges.
    pub fn clamped(self) -> Self {
        let (dmin, dmax) = Self::DISTANCE_RANGE;
        let (tmin, tmax) = Self::TIMEOUT_RANGE;
        let distance_threshold = if self.distance_threshold.is_nan() {
            Self::default().distance_threshold
        } else {
            self.distance_threshold.clamp(dmin, dmax)
        };
        Self {
            distance_threshold,
            track_timeout: self.track_timeout.clamp(tmin, tmax),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 60.0,
            track_timeout: Duration::from_secs(2),
        }
    }
}

/// Associates per-frame detections with persistent tracks.
///
/// Not internally synchronized; wrap in [`SharedTracker`] when several
/// detection sources feed the same instance.
#[derive(Debug, Default)]
pub struct Tracker {
    tracks: BTreeMap<TrackId, Track>,
    config: TrackerConfig,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            tracks: BTreeMap::new(),
            config: config.clamped(),
        }
    }

    /// Consume one detection batch and return the currently active detections.
    ///
    /// The result holds one detection per track with `now - last_updated <=
    /// track_timeout`, including tracks that coasted through this batch.
    pub fn update(&mut self, detections: Vec<Detection>, now: Instant) -> Vec<Detection> {
        // Step 1: nothing is refreshed yet
        for track in self.tracks.values_mut() {
            track.state = TrackState::Coasting;
        }

        // Step 2: associate against last known centers
        let track_ids: Vec<TrackId> = self.tracks.keys().copied().collect();
        let track_centers: Vec<Point2<f32>> = self
            .tracks
            .values()
            .map(|t| {
                let c = t.last_center();
                Point2::new(c.x as f32, c.y as f32)
            })
            .collect();
        let det_centers: Vec<Point2<f32>> = detections.iter().map(|d| d.center_f32()).collect();
        let dists = matching::centroid_distance(&det_centers, &track_centers);

        let AssignmentResult {
            matches,
            unmatched_detections,
        } = matching::greedy_assignment(&dists, self.config.distance_threshold);

        let mut slots: Vec<Option<Detection>> = detections.into_iter().map(Some).collect();

        for (idet, itrack) in matches {
            let Some(det) = slots[idet].take() else {
                continue;
            };
            if let Some(track) = self.tracks.get_mut(&track_ids[itrack]) {
                track.update(det, now);
            }
        }

        // Step 3: leftovers start new tracks
        for idet in unmatched_detections {
            if let Some(det) = slots[idet].take() {
                let track = Track::new(det, now);
                tracing::debug!(
                    track_id = track.id,
                    identity = %track.last_detection.identity,
                    "new track"
                );
                self.tracks.insert(track.id, track);
            }
        }

        // Step 4: expire stale tracks
        let timeout = self.config.track_timeout;
        self.tracks.retain(|id, track| {
            let expired = track.state != TrackState::Refreshed && !track.is_active(now, timeout);
            if expired {
                track.state = TrackState::Expired;
                tracing::debug!(track_id = *id, "track expired");
            }
            !expired
        });

        // Step 5: everything left is within the timeout
        self.tracks
            .values()
            .filter(|t| t.is_active(now, timeout))
            .map(|t| t.last_detection.clone())
            .collect()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Change parameters without dropping existing tracks.
    pub fn set_config(&mut self, config: TrackerConfig) {
        self.config = config.clamped();
    }

    /// Tracks in id order.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Drop every track. Ids are not reused afterwards.
    pub fn clear(&mut self) {
        self.tracks.clear();
    }
}

/// A [`Tracker`] behind one mutex, cloneable across detection sources.
#[derive(Debug, Clone, Default)]
pub struct SharedTracker {
    inner: Arc<Mutex<Tracker>>,
}

impl SharedTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Tracker::new(config))),
        }
    }

    pub fn update(&self, detections: Vec<Detection>, now: Instant) -> Vec<Detection> {
        self.lock().update(detections, now)
    }

    /// Lock for inspection or several calls in a row.
    pub fn lock(&self) -> MutexGuard<'_, Tracker> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det_at(cx: f32, cy: f32, confidence: f32) -> Detection {
        Detection::new(cx - 10.0, cy - 10.0, cx + 10.0, cy + 10.0, confidence, "pad_1")
    }

    #[test]
    fn test_config_clamps() {
        let config = TrackerConfig::new(5000.0, Duration::from_secs(120));
        assert_eq!(config.distance_threshold, 1000.0);
        assert_eq!(config.track_timeout, Duration::from_secs(30));

        let config = TrackerConfig::new(0.0, Duration::ZERO);
        assert_eq!(config.distance_threshold, 1.0);
        assert_eq!(config.track_timeout, Duration::from_millis(100));
    }

    #[test]
    fn test_empty_batch_still_expires() {
        let start = Instant::now();
        let mut tracker = Tracker::new(TrackerConfig::default());
        tracker.update(vec![det_at(100.0, 100.0, 0.9)], start);
        assert_eq!(tracker.len(), 1);

        let out = tracker.update(vec![], start + Duration::from_secs(3));
        assert!(out.is_empty());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_coasting_track_is_returned() {
        let start = Instant::now();
        let mut tracker = Tracker::new(TrackerConfig::default());
        tracker.update(vec![det_at(100.0, 100.0, 0.9)], start);

        let out = tracker.update(vec![], start + Duration::from_secs(1));
        assert_eq!(out.len(), 1);
        let track = tracker.tracks().next().unwrap();
        assert_eq!(track.state, TrackState::Coasting);
    }

    #[test]
    fn test_refreshed_track_is_not_matched_twice() {
        let start = Instant::now();
        let mut tracker = Tracker::new(TrackerConfig::default());
        tracker.update(vec![det_at(100.0, 100.0, 0.9)], start);

        let out = tracker.update(
            vec![det_at(101.0, 100.0, 0.9), det_at(102.0, 100.0, 0.9)],
            start + Duration::from_millis(100),
        );
        assert_eq!(out.len(), 2);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_zero_area_detection_is_tracked() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        let det = Detection::new(50.0, 50.0, 50.0, 50.0, 0.4, "pad_3");
        let out = tracker.update(vec![det], Instant::now());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].area, 0.0);
        assert!(out[0].track_id.is_some());
    }

    #[test]
    fn test_clear_keeps_ids_increasing() {
        let now = Instant::now();
        let mut tracker = Tracker::new(TrackerConfig::default());
        let first = tracker.update(vec![det_at(10.0, 10.0, 0.9)], now)[0].track_id;
        tracker.clear();
        let second = tracker.update(vec![det_at(10.0, 10.0, 0.9)], now)[0].track_id;
        assert!(second > first);
    }

    #[test]
    fn test_shared_tracker_serializes_updates() {
        let shared = SharedTracker::new(TrackerConfig::default());
        let now = Instant::now();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    shared.update(vec![det_at(200.0 * i as f32, 0.0, 0.9)], now);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(shared.lock().len(), 4);
    }
}
