//! Pad identity signal consumed by the pad locator.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::mission::{Actuator, PadId};
use crate::tracker::{Detection, SharedTracker, Track, TrackState};

/// Which pad, if any, is identified right now.
pub trait PadSignal: Send + Sync {
    fn current_pad(&self) -> Option<PadId>;
}

/// Uses the vehicle's own pad detection as the signal.
pub struct ActuatorPadSignal<A: ?Sized> {
    actuator: Arc<A>,
}

impl<A: Actuator + ?Sized> ActuatorPadSignal<A> {
    pub fn new(actuator: Arc<A>) -> Self {
        Self { actuator }
    }
}

impl<A: Actuator + ?Sized> PadSignal for ActuatorPadSignal<A> {
    fn current_pad(&self) -> Option<PadId> {
        self.actuator.current_pad_id().filter(|&id| id > 0)
    }
}

/// Pad number encoded in a detection identity: the trailing digits of
/// labels such as `"pad_6"`, `"m6"` or `"6"`. Zero is not a pad.
pub fn parse_pad_identity(identity: &str) -> Option<PadId> {
    let digits_start = identity
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    identity[digits_start..].parse::<PadId>().ok().filter(|&id| id > 0)
}

/// Derives the pad signal from tracked pad detections.
///
/// After each batch the signal is the pad of the best active pad track,
/// ranked by stability, then whether it was refreshed in this batch, then
/// average confidence. No active pad track means no pad.
///
/// The reading goes stale once no batch has confirmed it for longer than the
/// tracker's timeout, so a stalled detection loop reads as "no pad".
#[derive(Debug, Clone)]
pub struct TrackedPadSignal {
    tracker: SharedTracker,
    current: Arc<Mutex<Option<Reading>>>,
}

#[derive(Debug, Clone, Copy)]
struct Reading {
    pad: PadId,
    at: Instant,
}

impl TrackedPadSignal {
    pub fn new(tracker: SharedTracker) -> Self {
        Self {
            tracker,
            current: Arc::new(Mutex::new(None)),
        }
    }

    pub fn tracker(&self) -> &SharedTracker {
        &self.tracker
    }

    /// Feed one detection batch; returns the tracker's active detections.
    pub fn ingest(&self, detections: Vec<Detection>, now: Instant) -> Vec<Detection> {
        let mut tracker = self.tracker.lock();
        let active = tracker.update(detections, now);
        let timeout = tracker.config().track_timeout;

        let best = tracker
            .tracks()
            .filter(|t| t.is_active(now, timeout))
            .filter_map(|t| parse_pad_identity(&t.last_detection.identity).map(|pad| (pad, t)))
            .max_by(|(_, a), (_, b)| {
                rank(a)
                    .partial_cmp(&rank(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(pad, _)| pad);

        drop(tracker);

        let mut current = self.lock_current();
        if current.map(|r| r.pad) != best {
            tracing::debug!(pad = ?best, "pad signal changed");
        }
        *current = best.map(|pad| Reading { pad, at: now });
        active
    }

    /// Pad reading as of `now`; `None` once it is older than the track timeout.
    pub fn current_pad_at(&self, now: Instant) -> Option<PadId> {
        let reading = (*self.lock_current())?;
        let timeout = self.tracker.lock().config().track_timeout;
        (now.saturating_duration_since(reading.at) <= timeout).then_some(reading.pad)
    }

    /// Forget the current pad, e.g. when detection is switched off.
    pub fn reset(&self) {
        *self.lock_current() = None;
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, Option<Reading>> {
        self.current.lock().unwrap_or_else(|p| p.into_inner())
    }
}

fn rank(track: &Track) -> (bool, bool, f32) {
    (
        track.is_stable(),
        track.state == TrackState::Refreshed,
        track.average_confidence(),
    )
}

impl PadSignal for TrackedPadSignal {
    fn current_pad(&self) -> Option<PadId> {
        self.current_pad_at(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::DetectionBuilder;
    use crate::tracker::TrackerConfig;
    use std::time::Duration;

    fn pad_at(pad: u8, cx: f32, confidence: f32) -> Detection {
        DetectionBuilder::new()
            .xywh(cx, 100.0, 40.0, 40.0)
            .confidence(confidence)
            .pad(pad)
            .build()
    }

    #[test]
    fn test_parse_pad_identity() {
        assert_eq!(parse_pad_identity("pad_6"), Some(6));
        assert_eq!(parse_pad_identity("m1"), Some(1));
        assert_eq!(parse_pad_identity("3"), Some(3));
        assert_eq!(parse_pad_identity("pad_0"), None);
        assert_eq!(parse_pad_identity("strawberry"), None);
        assert_eq!(parse_pad_identity("pad_999"), None);
        assert_eq!(parse_pad_identity(""), None);
    }

    #[test]
    fn test_signal_follows_best_track() {
        let signal = TrackedPadSignal::new(SharedTracker::new(TrackerConfig::default()));
        let t0 = Instant::now();
        assert_eq!(signal.current_pad(), None);

        signal.ingest(vec![pad_at(1, 100.0, 0.6), pad_at(6, 400.0, 0.9)], t0);
        assert_eq!(signal.current_pad(), Some(6));

        // Pad 6 disappears; pad 1 keeps being refreshed.
        signal.ingest(vec![pad_at(1, 102.0, 0.6)], t0 + Duration::from_millis(100));
        assert_eq!(signal.current_pad(), Some(1));
    }

    #[test]
    fn test_signal_clears_after_timeout() {
        let signal = TrackedPadSignal::new(SharedTracker::new(TrackerConfig::default()));
        let t0 = Instant::now();
        signal.ingest(vec![pad_at(1, 100.0, 0.9)], t0);
        signal.ingest(vec![], t0 + Duration::from_secs(1));
        assert_eq!(signal.current_pad(), Some(1));

        signal.ingest(vec![], t0 + Duration::from_secs(5));
        assert_eq!(signal.current_pad(), None);
    }

    #[test]
    fn test_reading_expires_without_batches() {
        let signal = TrackedPadSignal::new(SharedTracker::new(TrackerConfig::default()));
        let t0 = Instant::now();
        signal.ingest(vec![pad_at(6, 200.0, 0.9)], t0);
        assert_eq!(signal.current_pad_at(t0 + Duration::from_secs(2)), Some(6));
        // No further ingest: the detection loop stalled
        assert_eq!(signal.current_pad_at(t0 + Duration::from_millis(2001)), None);

        signal.ingest(vec![pad_at(6, 200.0, 0.9)], t0 + Duration::from_secs(3));
        signal.reset();
        assert_eq!(signal.current_pad_at(t0 + Duration::from_secs(3)), None);
    }

    #[test]
    fn test_non_pad_detections_ignored() {
        let signal = TrackedPadSignal::new(SharedTracker::new(TrackerConfig::default()));
        let crop = DetectionBuilder::new()
            .xywh(50.0, 50.0, 10.0, 10.0)
            .confidence(0.95)
            .identity("strawberry_ripe")
            .build();
        let active = signal.ingest(vec![crop], Instant::now());
        assert_eq!(active.len(), 1);
        assert_eq!(signal.current_pad(), None);
    }
}
