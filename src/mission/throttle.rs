//! Deduplication of repeated status narration.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::mission::events::{EventSink, MissionEvent};

struct LastEmission {
    message: String,
    at: Instant,
}

/// Forwards status messages, dropping an exact repeat of the previous
/// message that arrives within `min_interval`.
///
/// A different message always passes immediately.
pub struct StatusThrottle {
    sink: Arc<dyn EventSink>,
    min_interval: Duration,
    last: Mutex<Option<LastEmission>>,
}

impl StatusThrottle {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

    pub fn new(sink: Arc<dyn EventSink>, min_interval: Duration) -> Self {
        Self {
            sink,
            min_interval,
            last: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Returns `true` if the message was forwarded.
    pub fn emit(&self, message: impl Into<String>) -> bool {
        self.emit_at(message, Instant::now())
    }

    pub fn emit_at(&self, message: impl Into<String>, now: Instant) -> bool {
        let message = message.into();
        {
            let mut last = self.last.lock().unwrap_or_else(|p| p.into_inner());
            if let Some(prev) = last.as_ref() {
                let recent = now.saturating_duration_since(prev.at) < self.min_interval;
                if prev.message == message && recent {
                    return false;
                }
            }
            *last = Some(LastEmission {
                message: message.clone(),
                at: now,
            });
        }

        tracing::info!(status = %message);
        self.sink.emit(MissionEvent::Status(message));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn throttle() -> (StatusThrottle, crossbeam_channel::Receiver<MissionEvent>) {
        let (tx, rx) = unbounded();
        (StatusThrottle::new(Arc::new(tx), StatusThrottle::DEFAULT_INTERVAL), rx)
    }

    #[test]
    fn test_repeat_within_interval_is_dropped() {
        let (throttle, rx) = throttle();
        let t0 = Instant::now();
        assert!(throttle.emit_at("A", t0));
        assert!(!throttle.emit_at("A", t0 + Duration::from_millis(500)));
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn test_different_message_passes() {
        let (throttle, rx) = throttle();
        let t0 = Instant::now();
        throttle.emit_at("A", t0);
        throttle.emit_at("B", t0);
        let delivered: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            delivered,
            vec![MissionEvent::Status("A".into()), MissionEvent::Status("B".into())]
        );
    }

    #[test]
    fn test_repeat_after_interval_passes() {
        let (throttle, rx) = throttle();
        let t0 = Instant::now();
        throttle.emit_at("A", t0);
        throttle.emit_at("A", t0 + Duration::from_millis(1100));
        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn test_only_previous_message_counts() {
        let (throttle, rx) = throttle();
        let t0 = Instant::now();
        throttle.emit_at("A", t0);
        throttle.emit_at("B", t0);
        throttle.emit_at("A", t0);
        assert_eq!(rx.try_iter().count(), 3);
    }

    #[test]
    fn test_real_clock() {
        let (throttle, rx) = throttle();
        throttle.emit("A");
        throttle.emit("A");
        assert_eq!(rx.try_iter().count(), 1);
    }
}
