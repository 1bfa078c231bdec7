//! Owner-facing patrol settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::mission::{MissionPlan, StatusThrottle};
use crate::tracker::TrackerConfig;

/// Flat settings bag, typically deserialized from an operator message.
///
/// Out-of-range values are clamped, never rejected. Unknown fields are
/// ignored and missing ones take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatrolConfig {
    pub rounds: u32,
    pub height_cm: i32,
    pub stay_duration_s: f64,
    pub track_timeout_s: f64,
    pub distance_threshold_px: f32,
    /// Minimum spacing of identical status messages; 0 forwards every repeat
    pub status_throttle_s: f64,
}

impl Default for PatrolConfig {
    fn default() -> Self {
        Self {
            rounds: 3,
            height_cm: 100,
            stay_duration_s: 3.0,
            track_timeout_s: 2.0,
            distance_threshold_px: 60.0,
            status_throttle_s: StatusThrottle::DEFAULT_INTERVAL.as_secs_f64(),
        }
    }
}

fn clamp_or(value: f64, lo: f64, hi: f64, fallback: f64) -> f64 {
    if value.is_nan() { fallback } else { value.clamp(lo, hi) }
}

impl PatrolConfig {
    pub fn clamped(self) -> Self {
        let defaults = Self::default();
        let (rmin, rmax) = MissionPlan::ROUNDS_RANGE;
        let (hmin, hmax) = MissionPlan::HEIGHT_RANGE_CM;
        let (smin, smax) = MissionPlan::STAY_RANGE_S;
        let (dmin, dmax) = TrackerConfig::DISTANCE_RANGE;
        let (tmin, tmax) = TrackerConfig::TIMEOUT_RANGE;
        Self {
            rounds: self.rounds.clamp(rmin.into(), rmax.into()),
            height_cm: self.height_cm.clamp(hmin, hmax),
            stay_duration_s: clamp_or(self.stay_duration_s, smin, smax, smin),
            track_timeout_s: clamp_or(
                self.track_timeout_s,
                tmin.as_secs_f64(),
                tmax.as_secs_f64(),
                defaults.track_timeout_s,
            ),
            distance_threshold_px: if self.distance_threshold_px.is_nan() {
                defaults.distance_threshold_px
            } else {
                self.distance_threshold_px.clamp(dmin, dmax)
            },
            status_throttle_s: clamp_or(
                self.status_throttle_s,
                0.0,
                60.0,
                defaults.status_throttle_s,
            ),
        }
    }

    pub fn mission_plan(&self) -> MissionPlan {
        MissionPlan::new(self.rounds, self.height_cm, self.stay_duration_s)
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        let timeout = clamp_or(self.track_timeout_s, 0.0, 30.0, 2.0);
        TrackerConfig::new(self.distance_threshold_px, Duration::from_secs_f64(timeout))
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs_f64(clamp_or(self.status_throttle_s, 0.0, 60.0, 1.0))
    }
}
