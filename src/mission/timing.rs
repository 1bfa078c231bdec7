use std::time::Duration;

/// Fixed delays and timeouts used by the mission and the pad locator.
///
/// Defaults are the flight values. [`MissionTiming::scaled`] shrinks all of
/// them proportionally, which lets simulations run the full sequence quickly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissionTiming {
    /// Settle after takeoff, height changes and pad moves during search/landing
    pub stabilize: Duration,
    /// Poll interval while confirming a pad
    pub pad_poll: Duration,
    /// Poll interval of the initial pad search
    pub search_poll: Duration,
    /// Total time for the initial pad search
    pub search_timeout: Duration,
    /// Rotation is issued whenever this much search time has elapsed
    pub search_rotate_every: Duration,
    /// Wait after each rotation step before re-checking the pad
    pub rotation_settle: Duration,
    /// Settle after `move_to_pad` during precise positioning
    pub move_settle: Duration,
    /// Quick confirmation before precise positioning
    pub quick_confirm: Duration,
    /// Confirmation after precise positioning
    pub reconfirm: Duration,
    /// Pad confirmation inside a round trip
    pub leg_confirm: Duration,
    /// Pad confirmation before landing
    pub landing_confirm: Duration,
    /// Length of one lateral manual-control burst
    pub pulse: Duration,
    /// Pause between rounds
    pub round_pause: Duration,
    /// Upper bound on waiting for the worker in `stop()`
    pub join_timeout: Duration,
}

impl MissionTiming {
    /// Multiply every duration by `factor`; the join bound is left alone.
    pub fn scaled(self, factor: f64) -> Self {
        let s = |d: Duration| d.mul_f64(factor.max(0.0));
        Self {
            stabilize: s(self.stabilize),
            pad_poll: s(self.pad_poll),
            search_poll: s(self.search_poll),
            search_timeout: s(self.search_timeout),
            search_rotate_every: s(self.search_rotate_every),
            rotation_settle: s(self.rotation_settle),
            move_settle: s(self.move_settle),
            quick_confirm: s(self.quick_confirm),
            reconfirm: s(self.reconfirm),
            leg_confirm: s(self.leg_confirm),
            landing_confirm: s(self.landing_confirm),
            pulse: s(self.pulse),
            round_pause: s(self.round_pause),
            join_timeout: self.join_timeout,
        }
    }
}

impl Default for MissionTiming {
    fn default() -> Self {
        Self {
            stabilize: Duration::from_secs(2),
            pad_poll: Duration::from_millis(200),
            search_poll: Duration::from_millis(500),
            search_timeout: Duration::from_secs(10),
            search_rotate_every: Duration::from_secs(1),
            rotation_settle: Duration::from_secs(2),
            move_settle: Duration::from_secs(3),
            quick_confirm: Duration::from_secs(2),
            reconfirm: Duration::from_secs(3),
            leg_confirm: Duration::from_secs(4),
            landing_confirm: Duration::from_secs(5),
            pulse: Duration::from_millis(800),
            round_pause: Duration::from_secs(2),
            join_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_keeps_join_bound() {
        let timing = MissionTiming::default().scaled(0.1);
        assert_eq!(timing.pad_poll, Duration::from_millis(20));
        assert_eq!(timing.search_timeout, Duration::from_secs(1));
        assert_eq!(timing.join_timeout, Duration::from_secs(5));
    }
}
