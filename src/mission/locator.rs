//! Pad-relative navigation primitives.
//!
//! Every operation reports a plain `bool`. Failing to find or confirm a pad
//! is a normal outcome, and actuator errors are logged and counted as a
//! failed step.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::integration::PadSignal;
use crate::mission::actuator::{Actuator, CommandResult, PadId, PadMove};
use crate::mission::stop::StopFlag;
use crate::mission::timing::MissionTiming;

/// Consecutive matching reads needed to confirm a pad.
pub const REQUIRED_CONFIRMATIONS: u32 = 2;
/// Yaw step of the rotation search, clockwise.
pub const ROTATION_STEP_DEG: i32 = 30;
/// Default number of rotation steps in [`PadLocator::find_pad_by_rotation`].
pub const DEFAULT_ROTATION_ATTEMPTS: u32 = 4;
/// Speed used by precise positioning, cm/s.
pub const POSITIONING_SPEED: i32 = 15;

pub struct PadLocator {
    actuator: Arc<dyn Actuator>,
    signal: Arc<dyn PadSignal>,
    stop: StopFlag,
    timing: MissionTiming,
    last_known_pad: Option<PadId>,
}

impl PadLocator {
    pub fn new(
        actuator: Arc<dyn Actuator>,
        signal: Arc<dyn PadSignal>,
        stop: StopFlag,
        timing: MissionTiming,
    ) -> Self {
        Self {
            actuator,
            signal,
            stop,
            timing,
            last_known_pad: None,
        }
    }

    /// Seed the landing fallback, e.g. from a previous mission.
    pub fn with_last_known_pad(mut self, pad: Option<PadId>) -> Self {
        self.last_known_pad = pad;
        self
    }

    /// Last pad confirmed by any operation.
    pub fn last_known_pad(&self) -> Option<PadId> {
        self.last_known_pad
    }

    pub fn sees(&self, pad: PadId) -> bool {
        self.signal.current_pad() == Some(pad)
    }

    /// Poll until `pad` is read twice in a row, or `timeout` elapses.
    pub fn wait_for_pad(&mut self, pad: PadId, timeout: Duration) -> bool {
        let start = Instant::now();
        let mut consecutive = 0;

        while start.elapsed() < timeout && !self.stop.is_requested() {
            if self.sees(pad) {
                consecutive += 1;
                if consecutive >= REQUIRED_CONFIRMATIONS {
                    self.last_known_pad = Some(pad);
                    tracing::debug!(pad, consecutive, "pad confirmed");
                    return true;
                }
            } else {
                consecutive = 0;
            }
            self.stop.sleep(self.timing.pad_poll, self.timing.pad_poll);
        }

        tracing::debug!(pad, ?timeout, "pad not confirmed");
        false
    }

    /// Check for `pad`, rotating by [`ROTATION_STEP_DEG`] between checks.
    pub fn find_pad_by_rotation(&mut self, pad: PadId, max_attempts: u32) -> bool {
        for attempt in 1..=max_attempts {
            if self.stop.is_requested() {
                return false;
            }
            if self.sees(pad) {
                self.last_known_pad = Some(pad);
                return true;
            }

            tracing::debug!(pad, attempt, "rotation search");
            self.command("rotate", self.actuator.rotate(ROTATION_STEP_DEG));
            self.settle(self.timing.rotation_settle);

            if self.sees(pad) {
                self.last_known_pad = Some(pad);
                return true;
            }
        }
        false
    }

    /// Confirm `pad`, fly above it and confirm again.
    ///
    /// A move that is not reconfirmed afterwards counts as a failure.
    pub fn precise_positioning(&mut self, pad: PadId, height_cm: i32, speed: i32) -> bool {
        if self.wait_for_pad(pad, self.timing.quick_confirm) {
            tracing::debug!(pad, "pad already in view");
        } else if !self.find_pad_by_rotation(pad, DEFAULT_ROTATION_ATTEMPTS) {
            tracing::warn!(pad, "positioning failed: pad not found");
            return false;
        }

        let target = PadMove::above(pad, height_cm, speed);
        if !self.command("move_to_pad", self.actuator.move_to_pad(target)) {
            return false;
        }
        self.settle(self.timing.move_settle);

        if self.wait_for_pad(pad, self.timing.reconfirm) {
            tracing::info!(pad, "positioned on pad");
            true
        } else {
            tracing::warn!(pad, "positioning not reconfirmed");
            false
        }
    }

    /// Initial search for any pad.
    ///
    /// Polls every `search_poll` for up to `search_timeout`, rotating one step
    /// each time a further `search_rotate_every` of search time has elapsed.
    pub fn search_any_pad(&mut self) -> Option<PadId> {
        let poll = self.timing.search_poll.max(Duration::from_millis(1));
        let polls_per_rotation = (self.timing.search_rotate_every.as_secs_f64()
            / poll.as_secs_f64())
            .round()
            .max(1.0) as u32;
        let mut waited = Duration::ZERO;
        let mut polls = 0u32;

        while waited < self.timing.search_timeout && !self.stop.is_requested() {
            if let Some(pad) = self.signal.current_pad() {
                self.last_known_pad = Some(pad);
                tracing::info!(pad, "initial pad detected");
                return Some(pad);
            }

            if !self.stop.sleep(poll, poll) {
                break;
            }
            waited += poll;
            polls += 1;

            if polls % polls_per_rotation == 0 {
                self.command("rotate", self.actuator.rotate(ROTATION_STEP_DEG));
            }
        }
        None
    }

    /// Sleep that gives up early on a stop request.
    pub fn settle(&self, duration: Duration) -> bool {
        self.stop.sleep(duration, self.timing.pad_poll)
    }

    /// Log a failed command and fold it into a success flag.
    pub fn command(&self, name: &'static str, result: CommandResult) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(command = name, error = %e, "actuator command failed");
                false
            }
        }
    }
}
