//! Patrol mission state machine.
//!
//! `Idle -> TakingOff -> Ascending -> SearchingInitialPad -> RoundTrip(1..=n)
//! -> PreparingLanding -> Landing -> Completed`, with `Aborted` reachable
//! from anywhere. The whole sequence runs on one worker thread; all actuator
//! commands are issued from it.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::PatrolConfig;
use crate::error::MissionError;
use crate::integration::PadSignal;
use crate::mission::actuator::{Actuator, PadId, PadMove, RcCommand};
use crate::mission::cleanup::{CleanupCallback, CleanupRegistry};
use crate::mission::events::{Coords, EventSink, MissionEvent, MissionSummary, PositionReport};
use crate::mission::locator::{DEFAULT_ROTATION_ATTEMPTS, POSITIONING_SPEED, PadLocator};
use crate::mission::plan::MissionPlan;
use crate::mission::state::MissionPhase;
use crate::mission::stop::StopFlag;
use crate::mission::throttle::StatusThrottle;
use crate::mission::timing::MissionTiming;

/// Home pad of every round trip.
pub const HOME_PAD: PadId = 1;
/// Far pad of every round trip.
pub const FAR_PAD: PadId = 6;
/// Semantic x coordinate of the far pad, cm.
const FAR_PAD_X: i32 = 200;
/// Left/right stick value of a lateral pulse.
const PULSE_MAGNITUDE: i32 = 25;
/// Lateral pulses tried per leg.
const HOP_ATTEMPTS: u32 = 3;
/// Speed of the move above the initial pad, cm/s.
const ALIGN_SPEED: i32 = 20;
/// Two-stage descent before landing: (height cm, speed cm/s).
const LANDING_APPROACH: [(i32, i32); 2] = [(60, 20), (30, 15)];
/// Height of the unaligned descent when no pad is found.
const BLIND_DESCENT_CM: i32 = 30;

type CompletionHook = Arc<dyn Fn() + Send + Sync>;

/// State shared between the controller and its worker.
struct Shared {
    plan: Mutex<MissionPlan>,
    timing: Mutex<MissionTiming>,
    running: AtomicBool,
    /// Bumped by every `start()`; only the matching run may clear `running`.
    generation: AtomicU64,
    stop: StopFlag,
    phase: Mutex<MissionPhase>,
    last_known_pad: Mutex<Option<PadId>>,
    cleanup: CleanupRegistry,
    status: StatusThrottle,
    events: Arc<dyn EventSink>,
    on_complete: Mutex<Option<CompletionHook>>,
    toggles: Mutex<Vec<(String, Arc<AtomicBool>)>>,
}

impl Shared {
    fn status(&self, message: impl Into<String>) {
        self.status.emit(message);
    }

    fn set_phase(&self, phase: MissionPhase) {
        *lock(&self.phase) = phase;
        tracing::info!(%phase, "mission phase");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

/// Runs the challenge-pad patrol on a dedicated worker thread.
pub struct MissionController {
    actuator: Arc<dyn Actuator>,
    signal: Arc<dyn PadSignal>,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MissionController {
    pub fn new(
        actuator: Arc<dyn Actuator>,
        signal: Arc<dyn PadSignal>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self::from_config(&PatrolConfig::default(), actuator, signal, events)
    }

    pub fn from_config(
        config: &PatrolConfig,
        actuator: Arc<dyn Actuator>,
        signal: Arc<dyn PadSignal>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let config = config.clone().clamped();
        let shared = Shared {
            plan: Mutex::new(config.mission_plan()),
            timing: Mutex::new(MissionTiming::default()),
            running: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            stop: StopFlag::new(),
            phase: Mutex::new(MissionPhase::Idle),
            last_known_pad: Mutex::new(None),
            cleanup: CleanupRegistry::new(),
            status: StatusThrottle::new(events.clone(), config.status_interval()),
            events,
            on_complete: Mutex::new(None),
            toggles: Mutex::new(Vec::new()),
        };
        Self {
            actuator,
            signal,
            shared: Arc::new(shared),
            worker: Mutex::new(None),
        }
    }

    /// Replace the mission delays; applies from the next `start()`.
    pub fn with_timing(self, timing: MissionTiming) -> Self {
        *lock(&self.shared.timing) = timing;
        self
    }

    pub fn set_rounds(&self, rounds: u32) -> u8 {
        lock(&self.shared.plan).set_rounds(rounds)
    }

    pub fn set_height(&self, height_cm: i32) -> i32 {
        lock(&self.shared.plan).set_height(height_cm)
    }

    pub fn set_stay_duration(&self, seconds: f64) -> Duration {
        let stay = lock(&self.shared.plan).set_stay_duration(seconds);
        self.shared
            .status(format!("Stay duration set to {:.1} s", stay.as_secs_f64()));
        stay
    }

    pub fn plan(&self) -> MissionPlan {
        *lock(&self.shared.plan)
    }

    pub fn phase(&self) -> MissionPhase {
        *lock(&self.shared.phase)
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Landing fallback target: last pad confirmed by any mission.
    pub fn last_known_pad(&self) -> Option<PadId> {
        *lock(&self.shared.last_known_pad)
    }

    /// Called once at the end of every mission, after cleanup.
    pub fn on_complete(&self, hook: impl Fn() + Send + Sync + 'static) {
        *lock(&self.shared.on_complete) = Some(Arc::new(hook));
    }

    pub fn cleanup(&self) -> &CleanupRegistry {
        &self.shared.cleanup
    }

    pub fn add_cleanup_callback(&self, callback: Arc<dyn CleanupCallback>) {
        self.shared.cleanup.register(callback);
    }

    pub fn remove_cleanup_callback(&self, callback: &Arc<dyn CleanupCallback>) -> bool {
        self.shared.cleanup.remove(callback)
    }

    /// A detection feature that `stop()` switches off.
    pub fn register_detection_toggle(&self, name: impl Into<String>, enabled: Arc<AtomicBool>) {
        lock(&self.shared.toggles).push((name.into(), enabled));
    }

    /// Start the mission worker.
    ///
    /// Rejected without any state change if a mission is already running or
    /// the vehicle is not connected.
    pub fn start(&self) -> Result<(), MissionError> {
        self.start_with(|job| thread::Builder::new().name("mission-worker".into()).spawn(job))
    }

    fn start_with<S>(&self, spawn: S) -> Result<(), MissionError>
    where
        S: FnOnce(Box<dyn FnOnce() + Send>) -> io::Result<JoinHandle<()>>,
    {
        if self.is_running() {
            self.shared.status("Mission already running");
            return Err(MissionError::AlreadyRunning);
        }
        if !self.actuator.is_connected() {
            self.shared.status("Vehicle not connected");
            return Err(MissionError::NotConnected);
        }
        let mut worker = lock(&self.worker);
        if let Some(previous) = worker.take() {
            // `running` is clear, so the previous run is past its terminal
            // path; allow it a bounded moment to return.
            let timeout = lock(&self.shared.timing).join_timeout;
            if !wait_finished(&previous, timeout) {
                *worker = Some(previous);
                self.shared.status("Mission already running");
                return Err(MissionError::AlreadyRunning);
            }
            if previous.join().is_err() {
                tracing::error!("previous mission worker terminated by panic");
            }
        }

        if self
            .shared
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(MissionError::AlreadyRunning);
        }
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;

        self.shared.stop.reset();
        self.shared.status("Mission started");

        let shared = self.shared.clone();
        let actuator = self.actuator.clone();
        let signal = self.signal.clone();
        // The run is built on the worker, so a failed spawn leaves nothing
        // behind to land or clean up.
        let spawned = spawn(Box::new(move || {
            MissionRun::new(shared, actuator, signal, generation).run()
        }));

        match spawned {
            Ok(handle) => {
                *worker = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::SeqCst);
                self.shared.status(format!("Mission error: {e}"));
                Err(MissionError::Spawn(e))
            }
        }
    }

    /// Ask the worker to stop, switch detection off, wait for the worker
    /// (bounded) and run cleanup.
    ///
    /// Returns `false` if the worker did not finish within the join bound.
    /// It keeps unwinding on its own in that case and clears the running
    /// state itself once it has landed.
    pub fn stop(&self) -> bool {
        tracing::info!("stopping mission");
        self.shared.stop.request();
        self.disable_detection();

        let timeout = lock(&self.shared.timing).join_timeout;
        let joined = {
            let mut worker = lock(&self.worker);
            match worker.take() {
                Some(handle) => {
                    if wait_finished(&handle, timeout) {
                        if handle.join().is_err() {
                            tracing::error!("mission worker terminated by panic");
                        }
                        true
                    } else {
                        tracing::warn!(?timeout, "mission worker did not finish in time");
                        *worker = Some(handle);
                        false
                    }
                }
                None => true,
            }
        };

        self.shared.cleanup.run_all();
        if joined {
            self.shared.running.store(false, Ordering::SeqCst);
        }
        self.shared.status("Mission stopped");
        joined
    }

    fn disable_detection(&self) {
        for (name, enabled) in lock(&self.shared.toggles).iter() {
            if enabled.swap(false, Ordering::SeqCst) {
                self.shared.status(format!("{name} detection disabled"));
            }
        }
    }
}

/// Poll `handle` until it finishes or `timeout` elapses.
fn wait_finished(handle: &JoinHandle<()>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    handle.is_finished()
}

impl Drop for MissionController {
    fn drop(&mut self) {
        if self.is_running() {
            self.stop();
        }
    }
}

/// Everything the worker needs for one run.
///
/// Dropping it is the mission's terminal path: land, run cleanup, clear the
/// running flag and notify the owner. This happens on every exit, including
/// errors and panics.
struct MissionRun {
    shared: Arc<Shared>,
    actuator: Arc<dyn Actuator>,
    locator: PadLocator,
    plan: MissionPlan,
    timing: MissionTiming,
    generation: u64,
    successful_rounds: u8,
    failed: bool,
}

impl MissionRun {
    fn new(
        shared: Arc<Shared>,
        actuator: Arc<dyn Actuator>,
        signal: Arc<dyn PadSignal>,
        generation: u64,
    ) -> Self {
        let plan = *lock(&shared.plan);
        let timing = *lock(&shared.timing);
        let locator = PadLocator::new(actuator.clone(), signal, shared.stop.clone(), timing)
            .with_last_known_pad(*lock(&shared.last_known_pad));
        Self {
            shared,
            actuator,
            locator,
            plan,
            timing,
            generation,
            successful_rounds: 0,
            failed: false,
        }
    }

    fn run(mut self) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.execute()));
        let failure = match result {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(payload) => Some(MissionError::Panicked(panic_message(payload.as_ref()))),
        };
        if let Some(e) = failure {
            self.failed = true;
            tracing::error!(error = %e, "mission sequence failed");
            self.shared.status(format!("Mission error: {e}"));
        }
        // Drop performs landing and the terminal side effects.
    }

    fn stopped(&self) -> bool {
        self.shared.stop.is_requested()
    }

    fn pause(&self, duration: Duration) -> bool {
        self.locator.settle(duration)
    }

    fn execute(&mut self) -> Result<(), MissionError> {
        let height = self.plan.height_cm();

        if !self.actuator.is_flying() {
            self.shared.set_phase(MissionPhase::TakingOff);
            self.shared.status("Taking off");
            if let Err(e) = self.actuator.takeoff() {
                tracing::warn!(error = %e, "takeoff failed");
                self.shared.status("Takeoff failed");
                return Err(MissionError::TakeoffFailed(e));
            }
            if !self.pause(self.timing.stabilize) {
                return Ok(());
            }
        }

        self.shared.set_phase(MissionPhase::Ascending);
        self.shared.status(format!("Adjusting height to {height} cm"));
        self.locator.command("set_height", self.actuator.set_height(height));
        if !self.pause(self.timing.stabilize) {
            return Ok(());
        }

        self.shared.set_phase(MissionPhase::SearchingInitialPad);
        self.shared.status("Searching for challenge pad");
        match self.locator.search_any_pad() {
            Some(pad) => {
                self.shared.status(format!("Found challenge pad {pad}"));
                self.locator.command(
                    "move_to_pad",
                    self.actuator.move_to_pad(PadMove::above(pad, height, ALIGN_SPEED)),
                );
                self.pause(self.timing.stabilize);
                self.run_rounds();
            }
            None if self.stopped() => return Ok(()),
            None => self.shared.status("Could not find challenge pad"),
        }

        if self.stopped() {
            return Ok(());
        }
        self.shared.status(format!(
            "Mission complete: {}/{} rounds successful",
            self.successful_rounds,
            self.plan.rounds()
        ));

        self.shared.set_phase(MissionPhase::PreparingLanding);
        self.prepare_for_landing();
        Ok(())
    }

    fn run_rounds(&mut self) {
        let rounds = self.plan.rounds();
        for round in 1..=rounds {
            if self.stopped() {
                break;
            }
            self.shared.set_phase(MissionPhase::RoundTrip(round));
            self.shared.status(format!("Round {round}/{rounds}"));

            if self.round_trip() {
                self.successful_rounds += 1;
                tracing::info!(round, "round trip completed");
            } else {
                tracing::warn!(round, "round trip failed");
            }

            if round < rounds && !self.stopped() {
                self.pause(self.timing.round_pause);
            }
        }
    }

    /// Pad 1 -> pad 6 -> pad 1. Returns whether the round succeeded.
    fn round_trip(&mut self) -> bool {
        let height = self.plan.height_cm();
        let stay = self.plan.stay_duration();

        if !self.actuator.is_connected() {
            self.shared.status("Error: vehicle not connected");
            return false;
        }

        if !self.locator.wait_for_pad(HOME_PAD, self.timing.leg_confirm) {
            if !self.stopped() {
                self.shared.status(format!("Error: cannot locate pad {HOME_PAD}"));
            }
            return false;
        }

        self.locator.precise_positioning(HOME_PAD, height, POSITIONING_SPEED);
        self.hold_at(HOME_PAD, Coords { x: 0, y: 0, z: height }, 0.0, "at pad 1", stay);
        if self.stopped() {
            return false;
        }

        if !self.hop(PULSE_MAGNITUDE, FAR_PAD) {
            if !self.stopped() {
                self.shared.status(format!("Could not find pad {FAR_PAD}"));
                self.locator.find_pad_by_rotation(HOME_PAD, DEFAULT_ROTATION_ATTEMPTS);
            }
            return false;
        }

        self.locator.precise_positioning(FAR_PAD, height, POSITIONING_SPEED);
        self.hold_at(FAR_PAD, Coords { x: FAR_PAD_X, y: 0, z: height }, 50.0, "at pad 6", stay);
        if self.stopped() {
            return false;
        }

        if !self.hop(-PULSE_MAGNITUDE, HOME_PAD) {
            if !self.stopped() {
                self.shared.status(format!("Could not find pad {HOME_PAD} on return"));
                self.locator.find_pad_by_rotation(HOME_PAD, DEFAULT_ROTATION_ATTEMPTS);
            }
            return false;
        }

        self.locator.precise_positioning(HOME_PAD, height, POSITIONING_SPEED);
        self.report(PositionReport::at_pad(
            HOME_PAD,
            Coords { x: 0, y: 0, z: height },
            0.0,
            "back at pad 1",
        ));
        true
    }

    fn hold_at(&self, pad: PadId, coords: Coords, progress: f32, note: &str, stay: Duration) {
        self.shared.status(format!(
            "Staying at pad {pad} for {:.1} s",
            stay.as_secs_f64()
        ));
        self.report(PositionReport::at_pad(pad, coords, progress, note));
        self.pause(stay);
    }

    /// Lateral pulses until `target` is confirmed, at most [`HOP_ATTEMPTS`].
    fn hop(&mut self, magnitude: i32, target: PadId) -> bool {
        for attempt in 1..=HOP_ATTEMPTS {
            if self.stopped() {
                return false;
            }
            if !self.actuator.is_flying() {
                self.shared.status("Error: vehicle not flying");
                return false;
            }

            tracing::debug!(pad = target, attempt, magnitude, "lateral pulse");
            let burst = self.actuator.manual_control(RcCommand::lateral(magnitude));
            self.locator.command("manual_control", burst);
            self.pause(self.timing.pulse);
            // Always stop the burst, even when a stop request cut the pulse short.
            self.locator
                .command("manual_control", self.actuator.manual_control(RcCommand::hover()));

            if self.locator.wait_for_pad(target, self.timing.leg_confirm) {
                return true;
            }
        }
        false
    }

    fn prepare_for_landing(&mut self) {
        let target = self.locator.last_known_pad().unwrap_or(HOME_PAD);
        self.shared.status(format!("Locating pad {target} for landing"));

        let found = self.locator.wait_for_pad(target, self.timing.landing_confirm)
            || self.locator.find_pad_by_rotation(target, DEFAULT_ROTATION_ATTEMPTS);

        if found {
            for (height, speed) in LANDING_APPROACH {
                self.locator.command(
                    "move_to_pad",
                    self.actuator.move_to_pad(PadMove::above(target, height, speed)),
                );
                self.pause(self.timing.stabilize);
            }
        } else if !self.stopped() {
            self.shared.status("Landing pad not found, descending in place");
            self.locator
                .command("set_height", self.actuator.set_height(BLIND_DESCENT_CM));
            self.pause(self.timing.stabilize);
        }
    }

    fn report(&self, report: PositionReport) {
        self.shared.events.emit(MissionEvent::Position(report));
    }

    fn land(&self) {
        self.shared.set_phase(MissionPhase::Landing);
        self.shared.status("Landing");
        match panic::catch_unwind(AssertUnwindSafe(|| self.actuator.land())) {
            Ok(Ok(())) => tracing::info!("landed"),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "landing failed");
                self.shared.status(format!("Landing error: {e}"));
            }
            Err(payload) => {
                tracing::error!(panic = %panic_message(payload.as_ref()), "landing panicked");
            }
        }
    }

    fn finish(&mut self) {
        let aborted = self.failed || self.stopped();
        let final_phase = if aborted {
            MissionPhase::Aborted
        } else {
            MissionPhase::Completed
        };

        *lock(&self.shared.last_known_pad) = self.locator.last_known_pad();
        self.shared.cleanup.run_all();
        self.shared.set_phase(final_phase);
        if self.shared.generation.load(Ordering::SeqCst) == self.generation {
            self.shared.running.store(false, Ordering::SeqCst);
        }
        self.shared.status("Mission finished, resetting state");

        let hook = lock(&self.shared.on_complete).clone();
        if let Some(hook) = hook {
            if panic::catch_unwind(AssertUnwindSafe(|| (*hook)())).is_err() {
                tracing::warn!("mission completion hook panicked");
            }
        }

        self.shared.events.emit(MissionEvent::Completed(MissionSummary {
            successful_rounds: self.successful_rounds,
            rounds: self.plan.rounds(),
            final_phase,
            aborted,
        }));
    }
}

impl Drop for MissionRun {
    fn drop(&mut self) {
        self.land();
        self.finish();
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
