//! The patrol mission: vehicle abstraction, pad navigation and the worker
//! driven state machine.

mod actuator;
mod cleanup;
mod controller;
mod events;
mod locator;
mod plan;
mod state;
mod stop;
mod throttle;
mod timing;

pub use actuator::{Actuator, CommandResult, PadId, PadMove, RcCommand};
pub use cleanup::{CleanupCallback, CleanupRegistry, FnCleanup};
pub use controller::{FAR_PAD, HOME_PAD, MissionController};
pub use events::{Coords, EventSink, FnSink, MissionEvent, MissionSummary, NullSink, PositionReport};
pub use locator::{
    DEFAULT_ROTATION_ATTEMPTS, POSITIONING_SPEED, PadLocator, REQUIRED_CONFIRMATIONS,
    ROTATION_STEP_DEG,
};
pub use plan::MissionPlan;
pub use state::MissionPhase;
pub use stop::StopFlag;
pub use throttle::StatusThrottle;
pub use timing::MissionTiming;
