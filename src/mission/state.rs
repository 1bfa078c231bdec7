use std::fmt;

use serde::Serialize;

/// Phase of the patrol state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "round", rename_all = "snake_case")]
pub enum MissionPhase {
    #[default]
    Idle,
    TakingOff,
    Ascending,
    SearchingInitialPad,
    /// 1-based round index
    RoundTrip(u8),
    PreparingLanding,
    Landing,
    Completed,
    /// Stop requested or the worker failed
    Aborted,
}

impl fmt::Display for MissionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::TakingOff => write!(f, "taking off"),
            Self::Ascending => write!(f, "ascending"),
            Self::SearchingInitialPad => write!(f, "searching initial pad"),
            Self::RoundTrip(i) => write!(f, "round trip {i}"),
            Self::PreparingLanding => write!(f, "preparing landing"),
            Self::Landing => write!(f, "landing"),
            Self::Completed => write!(f, "completed"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}
