//! Error types for vehicle commands and mission control.

use thiserror::Error;

/// Failure of a single actuator command.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActuatorError {
    /// The vehicle link is down.
    #[error("vehicle not connected")]
    NotConnected,
    /// The vehicle refused or did not acknowledge the command.
    #[error("command `{command}` rejected by vehicle")]
    Rejected { command: &'static str },
    /// Transport-level failure while sending the command.
    #[error("link error: {0}")]
    Link(String),
}

impl ActuatorError {
    pub fn rejected(command: &'static str) -> Self {
        Self::Rejected { command }
    }
}

/// Errors surfaced by [`MissionController`](crate::mission::MissionController).
#[derive(Debug, Error)]
pub enum MissionError {
    #[error("mission already running")]
    AlreadyRunning,
    #[error("vehicle not connected")]
    NotConnected,
    #[error("takeoff failed: {0}")]
    TakeoffFailed(#[source] ActuatorError),
    /// The mission worker panicked; the payload message is kept.
    #[error("mission worker panicked: {0}")]
    Panicked(String),
    #[error("failed to spawn mission worker: {0}")]
    Spawn(#[from] std::io::Error),
}
