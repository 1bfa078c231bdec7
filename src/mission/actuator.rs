//! Vehicle actuator boundary.
//!
//! The radio protocol lives outside this crate. Implementations translate
//! these calls into vehicle commands and must be shareable with the mission
//! worker thread.

use crate::error::ActuatorError;

/// Numbered landing-pad marker.
pub type PadId = u8;

/// Result of a single vehicle command.
pub type CommandResult = Result<(), ActuatorError>;

/// Manual (RC-style) control with every axis clamped to [-100, 100].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RcCommand {
    pub left_right: i8,
    pub forward_back: i8,
    pub up_down: i8,
    pub yaw: i8,
}

impl RcCommand {
    pub const LIMIT: i32 = 100;

    pub fn new(left_right: i32, forward_back: i32, up_down: i32, yaw: i32) -> Self {
        let axis = |v: i32| v.clamp(-Self::LIMIT, Self::LIMIT) as i8;
        Self {
            left_right: axis(left_right),
            forward_back: axis(forward_back),
            up_down: axis(up_down),
            yaw: axis(yaw),
        }
    }

    /// All axes zero: hold position.
    pub fn hover() -> Self {
        Self::default()
    }

    /// Sideways burst, positive is right.
    pub fn lateral(magnitude: i32) -> Self {
        Self::new(magnitude, 0, 0, 0)
    }

    pub fn is_hover(&self) -> bool {
        *self == Self::hover()
    }
}

/// Relative move above a pad, clamped to what the vehicle accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadMove {
    pub pad: PadId,
    /// Offsets from the pad center in cm, [-500, 500]
    pub x: i32,
    pub y: i32,
    /// Height above the pad in cm, [20, 500]
    pub z: i32,
    /// cm/s, [10, 100]
    pub speed: i32,
}

impl PadMove {
    pub fn new(pad: PadId, x: i32, y: i32, z: i32, speed: i32) -> Self {
        Self {
            pad,
            x: x.clamp(-500, 500),
            y: y.clamp(-500, 500),
            z: z.clamp(20, 500),
            speed: speed.clamp(10, 100),
        }
    }

    /// Hover straight above the pad center.
    pub fn above(pad: PadId, height_cm: i32, speed: i32) -> Self {
        Self::new(pad, 0, 0, height_cm, speed)
    }
}

/// Capabilities the mission needs from the vehicle.
///
/// Commands take `&self`: the implementation owns whatever synchronization
/// its link needs. The mission issues commands from a single worker only.
pub trait Actuator: Send + Sync {
    fn is_connected(&self) -> bool;

    fn is_flying(&self) -> bool;

    /// Pad currently seen by the vehicle's own pad detection, if any.
    fn current_pad_id(&self) -> Option<PadId>;

    fn takeoff(&self) -> CommandResult;

    fn land(&self) -> CommandResult;

    fn set_height(&self, height_cm: i32) -> CommandResult;

    /// Rotate in place, clockwise positive.
    fn rotate(&self, degrees: i32) -> CommandResult;

    fn move_to_pad(&self, target: PadMove) -> CommandResult;

    fn manual_control(&self, command: RcCommand) -> CommandResult;
}
