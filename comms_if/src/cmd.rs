//! # Actor command module
//!
//! Defines the three commands which can be sent to a simulated actor:
//!
//! - [`VelocityCmd`] - a body-frame twist to follow, used in velocity follow mode.
//! - [`PathCmd`] - an ordered sequence of stamped poses to walk through, used in path follow mode.
//! - [`AbortCmd`] - suspend (or resume) progress along the current path.
//!
//! Commands arrive either on their own network channel, in which case the payload alone is sent,
//! or as a tagged [`ActorCmd`] (for example from a command script).

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use serde_json::{self, Value};
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A velocity command, expressed in the actor's body frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityCmd {
    /// Linear velocity along the body X axis in meters/second.
    pub linear_x_ms: f64,

    /// Angular velocity about the vertical axis in radians/second.
    ///
    /// Follows the right hand rule, so positive rates turn the actor to the left.
    pub angular_z_rads: f64,
}

/// A path command, the ordered list of poses the actor shall walk through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathCmd {
    pub poses: Vec<PoseStamped>,
}

/// A single timestamped pose within a path.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseStamped {
    /// Time the pose was stamped, in seconds. Not used for control.
    #[serde(default)]
    pub stamp_s: f64,

    /// Position in the map frame, in meters.
    pub position_m: [f64; 3],

    /// Orientation in the map frame.
    #[serde(default)]
    pub orientation: Quaternion,
}

/// A quaternion in `x, y, z, w` order.
///
/// No normalisation is performed on the wire, receivers must check the quaternion is usable.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

/// An abort command. `true` suspends path progress, `false` resumes it.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbortCmd {
    pub abort: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Any command that can be sent to the actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ActorCmd {
    #[serde(rename = "VEL")]
    Velocity(VelocityCmd),

    #[serde(rename = "PATH")]
    Path(PathCmd),

    #[serde(rename = "ABORT")]
    Abort(AbortCmd),
}

/// The type of a command, used to identify its payload.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CmdType {
    Velocity,
    Path,
    Abort,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum CmdParseError {
    #[error("Command contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("Command has an invalid type ({0})")]
    InvalidType(String),

    #[error("Command of type {0:?} is expected to have a payload but it doesn't")]
    MissingPayload(CmdType),

    #[error("Command of type {0:?} has an invalid payload: {1}")]
    InvalidPayload(CmdType, serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ActorCmd {
    /// Parse a new command from a JSON packet of the form `{"type": ..., "payload": ...}`.
    pub fn from_json(json_str: &str) -> Result<Self, CmdParseError> {
        let val: Value = serde_json::from_str(json_str).map_err(CmdParseError::InvalidJson)?;

        let type_str = match val["type"].as_str() {
            Some(s) => s,
            None => {
                return Err(CmdParseError::InvalidType(String::from(
                    "Expected \"type\" to be a string",
                )))
            }
        };

        let cmd_type = CmdType::from_str(type_str).ok_or_else(|| {
            CmdParseError::InvalidType(format!("{} is not a recognised command type", type_str))
        })?;

        // Every command carries a payload
        let payload = &val["payload"];
        if payload.is_null() {
            return Err(CmdParseError::MissingPayload(cmd_type));
        }

        let invalid = |e| CmdParseError::InvalidPayload(cmd_type, e);

        Ok(match cmd_type {
            CmdType::Velocity => {
                ActorCmd::Velocity(serde_json::from_value(payload.clone()).map_err(invalid)?)
            }
            CmdType::Path => ActorCmd::Path(serde_json::from_value(payload.clone()).map_err(invalid)?),
            CmdType::Abort => {
                ActorCmd::Abort(serde_json::from_value(payload.clone()).map_err(invalid)?)
            }
        })
    }

    /// Get the type of this command.
    pub fn cmd_type(&self) -> CmdType {
        match self {
            ActorCmd::Velocity(_) => CmdType::Velocity,
            ActorCmd::Path(_) => CmdType::Path,
            ActorCmd::Abort(_) => CmdType::Abort,
        }
    }
}

impl CmdType {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "VEL" => Some(CmdType::Velocity),
            "PATH" => Some(CmdType::Path),
            "ABORT" => Some(CmdType::Abort),
            _ => None,
        }
    }
}

impl Quaternion {
    /// The identity rotation.
    pub fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }

    /// Build a quaternion from a rotation about the vertical axis.
    pub fn from_yaw(yaw_rad: f64) -> Self {
        let half = 0.5 * yaw_rad;
        Self {
            x: 0.0,
            y: 0.0,
            z: half.sin(),
            w: half.cos(),
        }
    }

    /// True if every component is finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl PoseStamped {
    /// Create a pose on the ground plane with the given yaw.
    pub fn planar(x_m: f64, y_m: f64, yaw_rad: f64) -> Self {
        Self {
            stamp_s: 0.0,
            position_m: [x_m, y_m, 0.0],
            orientation: Quaternion::from_yaw(yaw_rad),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
