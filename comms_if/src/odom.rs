//! # Odometry module
//!
//! The odometry message published by the actor every simulation step.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::cmd::Quaternion;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// The fixed reference frame odometry is expressed in.
pub const ODOM_FRAME_ID: &str = "map";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A timestamped odometry sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Odometry {
    pub header: Header,

    /// Frame of the twist, the actor's name.
    pub child_frame_id: String,

    pub pose: PoseMsg,

    pub twist: TwistMsg,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// The frame the pose is given in, always [`ODOM_FRAME_ID`].
    pub frame_id: String,

    /// Simulation time of the sample in seconds.
    pub stamp_s: f64,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseMsg {
    pub position_m: [f64; 3],
    pub orientation: Quaternion,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TwistMsg {
    /// Linear velocity in meters/second.
    pub linear_ms: [f64; 3],

    /// Angular velocity in radians/second.
    pub angular_rads: [f64; 3],
}

/// A flat version of [`Odometry`] used for CSV archiving.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OdomRecord {
    pub stamp_s: f64,
    pub x_m: f64,
    pub y_m: f64,
    pub qx: f64,
    pub qy: f64,
    pub qz: f64,
    pub qw: f64,
    pub linear_x_ms: f64,
    pub linear_y_ms: f64,
    pub angular_z_rads: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Odometry {
    /// Flatten the sample for archiving.
    pub fn to_record(&self) -> OdomRecord {
        OdomRecord {
            stamp_s: self.header.stamp_s,
            x_m: self.pose.position_m[0],
            y_m: self.pose.position_m[1],
            qx: self.pose.orientation.x,
            qy: self.pose.orientation.y,
            qz: self.pose.orientation.z,
            qw: self.pose.orientation.w,
            linear_x_ms: self.twist.linear_ms[0],
            linear_y_ms: self.twist.linear_ms[1],
            angular_z_rads: self.twist.angular_rads[2],
        }
    }
}
