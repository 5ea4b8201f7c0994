//! Odometry emitter

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::UnitQuaternion;

// Internal
use crate::pose::{Pose2D, Twist2D};
use comms_if::{
    cmd::Quaternion,
    odom::{Header, Odometry, PoseMsg, TwistMsg, ODOM_FRAME_ID},
};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Package the result of a tick into an odometry sample.
///
/// The published heading has the mesh alignment rotation removed, and the
/// position is on the ground plane.
pub fn emit(
    stamp_s: f64,
    child_frame_id: &str,
    pose: &Pose2D,
    twist: &Twist2D,
    default_rotation_rad: f64,
) -> Odometry {
    let q = UnitQuaternion::from_euler_angles(0.0, 0.0, pose.yaw_rad - default_rotation_rad);

    Odometry {
        header: Header {
            frame_id: String::from(ODOM_FRAME_ID),
            stamp_s,
        },
        child_frame_id: String::from(child_frame_id),
        pose: PoseMsg {
            position_m: [pose.x_m, pose.y_m, 0.0],
            orientation: Quaternion {
                x: q.i,
                y: q.j,
                z: q.k,
                w: q.w,
            },
        },
        twist: TwistMsg {
            linear_ms: [twist.linear_x_ms, twist.linear_y_ms, 0.0],
            angular_rads: [0.0, 0.0, twist.angular_z_rads],
        },
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
