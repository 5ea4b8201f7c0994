//! # Pose module
//!
//! Planar and world poses of the actor, plus the waypoints it walks towards.
//!
//! The controller works entirely on the ground plane with a [`Pose2D`]. The host world uses a
//! full 3D [`ActorPose`], whose attitude carries the actor's mesh alignment rotation (see
//! `default_rotation_rad` in the controller parameters) as a roll about the X axis.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{Quaternion, UnitQuaternion, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use comms_if::cmd::{PathCmd, PoseStamped};
use util::maths::wrap_pi;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Quaternions with a norm below this value can't be normalised into a heading.
const MIN_QUAT_NORM: f64 = 1e-9;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Pose of the actor on the ground plane.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    pub x_m: f64,
    pub y_m: f64,

    /// Heading about the vertical axis, positive to the left of the map X axis.
    pub yaw_rad: f64,
}

/// Planar velocity of the actor in the map frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Twist2D {
    pub linear_x_ms: f64,
    pub linear_y_ms: f64,
    pub angular_z_rads: f64,
}

/// A target pose taken from a path command. Waypoints are never modified after being received.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x_m: f64,
    pub y_m: f64,
    pub yaw_rad: f64,
}

/// Pose of the actor in the host world.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorPose {
    /// The position in the map frame
    pub position_m: Vector3<f64>,

    /// The attitude of the actor in the map frame, including the mesh alignment roll.
    pub attitude_q: UnitQuaternion<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Reasons a stamped pose can't be used as a waypoint.
#[derive(Debug, Error, PartialEq)]
pub enum WaypointError {
    #[error("Waypoint {0} has a non-finite position")]
    NonFinitePosition(usize),

    #[error("Waypoint {0} has a non-finite orientation")]
    NonFiniteOrientation(usize),

    #[error("Waypoint {0} has a zero-norm orientation quaternion")]
    ZeroNormOrientation(usize),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Pose2D {
    pub fn new(x_m: f64, y_m: f64, yaw_rad: f64) -> Self {
        Self { x_m, y_m, yaw_rad }
    }

    /// Position as a vector.
    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.x_m, self.y_m)
    }

    pub fn is_finite(&self) -> bool {
        self.x_m.is_finite() && self.y_m.is_finite() && self.yaw_rad.is_finite()
    }
}

impl Waypoint {
    pub fn new(x_m: f64, y_m: f64, yaw_rad: f64) -> Self {
        Self { x_m, y_m, yaw_rad }
    }

    /// Position as a vector.
    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.x_m, self.y_m)
    }

    /// Build a waypoint from the `index`th pose of a path command.
    ///
    /// Only the X and Y position and the yaw of the orientation are kept. Non-unit orientations
    /// are normalised.
    pub fn from_pose_stamped(index: usize, pose: &PoseStamped) -> Result<Self, WaypointError> {
        if !pose.position_m.iter().all(|p| p.is_finite()) {
            return Err(WaypointError::NonFinitePosition(index));
        }

        let q = &pose.orientation;
        if !q.is_finite() {
            return Err(WaypointError::NonFiniteOrientation(index));
        }

        let attitude = UnitQuaternion::try_new(Quaternion::new(q.w, q.x, q.y, q.z), MIN_QUAT_NORM)
            .ok_or(WaypointError::ZeroNormOrientation(index))?;

        Ok(Self {
            x_m: pose.position_m[0],
            y_m: pose.position_m[1],
            yaw_rad: attitude.euler_angles().2,
        })
    }
}

impl From<Pose2D> for Waypoint {
    fn from(pose: Pose2D) -> Self {
        Self::new(pose.x_m, pose.y_m, pose.yaw_rad)
    }
}

/// Convert every pose in a path command into a waypoint.
///
/// The whole path is rejected if any single pose is unusable, so a partially valid path never
/// replaces the current one.
pub fn waypoints_from_path(path: &PathCmd) -> Result<Vec<Waypoint>, WaypointError> {
    path.poses
        .iter()
        .enumerate()
        .map(|(i, p)| Waypoint::from_pose_stamped(i, p))
        .collect()
}

impl ActorPose {
    /// Build a world pose from a planar one.
    ///
    /// The attitude is the mesh alignment roll followed by the planar yaw.
    pub fn from_pose2d(pose: &Pose2D, elevation_m: f64, default_rotation_rad: f64) -> Self {
        Self {
            position_m: Vector3::new(pose.x_m, pose.y_m, elevation_m),
            attitude_q: UnitQuaternion::from_euler_angles(default_rotation_rad, 0.0, pose.yaw_rad),
        }
    }

    /// Return the heading (angle to the positive map X axis) of the actor in radians, in the
    /// range (-pi, pi].
    pub fn get_heading(&self) -> f64 {
        wrap_pi(self.attitude_q.euler_angles().2)
    }

    /// Project the pose onto the ground plane.
    pub fn to_pose2d(&self) -> Pose2D {
        Pose2D {
            x_m: self.position_m[0],
            y_m: self.position_m[1],
            yaw_rad: self.get_heading(),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.position_m.iter().all(|p| p.is_finite())
            && self.attitude_q.coords.iter().all(|c| c.is_finite())
    }
}

impl Default for ActorPose {
    fn default() -> Self {
        Self {
            position_m: Vector3::zeros(),
            attitude_q: UnitQuaternion::identity(),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::cmd::Quaternion as CmdQuaternion;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_waypoint_from_pose_stamped() {
        let wp = Waypoint::from_pose_stamped(0, &PoseStamped::planar(1.0, -2.0, FRAC_PI_2)).unwrap();

        assert_eq!(wp.x_m, 1.0);
        assert_eq!(wp.y_m, -2.0);
        assert!((wp.yaw_rad - FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_waypoint_normalises_orientation() {
        let mut pose = PoseStamped::planar(0.0, 0.0, 0.0);
        pose.orientation = CmdQuaternion {
            x: 0.0,
            y: 0.0,
            z: 2.0,
            w: 2.0,
        };

        let wp = Waypoint::from_pose_stamped(0, &pose).unwrap();
        assert!((wp.yaw_rad - FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_path_rejected() {
        let mut path = PathCmd {
            poses: vec![PoseStamped::planar(1.0, 0.0, 0.0), PoseStamped::planar(2.0, 0.0, 0.0)],
        };
        assert_eq!(waypoints_from_path(&path).unwrap().len(), 2);

        path.poses[1].position_m[0] = f64::NAN;
        assert_eq!(
            waypoints_from_path(&path),
            Err(WaypointError::NonFinitePosition(1))
        );

        path.poses[1] = PoseStamped::planar(2.0, 0.0, 0.0);
        path.poses[0].orientation = CmdQuaternion {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 0.0,
        };
        assert_eq!(
            waypoints_from_path(&path),
            Err(WaypointError::ZeroNormOrientation(0))
        );

        path.poses[0].orientation.w = f64::INFINITY;
        assert_eq!(
            waypoints_from_path(&path),
            Err(WaypointError::NonFiniteOrientation(0))
        );
    }

    #[test]
    fn test_actor_pose_keeps_mesh_roll() {
        let pose = ActorPose::from_pose2d(&Pose2D::new(3.0, 4.0, 0.5), 1.2, FRAC_PI_2);
        let (roll, pitch, yaw) = pose.attitude_q.euler_angles();

        assert!((roll - FRAC_PI_2).abs() < 1e-9);
        assert!(pitch.abs() < 1e-9);
        assert!((yaw - 0.5).abs() < 1e-9);
        assert_eq!(pose.position_m[2], 1.2);

        let planar = pose.to_pose2d();
        assert_eq!(planar.x_m, 3.0);
        assert_eq!(planar.y_m, 4.0);
        assert!((planar.yaw_rad - 0.5).abs() < 1e-9);
    }
}
