//! # Motion integrator
//!
//! Computes one tick of actor motion for either follow mode.
//!
//! In path mode the actor walks straight at its current target with a heading gate: while the
//! heading error exceeds the angular tolerance the actor turns on the spot at the configured rate,
//! otherwise it walks at the configured speed and its yaw is snapped onto the target heading. A
//! step never carries the actor past its target, so it lands on the target instead of straddling
//! it when the speed is large compared to the linear tolerance.
//!
//! In velocity mode the active velocity command is integrated directly, with the linear velocity
//! applied along the actor's heading.
//!
//! A non-positive `dt_s` integrates no motion and reports a zero twist.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use super::{Params, TargetTracker};
use crate::pose::{Pose2D, Twist2D};
use comms_if::cmd::VelocityCmd;
use util::maths::{sign, wrap_pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Result of a single integration step.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct Step {
    /// Pose at the end of the step
    pub pose: Pose2D,

    /// Velocity applied during the step
    pub twist: Twist2D,

    /// Signed heading error to the current target, zero when not walking
    /// towards one.
    pub heading_error_rad: f64,

    /// Distance from the new pose to the current target
    pub distance_to_target_m: f64,

    /// True if the actor turned on the spot this step
    pub rotating: bool,

    /// True if the actor is heading somewhere, i.e. the walking animation
    /// should play.
    pub walking: bool,

    /// True if the final waypoint of the path has been reached
    pub path_complete: bool,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute one path following step, advancing or holding the tracker as
/// required.
pub fn path_step(
    pose: &Pose2D,
    dt_s: f64,
    tracker: &mut TargetTracker,
    params: &Params,
) -> Step {
    let position = pose.position();
    let mut path_complete = false;

    let to_target = if tracker.is_holding() {
        tracker.hold_at(pose);
        Vector2::zeros()
    } else if tracker.has_reached(&position, params.linear_tolerance_m) && !tracker.advance() {
        path_complete = true;
        Vector2::zeros()
    } else {
        tracker.current_target().position() - position
    };

    let direction = match to_target.try_normalize(0.0) {
        Some(d) => d,
        None => Vector2::zeros(),
    };
    let walking = direction != Vector2::zeros();

    let mut step = heading_step(pose, &direction, to_target.norm(), dt_s, params);
    step.walking = walking;
    step.path_complete = path_complete;
    step.distance_to_target_m = (tracker.current_target().position() - step.pose.position()).norm();

    step
}

/// Compute one velocity following step from the active velocity command.
pub fn velocity_step(pose: &Pose2D, dt_s: f64, active: &VelocityCmd, params: &Params) -> Step {
    let heading_rad = pose.yaw_rad - params.default_rotation_rad;

    let mut step = Step {
        pose: *pose,
        walking: true,
        ..Default::default()
    };

    if dt_s <= 0.0 {
        return step;
    }

    step.twist = Twist2D {
        linear_x_ms: active.linear_x_ms * heading_rad.cos(),
        linear_y_ms: active.linear_x_ms * heading_rad.sin(),
        angular_z_rads: active.angular_z_rads,
    };

    step.pose.x_m += step.twist.linear_x_ms * dt_s;
    step.pose.y_m += step.twist.linear_y_ms * dt_s;
    step.pose.yaw_rad = wrap_pi(pose.yaw_rad + step.twist.angular_z_rads * dt_s);

    step
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Turn towards or walk along the unit vector `direction`, walking no further
/// than `max_distance_m`.
///
/// A zero direction leaves the actor where it is.
fn heading_step(
    pose: &Pose2D,
    direction: &Vector2<f64>,
    max_distance_m: f64,
    dt_s: f64,
    params: &Params,
) -> Step {
    let mut step = Step {
        pose: *pose,
        ..Default::default()
    };

    if *direction == Vector2::zeros() {
        return step;
    }

    step.heading_error_rad = wrap_pi(
        direction[1].atan2(direction[0]) + params.default_rotation_rad - pose.yaw_rad,
    );
    step.rotating = step.heading_error_rad.abs() > params.angular_tolerance_rad;

    if dt_s <= 0.0 {
        return step;
    }

    if step.rotating {
        let rate_rads = sign(step.heading_error_rad) * params.angular_velocity_rads;

        step.pose.yaw_rad = wrap_pi(pose.yaw_rad + rate_rads * dt_s);
        step.twist.angular_z_rads = rate_rads;
    } else {
        let distance_m = (params.linear_velocity_ms * dt_s).min(max_distance_m);
        let velocity_ms = direction * (distance_m / dt_s);

        step.pose.x_m += velocity_ms[0] * dt_s;
        step.pose.y_m += velocity_ms[1] * dt_s;
        step.pose.yaw_rad = wrap_pi(pose.yaw_rad + step.heading_error_rad);

        step.twist.linear_x_ms = velocity_ms[0];
        step.twist.linear_y_ms = velocity_ms[1];
        step.twist.angular_z_rads = step.heading_error_rad / dt_s;
    }

    step
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
