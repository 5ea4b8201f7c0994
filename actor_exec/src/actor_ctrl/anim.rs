//! # Animation coordinator
//!
//! Keeps the actor's skeleton animation in step with the distance it actually walks. The
//! animation clock advances by `distance * animation_factor` every tick, so feet don't slide when
//! the walking speed changes, and the clock stops whenever the actor stops.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use serde::Serialize;
use thiserror::Error;

// Internal
use super::FollowMode;
use crate::pose::Pose2D;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Nominal duration of a custom trajectory.
pub const TRAJECTORY_DURATION_S: f64 = 1.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A custom trajectory handed to the host in place of its own scripted one.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct TrajectoryInfo {
    pub trajectory: Trajectory,
    pub duration_s: f64,
}

/// Animation update produced each tick.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct AnimDirective {
    /// The animation the actor should be playing
    pub trajectory: Trajectory,

    /// New animation script time
    pub script_time_s: f64,

    /// True if `trajectory` differs from the previous tick
    pub changed: bool,
}

/// Tracks the animation clock and the current animation label.
#[derive(Debug, Clone)]
pub struct AnimationCoordinator {
    animation_factor: f64,
    clock_s: f64,
    trajectory: Trajectory,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The animations an actor can play.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum Trajectory {
    Walking,
    Standing,
}

/// The actor's skin is missing a required animation.
#[derive(Debug, Error, PartialEq)]
#[error("Skeleton animation \"{0}\" was not found on the actor")]
pub struct MissingAnimation(pub &'static str);

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Trajectory {
    /// Name of the skeleton animation playing this trajectory.
    pub fn label(&self) -> &'static str {
        match self {
            Trajectory::Walking => "walking",
            Trajectory::Standing => "standing",
        }
    }

    /// Check that both animations exist in the given list of animation
    /// names.
    pub fn check_available<S: AsRef<str>>(animations: &[S]) -> Result<(), MissingAnimation> {
        for t in [Trajectory::Walking, Trajectory::Standing].iter() {
            if !animations.iter().any(|a| a.as_ref() == t.label()) {
                return Err(MissingAnimation(t.label()));
            }
        }

        Ok(())
    }
}

impl TrajectoryInfo {
    pub fn new(trajectory: Trajectory) -> Self {
        Self {
            trajectory,
            duration_s: TRAJECTORY_DURATION_S,
        }
    }
}

impl AnimationCoordinator {
    /// Create a new coordinator starting from the given script time, with the
    /// actor standing.
    pub fn new(animation_factor: f64, script_time_s: f64) -> Self {
        Self {
            animation_factor,
            clock_s: script_time_s,
            trajectory: Trajectory::Standing,
        }
    }

    /// Advance the animation for a tick that moved the actor from `old_pose`
    /// to `new_pose`.
    ///
    /// In velocity mode the actor always walks. In path mode it walks while
    /// heading towards a target and stands otherwise.
    pub fn update(
        &mut self,
        mode: FollowMode,
        walking: bool,
        old_pose: &Pose2D,
        new_pose: &Pose2D,
    ) -> AnimDirective {
        let distance_m = (new_pose.position() - old_pose.position()).norm();
        self.clock_s += distance_m * self.animation_factor;

        let trajectory = match mode {
            FollowMode::Velocity => Trajectory::Walking,
            FollowMode::Path if walking => Trajectory::Walking,
            FollowMode::Path => Trajectory::Standing,
        };

        let changed = trajectory != self.trajectory;
        if changed {
            debug!("Switching animation to {}", trajectory.label());
        }
        self.trajectory = trajectory;

        AnimDirective {
            trajectory,
            script_time_s: self.clock_s,
            changed,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clock_follows_distance() {
        let mut anim = AnimationCoordinator::new(4.0, 1.0);

        let d = anim.update(
            FollowMode::Path,
            true,
            &Pose2D::new(0.0, 0.0, 0.0),
            &Pose2D::new(3.0, 4.0, 0.0),
        );

        assert_eq!(d.script_time_s, 21.0);
        assert_eq!(d.trajectory, Trajectory::Walking);
        assert!(d.changed);

        // Turning on the spot doesn't advance the clock
        let d = anim.update(
            FollowMode::Path,
            true,
            &Pose2D::new(3.0, 4.0, 0.0),
            &Pose2D::new(3.0, 4.0, 1.0),
        );
        assert_eq!(d.script_time_s, 21.0);
        assert!(!d.changed);
    }

    #[test]
    fn test_standing_switch_reported_once() {
        let mut anim = AnimationCoordinator::new(4.0, 0.0);
        let p = Pose2D::default();

        anim.update(FollowMode::Path, true, &p, &p);
        assert!(anim.update(FollowMode::Path, false, &p, &p).changed);

        let d = anim.update(FollowMode::Path, false, &p, &p);
        assert!(!d.changed);
        assert_eq!(d.trajectory, Trajectory::Standing);
    }

    #[test]
    fn test_velocity_mode_always_walks() {
        let mut anim = AnimationCoordinator::new(4.0, 0.0);
        let p = Pose2D::default();

        let d = anim.update(FollowMode::Velocity, false, &p, &p);
        assert_eq!(d.trajectory, Trajectory::Walking);
    }

    #[test]
    fn test_check_available() {
        assert_eq!(
            Trajectory::check_available(&["standing", "walking", "running"]),
            Ok(())
        );
        assert_eq!(
            Trajectory::check_available(&["standing"]),
            Err(MissingAnimation("walking"))
        );
        assert_eq!(
            Trajectory::check_available::<String>(&[]),
            Err(MissingAnimation("walking"))
        );
    }
}
