//! # Simulation host
//!
//! A minimal in-memory host for a single actor. It stores whatever pose and animation state the
//! plugin gives it, which is enough to run actor control without an external simulator.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use crate::{
    actor_ctrl::{Trajectory, TrajectoryInfo},
    plugin::Host,
    pose::ActorPose,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// In-memory host for one actor.
#[derive(Debug, Clone)]
pub struct SimHost {
    name: String,
    ready: bool,
    pose: ActorPose,
    animations: Vec<String>,
    script_time_s: f64,
    custom_trajectory: Option<TrajectoryInfo>,

    /// Animation currently played by the custom trajectory
    trajectory: Option<Trajectory>,

    /// Number of times the trajectory type has been set
    trajectory_switches: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimHost {
    /// Create a ready host with an actor at `pose` that has both the walking
    /// and standing animations.
    pub fn new(name: &str, pose: ActorPose) -> Self {
        Self {
            name: String::from(name),
            ready: true,
            pose,
            animations: vec![
                String::from(Trajectory::Walking.label()),
                String::from(Trajectory::Standing.label()),
            ],
            script_time_s: 0.0,
            custom_trajectory: None,
            trajectory: None,
            trajectory_switches: 0,
        }
    }

    /// Replace the actor's animations.
    pub fn with_animations(mut self, animations: Vec<String>) -> Self {
        self.animations = animations;
        self
    }

    pub fn with_ready(mut self, ready: bool) -> Self {
        self.ready = ready;
        self
    }

    pub fn custom_trajectory(&self) -> Option<TrajectoryInfo> {
        self.custom_trajectory
    }

    pub fn trajectory(&self) -> Option<Trajectory> {
        self.trajectory
    }

    pub fn trajectory_switches(&self) -> usize {
        self.trajectory_switches
    }
}

impl Host for SimHost {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn actor_name(&self) -> &str {
        &self.name
    }

    fn world_pose(&self) -> ActorPose {
        self.pose
    }

    fn set_world_pose(&mut self, pose: ActorPose) {
        self.pose = pose;
    }

    fn skeleton_animations(&self) -> Vec<String> {
        self.animations.clone()
    }

    fn script_time(&self) -> f64 {
        self.script_time_s
    }

    fn set_script_time(&mut self, script_time_s: f64) {
        self.script_time_s = script_time_s;
    }

    fn set_custom_trajectory(&mut self, trajectory: Option<TrajectoryInfo>) {
        self.trajectory = trajectory.map(|t| t.trajectory);
        self.custom_trajectory = trajectory;
    }

    fn set_trajectory_type(&mut self, trajectory: Trajectory) {
        // Only a custom trajectory can change type
        if let Some(ref mut info) = self.custom_trajectory {
            info.trajectory = trajectory;
            self.trajectory = Some(trajectory);
            self.trajectory_switches += 1;
        }
    }
}
