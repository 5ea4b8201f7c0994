//! Implementations for the ActorCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{trace, warn};
use serde::Serialize;

// Internal
use super::{
    integrator::{self, Step},
    odom, ActorCtrlError, AnimDirective, AnimationCoordinator, FollowMode, Params, TargetCmd,
    TargetTracker,
};
use crate::pose::{ActorPose, Twist2D, Waypoint};
use comms_if::{cmd::VelocityCmd, odom::Odometry};
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Actor control module state
pub struct ActorCtrl {
    params: Params,

    /// Frame id of the published odometry, the actor's name
    child_frame_id: String,

    tracker: TargetTracker,

    /// Velocity command currently being followed
    active_vel: VelocityCmd,

    /// Simulation time of the last processed tick
    last_update_s: f64,

    anim: AnimationCoordinator,

    report: StatusReport,
}

/// Data required to initialise ActorCtrl.
pub struct InitData {
    pub params: Params,

    /// The actor's pose when control begins
    pub start_pose: ActorPose,

    /// Name of the actor, used as the odometry child frame
    pub child_frame_id: String,

    /// The host's animation script time when control begins
    pub script_time_s: f64,
}

/// Input data to Actor Control.
#[derive(Debug, Clone, Default)]
pub struct InputData {
    /// Current simulation time
    pub sim_time_s: f64,

    /// Current world pose of the actor
    pub pose: ActorPose,

    /// Velocity command received since the last tick, if any
    pub vel_cmd: Option<VelocityCmd>,

    /// Path and abort commands received since the last tick, in arrival
    /// order.
    pub target_cmds: Vec<TargetCmd>,
}

/// Output of a single tick.
#[derive(Debug, Clone)]
pub struct OutputData {
    /// New world pose to apply to the actor
    pub pose: ActorPose,

    /// Velocity applied this tick
    pub twist: Twist2D,

    /// Odometry sample to publish
    pub odom: Odometry,

    /// Animation update to apply to the actor
    pub anim: AnimDirective,
}

/// Status report for ActorCtrl processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    pub mode: FollowMode,

    /// Time step of this tick
    pub dt_s: f64,

    /// Index of the current target in the waypoint queue
    pub target_index: usize,

    /// Number of waypoints in the queue
    pub num_targets: usize,

    pub heading_error_rad: f64,

    pub distance_to_target_m: f64,

    /// True if the actor turned on the spot this tick
    pub rotating: bool,

    /// True if the actor is holding position after an abort or with an empty
    /// path.
    pub holding: bool,

    /// True if the final waypoint has been reached
    pub path_complete: bool,

    /// True if the animation changed this tick
    pub trajectory_changed: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for ActorCtrl {
    type InitData = InitData;
    type InitError = ActorCtrlError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = ActorCtrlError;

    /// Initialise the ActorCtrl module.
    ///
    /// The actor's only target is its starting pose, so it stays put until a
    /// command arrives.
    fn init(init_data: Self::InitData) -> Result<Self, Self::InitError> {
        init_data
            .params
            .validate()
            .map_err(ActorCtrlError::InvalidParams)?;

        if !init_data.start_pose.is_finite() {
            return Err(ActorCtrlError::NonFinitePose);
        }

        let start = Waypoint::from(init_data.start_pose.to_pose2d());

        Ok(Self {
            anim: AnimationCoordinator::new(
                init_data.params.animation_factor,
                init_data.script_time_s,
            ),
            params: init_data.params,
            child_frame_id: init_data.child_frame_id,
            tracker: TargetTracker::new(start),
            active_vel: VelocityCmd::default(),
            last_update_s: 0.0,
            report: StatusReport::default(),
        })
    }

    /// Process one simulation step.
    ///
    /// Processing involves:
    ///  1. Storing the commands received since the last tick. This happens
    ///     before the input is checked, so a rejected tick loses no commands.
    ///  1. Integrating the motion of the current follow mode.
    ///  1. Advancing the animation clock by the distance walked.
    ///  1. Packaging the result as odometry.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        // Commands are stored even if the tick is rejected below, they were
        // already taken from their channels
        for cmd in input_data.target_cmds.iter() {
            self.tracker.apply(cmd.clone());
        }
        if self.params.follow_mode == FollowMode::Velocity {
            if let Some(vel) = input_data.vel_cmd {
                trace!("New velocity command: {:?}", vel);
                self.active_vel = vel;
            }
        }

        if !input_data.sim_time_s.is_finite() {
            return Err(ActorCtrlError::NonFiniteTime(input_data.sim_time_s));
        }
        if !input_data.pose.is_finite() {
            return Err(ActorCtrlError::NonFinitePose);
        }

        let dt_s = input_data.sim_time_s - self.last_update_s;
        if dt_s < 0.0 {
            warn!(
                "Simulation time went backwards by {:.3} s, no motion integrated",
                -dt_s
            );
        }

        let pose = input_data.pose.to_pose2d();

        let step = match self.params.follow_mode {
            FollowMode::Path => integrator::path_step(&pose, dt_s, &mut self.tracker, &self.params),
            FollowMode::Velocity => {
                integrator::velocity_step(&pose, dt_s, &self.active_vel, &self.params)
            }
        };

        let anim = self
            .anim
            .update(self.params.follow_mode, step.walking, &pose, &step.pose);

        let odom = odom::emit(
            input_data.sim_time_s,
            &self.child_frame_id,
            &step.pose,
            &step.twist,
            self.params.default_rotation_rad,
        );

        // Elevation is owned by the host
        let new_pose = ActorPose::from_pose2d(
            &step.pose,
            input_data.pose.position_m[2],
            self.params.default_rotation_rad,
        );

        self.last_update_s = self.last_update_s.max(input_data.sim_time_s);
        self.update_report(dt_s, &step, &anim);

        Ok((
            OutputData {
                pose: new_pose,
                twist: step.twist,
                odom,
                anim,
            },
            self.report,
        ))
    }
}

impl ActorCtrl {
    /// Reset the controller as if it had just been initialised at `pose`.
    ///
    /// The host's animation script time becomes the new animation clock.
    pub fn reset(&mut self, pose: &ActorPose, script_time_s: f64) {
        self.last_update_s = 0.0;
        self.tracker.reset(Waypoint::from(pose.to_pose2d()));
        self.active_vel = VelocityCmd::default();
        self.anim = AnimationCoordinator::new(self.params.animation_factor, script_time_s);
        self.report = StatusReport::default();
    }

    /// The follow mode the controller was configured with.
    pub fn follow_mode(&self) -> FollowMode {
        self.params.follow_mode
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The waypoint currently being walked towards.
    pub fn current_target(&self) -> Waypoint {
        self.tracker.current_target()
    }

    /// Simulation time of the last processed tick.
    pub fn last_update_s(&self) -> f64 {
        self.last_update_s
    }

    /// The status report of the last tick.
    pub fn report(&self) -> StatusReport {
        self.report
    }

    fn update_report(&mut self, dt_s: f64, step: &Step, anim: &AnimDirective) {
        self.report = StatusReport {
            mode: self.params.follow_mode,
            dt_s,
            target_index: self.tracker.index(),
            num_targets: self.tracker.len(),
            heading_error_rad: step.heading_error_rad,
            distance_to_target_m: step.distance_to_target_m,
            rotating: step.rotating,
            holding: self.params.follow_mode == FollowMode::Path && self.tracker.is_holding(),
            path_complete: step.path_complete,
            trajectory_changed: anim.changed,
        };
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
