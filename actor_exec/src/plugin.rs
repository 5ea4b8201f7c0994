//! # Actor plugin
//!
//! Binds actor control to a simulation host. The host owns the actor (its world pose, skeleton
//! animations and animation script time) and calls [`ActorPlugin::on_update`] once per
//! simulation step.
//!
//! Loading the plugin builds the controller from the actor's current pose, hands the host a
//! custom trajectory so the controller can drive the animation, and starts the command channels.
//! If the actor's skin is missing the walking or standing animation the plugin still runs, but
//! the actor moves without switching animation.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, error, info, trace};

use crate::{
    actor_ctrl::{
        ActorCtrl, ActorCtrlError, FollowMode, InitData, InputData, OutputData, Params,
        StatusReport, Trajectory, TrajectoryInfo,
    },
    cmd_channels::{CmdBuffers, CmdChannels, CmdChannelsError, CmdSource, CmdSources},
    pose::ActorPose,
};
use comms_if::cmd::{AbortCmd, PathCmd, VelocityCmd};
use util::module::State;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// The simulator-side view of an actor.
pub trait Host {
    /// True once the simulation is able to host the plugin.
    fn is_ready(&self) -> bool;

    fn actor_name(&self) -> &str;

    fn world_pose(&self) -> ActorPose;

    fn set_world_pose(&mut self, pose: ActorPose);

    /// Names of the skeleton animations available on the actor.
    fn skeleton_animations(&self) -> Vec<String>;

    /// Current animation script time in seconds.
    fn script_time(&self) -> f64;

    fn set_script_time(&mut self, script_time_s: f64);

    /// Replace the actor's scripted trajectory with a custom one, or remove
    /// it with `None`.
    fn set_custom_trajectory(&mut self, trajectory: Option<TrajectoryInfo>);

    /// Change the animation played by the custom trajectory.
    fn set_trajectory_type(&mut self, trajectory: Trajectory);
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Actor control attached to a host.
pub struct ActorPlugin<H: Host> {
    channels: CmdChannels,
    buffers: CmdBuffers,
    ctrl: ActorCtrl,
    host: H,

    /// False if the actor is missing an animation, in which case trajectory
    /// changes aren't passed to the host.
    animated: bool,

    odom_channel: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("The simulation host is not ready, unable to load the plugin")]
    HostNotReady,

    #[error("Could not initialise actor control: {0}")]
    InitError(ActorCtrlError),

    #[error("Could not start the command channels: {0}")]
    ChannelsError(CmdChannelsError),

    #[error("Actor control failed: {0}")]
    TickError(ActorCtrlError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<H: Host> ActorPlugin<H> {
    /// Attach actor control to the host and start receiving commands.
    pub fn load<V, P, A>(
        mut host: H,
        params: Params,
        sources: CmdSources<V, P, A>,
    ) -> Result<Self, PluginError>
    where
        V: CmdSource<VelocityCmd>,
        P: CmdSource<PathCmd>,
        A: CmdSource<AbortCmd>,
    {
        if !host.is_ready() {
            error!("The simulation host is not ready, unable to load the actor plugin");
            return Err(PluginError::HostNotReady);
        }

        let name = String::from(host.actor_name());
        let odom_channel = format!("{}/{}", name, params.odom_channel);
        let follow_mode = params.follow_mode;

        let ctrl = ActorCtrl::init(InitData {
            params,
            start_pose: host.world_pose(),
            child_frame_id: name.clone(),
            script_time_s: host.script_time(),
        })
        .map_err(PluginError::InitError)?;

        let animated = set_custom_trajectory(&mut host);

        let (channels, buffers) = CmdChannels::start(sources).map_err(PluginError::ChannelsError)?;

        info!(
            "Actor plugin loaded for \"{}\" in {:?} mode, publishing odometry on {}",
            name, follow_mode, odom_channel
        );

        Ok(Self {
            channels,
            buffers,
            ctrl,
            host,
            animated,
            odom_channel,
        })
    }

    /// Run one simulation step at `sim_time_s`.
    ///
    /// The new pose and animation state are applied to the host. The output
    /// carries the odometry sample to publish.
    pub fn on_update(&mut self, sim_time_s: f64) -> Result<(OutputData, StatusReport), PluginError> {
        let vel_cmd = match self.ctrl.follow_mode() {
            FollowMode::Velocity => self.buffers.pop_velocity(),
            FollowMode::Path => {
                let num_discarded = self.buffers.discard_velocity();
                if num_discarded > 0 {
                    trace!("Discarded {} velocity commands in path mode", num_discarded);
                }
                None
            }
        };

        let input = InputData {
            sim_time_s,
            pose: self.host.world_pose(),
            vel_cmd,
            target_cmds: self.buffers.drain_target_cmds(),
        };

        let (output, report) = self.ctrl.proc(&input).map_err(PluginError::TickError)?;

        self.host.set_world_pose(output.pose);
        self.host.set_script_time(output.anim.script_time_s);

        if self.animated && output.anim.changed {
            self.host.set_trajectory_type(output.anim.trajectory);
        }

        Ok((output, report))
    }

    /// Restart control from the actor's current pose, as after a world reset.
    pub fn reset(&mut self) {
        debug!("Resetting actor plugin");

        let pose = self.host.world_pose();
        self.ctrl.reset(&pose, self.host.script_time());
        self.animated = set_custom_trajectory(&mut self.host);
    }

    /// True if the actor's animation follows its motion.
    pub fn is_animated(&self) -> bool {
        self.animated
    }

    /// Channel the odometry should be published on.
    pub fn odom_channel(&self) -> &str {
        &self.odom_channel
    }

    pub fn controller(&self) -> &ActorCtrl {
        &self.ctrl
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    #[cfg(test)]
    fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

impl<H: Host> Drop for ActorPlugin<H> {
    fn drop(&mut self) {
        // Listeners must be gone before the buffers they feed
        self.channels.stop();
        debug!("Actor plugin unloaded");
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Give the host a standing custom trajectory if the actor has both
/// animations. Returns `false` if it doesn't.
fn set_custom_trajectory<H: Host>(host: &mut H) -> bool {
    match Trajectory::check_available(&host.skeleton_animations()) {
        Ok(()) => {
            host.set_custom_trajectory(Some(TrajectoryInfo::new(Trajectory::Standing)));
            true
        }
        Err(e) => {
            error!("{}, the actor will move without animation", e);
            host.set_custom_trajectory(None);
            false
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        cmd_channels::{CmdSenders, CmdSourceError, InProcessSources},
        pose::Pose2D,
        sim_host::SimHost,
    };
    use comms_if::cmd::{ActorCmd, CmdType, PoseStamped};
    use std::{thread, time::Duration};

    const DT_S: f64 = 0.1;

    fn path_params() -> Params {
        Params {
            follow_mode: FollowMode::Path,
            ..Default::default()
        }
    }

    fn load(host: SimHost, params: Params) -> (ActorPlugin<SimHost>, CmdSenders) {
        let (sources, senders) = InProcessSources::in_process();
        (ActorPlugin::load(host, params, sources).unwrap(), senders)
    }

    /// Give the listeners time to move sent commands into the buffers.
    fn settle() {
        thread::sleep(Duration::from_millis(50));
    }

    /// Tick until `pred` holds on the report.
    fn tick_until<F: Fn(&StatusReport) -> bool>(
        plugin: &mut ActorPlugin<SimHost>,
        time_s: &mut f64,
        max_ticks: usize,
        pred: F,
    ) -> Option<StatusReport> {
        for _ in 0..max_ticks {
            *time_s += DT_S;
            let (_, report) = plugin.on_update(*time_s).unwrap();
            if pred(&report) {
                return Some(report);
            }
        }

        None
    }

    #[test]
    fn test_host_not_ready() {
        let (sources, _senders) = InProcessSources::in_process();
        let host = SimHost::new("actor", ActorPose::default()).with_ready(false);

        assert!(matches!(
            ActorPlugin::load(host, path_params(), sources),
            Err(PluginError::HostNotReady)
        ));
    }

    #[test]
    fn test_walks_path_and_animates() {
        let (mut plugin, senders) = load(SimHost::new("bob", ActorPose::default()), path_params());
        assert!(plugin.is_animated());
        assert_eq!(plugin.odom_channel(), "bob/odom");
        assert_eq!(
            plugin.host().custom_trajectory(),
            Some(TrajectoryInfo::new(Trajectory::Standing))
        );

        senders
            .send(ActorCmd::Path(PathCmd {
                poses: vec![PoseStamped::planar(1.0, 0.0, 0.0)],
            }))
            .unwrap();
        settle();

        let mut time_s = 0.0;
        let report = tick_until(&mut plugin, &mut time_s, 500, |r| r.path_complete).unwrap();
        assert_eq!(report.target_index, 0);

        let pose = plugin.host().world_pose().to_pose2d();
        assert!((pose.x_m - 1.0).abs() < 0.1);
        assert!(plugin.host().script_time() > 3.0);

        // Walking then standing, each pushed once
        assert_eq!(plugin.host().trajectory_switches(), 2);
        assert_eq!(plugin.host().trajectory(), Some(Trajectory::Standing));
    }

    #[test]
    fn test_missing_animation_degrades() {
        let host = SimHost::new("actor", ActorPose::default())
            .with_animations(vec![String::from("standing")]);
        let (mut plugin, senders) = load(host, path_params());

        assert!(!plugin.is_animated());
        assert_eq!(plugin.host().custom_trajectory(), None);

        senders
            .send(ActorCmd::Path(PathCmd {
                poses: vec![PoseStamped::planar(1.0, 0.0, 0.0)],
            }))
            .unwrap();
        settle();

        let mut time_s = 0.0;
        assert!(tick_until(&mut plugin, &mut time_s, 500, |r| r.path_complete).is_some());
        assert_eq!(plugin.host().trajectory_switches(), 0);
        assert!(plugin.host().world_pose().position_m[0] > 0.9);
    }

    #[test]
    fn test_velocity_mode_pops_one_per_tick() {
        let (mut plugin, senders) = load(
            SimHost::new("actor", ActorPose::default()),
            Params::default(),
        );

        for v in [1.0, 2.0].iter() {
            senders
                .send(ActorCmd::Velocity(VelocityCmd {
                    linear_x_ms: *v,
                    angular_z_rads: 0.0,
                }))
                .unwrap();
        }
        settle();

        let (out, _) = plugin.on_update(DT_S).unwrap();
        assert!((out.twist.linear_x_ms - 1.0).abs() < 1e-9);
        let (out, _) = plugin.on_update(2.0 * DT_S).unwrap();
        assert!((out.twist.linear_x_ms - 2.0).abs() < 1e-9);

        // The last command stays active
        let (out, _) = plugin.on_update(3.0 * DT_S).unwrap();
        assert!((out.twist.linear_x_ms - 2.0).abs() < 1e-9);
        assert_eq!(out.odom.child_frame_id, "actor");
    }

    #[test]
    fn test_reset_restarts_from_current_pose() {
        let start = ActorPose::from_pose2d(&Pose2D::new(2.0, 2.0, 0.0), 1.0, 0.0);
        let (mut plugin, senders) = load(SimHost::new("actor", start), path_params());

        senders
            .send(ActorCmd::Path(PathCmd {
                poses: vec![PoseStamped::planar(5.0, 2.0, 0.0)],
            }))
            .unwrap();
        settle();

        let mut time_s = 0.0;
        for _ in 0..5 {
            time_s += DT_S;
            plugin.on_update(time_s).unwrap();
        }
        assert!(plugin.host().world_pose().position_m[0] > 2.4);

        plugin.reset();
        assert_eq!(plugin.controller().last_update_s(), 0.0);

        let here = plugin.host().world_pose();
        let (out, report) = plugin.on_update(DT_S).unwrap();
        assert!(report.path_complete);
        assert_eq!(out.pose.position_m, here.position_m);
        assert_eq!(out.pose.position_m[2], 1.0);
    }

    #[test]
    fn test_abort_survives_rejected_tick() {
        let (mut plugin, senders) = load(SimHost::new("actor", ActorPose::default()), path_params());

        senders
            .send(ActorCmd::Path(PathCmd {
                poses: vec![PoseStamped::planar(5.0, 0.0, 0.0)],
            }))
            .unwrap();
        settle();

        let mut time_s = 0.0;
        for _ in 0..3 {
            time_s += DT_S;
            plugin.on_update(time_s).unwrap();
        }
        let good = plugin.host().world_pose();
        assert!(good.position_m[0] > 0.2);

        senders
            .send(ActorCmd::Abort(AbortCmd { abort: true }))
            .unwrap();
        settle();

        // The abort is taken from its channel by a tick the controller rejects
        let mut bad = good;
        bad.position_m[0] = f64::NAN;
        plugin.host_mut().set_world_pose(bad);
        time_s += DT_S;
        assert!(matches!(
            plugin.on_update(time_s),
            Err(PluginError::TickError(ActorCtrlError::NonFinitePose))
        ));

        plugin.host_mut().set_world_pose(good);
        time_s += DT_S;
        let (out, report) = plugin.on_update(time_s).unwrap();
        assert!(report.holding);
        assert_eq!(out.pose.position_m[0], good.position_m[0]);
        assert_eq!(out.twist.linear_x_ms, 0.0);
    }

    #[test]
    fn test_drop_stops_listeners() {
        let (plugin, senders) = load(SimHost::new("actor", ActorPose::default()), path_params());

        drop(plugin);

        assert!(matches!(
            senders.send(ActorCmd::Abort(AbortCmd { abort: true })),
            Err(CmdSourceError::ChannelClosed(CmdType::Abort))
        ));
    }
}
