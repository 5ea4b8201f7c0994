//! # Actor control module
//!
//! Actor control moves a simulated actor each simulation step, either by integrating the most
//! recent velocity command or by walking it through the waypoints of the most recent path
//! command.
//!
//! The module is made up of:
//!
//! - `tracker` - the waypoint queue, current target and abort flag.
//! - `integrator` - the per-tick motion law for each follow mode.
//! - `anim` - the animation clock and walking/standing selection.
//! - `odom` - packaging of each tick's result into an odometry sample.
//! - `state` - [`ActorCtrl`], the cyclic module tying the above together.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod anim;
pub mod integrator;
pub mod odom;
mod params;
mod state;
mod tracker;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use anim::{AnimDirective, AnimationCoordinator, Trajectory, TrajectoryInfo};
pub use params::*;
pub use state::*;
pub use tracker::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during ActorCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum ActorCtrlError {
    #[error("Invalid actor control parameters: {0}")]
    InvalidParams(ParamsError),

    #[error("The simulation time is not finite: {0}")]
    NonFiniteTime(f64),

    #[error("The actor's world pose contains non-finite values")]
    NonFinitePose,
}
