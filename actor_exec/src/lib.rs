//! # Actor library.
//!
//! This library allows other crates in the workspace (and the benchmarks) to access items defined
//! inside the actor crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Actor control module - moves the actor along velocity or path commands
pub mod actor_ctrl;

/// Command channels - receive commands in the background and buffer them for the tick
pub mod cmd_channels;

/// Odometry server - publishes the actor's odometry
#[cfg(feature = "net")]
pub mod odom_server;

/// Actor plugin - binds actor control to a simulation host
pub mod plugin;

/// Pose types shared by the other modules
pub mod pose;

/// Simulation host - an in-memory host for running actors without a simulator
pub mod sim_host;
