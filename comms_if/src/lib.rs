//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the actor software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Inbound command definitions (velocity, path and abort)
pub mod cmd;

/// Outbound odometry definitions
pub mod odom;

/// Network module
#[cfg(feature = "net")]
pub mod net;
