//! Actor control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for actor control.
///
/// Any parameter missing from the file takes its default value.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Params {
    /// Which command the actor follows, fixed for the lifetime of the
    /// controller.
    pub follow_mode: FollowMode,

    /// Channel carrying velocity commands
    pub vel_channel: String,

    /// Channel carrying path commands
    pub path_channel: String,

    /// Channel carrying abort commands
    pub abort_channel: String,

    /// Odometry channel name. The actor's name is prepended to this to form
    /// the published channel, i.e. `<actor>/<odom_channel>`.
    pub odom_channel: String,

    /// Distance below which a waypoint is considered reached.
    ///
    /// Units: meters
    pub linear_tolerance_m: f64,

    /// Walking speed in path mode.
    ///
    /// Units: meters/second
    pub linear_velocity_ms: f64,

    /// Heading error above which the actor turns on the spot instead of
    /// walking.
    ///
    /// Units: radians
    pub angular_tolerance_rad: f64,

    /// Turning rate used while turning on the spot.
    ///
    /// Units: radians/second
    pub angular_velocity_rads: f64,

    /// Animation script time advanced per meter walked.
    ///
    /// Units: seconds/meter
    pub animation_factor: f64,

    /// Roll applied to the actor mesh so it stands upright, also subtracted
    /// from the heading published in odometry.
    ///
    /// Units: radians
    pub default_rotation_rad: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The command following mode of the actor.
#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FollowMode {
    /// Integrate the most recent velocity command.
    Velocity,

    /// Walk through the waypoints of the most recent path command.
    Path,
}

/// Errors raised when validating a parameter set.
#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    #[error("Parameter {0} must be finite")]
    NonFinite(&'static str),

    #[error("Parameter {0} must be greater than zero, found {1}")]
    NotPositive(&'static str, f64),

    #[error("Parameter animation_factor must not be negative, found {0}")]
    NegativeAnimationFactor(f64),

    #[error("Parameter {0} must not be empty")]
    EmptyChannelName(&'static str),

    #[error("Channel {0} is used by more than one command")]
    DuplicateChannelName(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check the parameters are usable.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let positive = [
            ("linear_tolerance_m", self.linear_tolerance_m),
            ("linear_velocity_ms", self.linear_velocity_ms),
            ("angular_tolerance_rad", self.angular_tolerance_rad),
            ("angular_velocity_rads", self.angular_velocity_rads),
        ];

        for &(name, value) in positive.iter() {
            if !value.is_finite() {
                return Err(ParamsError::NonFinite(name));
            }
            if value <= 0.0 {
                return Err(ParamsError::NotPositive(name, value));
            }
        }

        if !self.animation_factor.is_finite() {
            return Err(ParamsError::NonFinite("animation_factor"));
        }
        if self.animation_factor < 0.0 {
            return Err(ParamsError::NegativeAnimationFactor(self.animation_factor));
        }
        if !self.default_rotation_rad.is_finite() {
            return Err(ParamsError::NonFinite("default_rotation_rad"));
        }

        let channels = [
            ("vel_channel", &self.vel_channel),
            ("path_channel", &self.path_channel),
            ("abort_channel", &self.abort_channel),
            ("odom_channel", &self.odom_channel),
        ];

        for (i, &(name, channel)) in channels.iter().enumerate() {
            if channel.is_empty() {
                return Err(ParamsError::EmptyChannelName(name));
            }
            if channels[..i].iter().any(|&(_, c)| c == channel) {
                return Err(ParamsError::DuplicateChannelName(channel.to_string()));
            }
        }

        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            follow_mode: FollowMode::Velocity,
            vel_channel: String::from("/cmd_vel"),
            path_channel: String::from("/cmd_path"),
            abort_channel: String::from("/abort_goal"),
            odom_channel: String::from("odom"),
            linear_tolerance_m: 0.1,
            linear_velocity_ms: 1.0,
            angular_tolerance_rad: 5f64.to_radians(),
            angular_velocity_rads: 10f64.to_radians(),
            animation_factor: 4.0,
            default_rotation_rad: 0.0,
        }
    }
}

impl Default for FollowMode {
    fn default() -> Self {
        FollowMode::Velocity
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = Params::default();

        assert_eq!(p.follow_mode, FollowMode::Velocity);
        assert_eq!(p.vel_channel, "/cmd_vel");
        assert_eq!(p.path_channel, "/cmd_path");
        assert_eq!(p.abort_channel, "/abort_goal");
        assert!((p.angular_tolerance_rad - 0.087_266_462_599_716_48).abs() < 1e-12);
        assert!((p.angular_velocity_rads - 0.174_532_925_199_432_95).abs() < 1e-12);
        assert_eq!(p.animation_factor, 4.0);
        assert_eq!(p.validate(), Ok(()));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let p: Params = util::params::from_str(
            r#"
            follow_mode = "path"
            linear_velocity_ms = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(p.follow_mode, FollowMode::Path);
        assert_eq!(p.linear_velocity_ms, 0.5);
        assert_eq!(p.linear_tolerance_m, 0.1);
        assert_eq!(p.path_channel, "/cmd_path");
    }

    #[test]
    fn test_unknown_follow_mode_rejected() {
        let p: Result<Params, _> = util::params::from_str("follow_mode = \"teleport\"");
        assert!(p.is_err());
    }

    #[test]
    fn test_validate() {
        let mut p = Params::default();
        p.linear_tolerance_m = 0.0;
        assert_eq!(
            p.validate(),
            Err(ParamsError::NotPositive("linear_tolerance_m", 0.0))
        );

        let mut p = Params::default();
        p.angular_velocity_rads = f64::NAN;
        assert_eq!(
            p.validate(),
            Err(ParamsError::NonFinite("angular_velocity_rads"))
        );

        let mut p = Params::default();
        p.animation_factor = -1.0;
        assert_eq!(p.validate(), Err(ParamsError::NegativeAnimationFactor(-1.0)));

        let mut p = Params::default();
        p.abort_channel = p.path_channel.clone();
        assert_eq!(
            p.validate(),
            Err(ParamsError::DuplicateChannelName(String::from("/cmd_path")))
        );

        let mut p = Params::default();
        p.vel_channel.clear();
        assert_eq!(p.validate(), Err(ParamsError::EmptyChannelName("vel_channel")));
    }
}
