//! # Target tracker
//!
//! Holds the waypoint queue received from path commands, the index of the waypoint currently being
//! walked towards and the abort flag.
//!
//! Path and abort commands reach the tracker as [`TargetCmd`]s, applied in the order they were
//! received. A new path always clears the abort flag, so an abort received after a path suspends
//! it while an abort received before a path is overridden by it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use nalgebra::Vector2;

// Internal
use crate::pose::{Pose2D, Waypoint};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Waypoint queue and progress through it.
#[derive(Debug, Clone)]
pub struct TargetTracker {
    /// Waypoints of the most recent path command
    targets: Vec<Waypoint>,

    /// Index of the current target within `targets`
    index: usize,

    /// If true progress along the path is suspended
    abort: bool,

    /// Target returned while the queue is empty, and the hold point while
    /// the actor is stopped.
    last_known: Waypoint,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A command affecting the target queue.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetCmd {
    /// Replace the queue with a new set of waypoints.
    SetPath(Vec<Waypoint>),

    /// Suspend (`true`) or resume (`false`) progress along the path.
    SetAbort(bool),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TargetTracker {
    /// Create a new tracker whose only target is the given start waypoint, so
    /// the actor stays put until a path arrives.
    pub fn new(start: Waypoint) -> Self {
        Self {
            targets: vec![start],
            index: 0,
            abort: false,
            last_known: start,
        }
    }

    /// Replace the tracker's contents as if it had just been created.
    pub fn reset(&mut self, start: Waypoint) {
        *self = Self::new(start);
    }

    /// Apply a target command.
    pub fn apply(&mut self, cmd: TargetCmd) {
        match cmd {
            TargetCmd::SetPath(waypoints) => self.set_path(waypoints),
            TargetCmd::SetAbort(abort) => self.set_abort(abort),
        }
    }

    /// Replace the queue, restart from its first waypoint and clear any
    /// abort.
    ///
    /// An empty path leaves the actor holding where it currently is.
    pub fn set_path(&mut self, waypoints: Vec<Waypoint>) {
        debug!("New path with {} waypoints", waypoints.len());

        if let Some(last) = waypoints.last() {
            self.last_known = *last;
        }
        self.targets = waypoints;
        self.index = 0;
        self.abort = false;
    }

    /// Set the abort flag. The queue and current index are kept so that
    /// clearing the flag resumes towards the same target.
    pub fn set_abort(&mut self, abort: bool) {
        if abort != self.abort {
            debug!("Abort flag set to {}", abort);
        }
        self.abort = abort;
    }

    /// True if the actor should hold its position, either because of an
    /// abort or because there are no waypoints to walk to.
    pub fn is_holding(&self) -> bool {
        self.abort || self.targets.is_empty()
    }

    /// The waypoint currently being walked towards.
    ///
    /// With an empty queue this is the last known target.
    pub fn current_target(&self) -> Waypoint {
        self.targets
            .get(self.index)
            .copied()
            .unwrap_or(self.last_known)
    }

    /// Move on to the next waypoint.
    ///
    /// Returns `false` and leaves the index unchanged if the current target
    /// is the last one.
    pub fn advance(&mut self) -> bool {
        if self.index + 1 < self.targets.len() {
            self.index += 1;
            debug!(
                "Advancing to target {} of {}",
                self.index,
                self.targets.len()
            );
            true
        } else {
            false
        }
    }

    /// True if `position` is within `tolerance_m` of the current target.
    pub fn has_reached(&self, position: &Vector2<f64>, tolerance_m: f64) -> bool {
        (self.current_target().position() - position).norm() < tolerance_m
    }

    /// Hold the actor at `pose`.
    ///
    /// The hold point follows the actor, so the target stays where the actor
    /// stopped rather than where it was going.
    pub fn hold_at(&mut self, pose: &Pose2D) {
        self.last_known.x_m = pose.x_m;
        self.last_known.y_m = pose.y_m;

        if self.targets.is_empty() {
            self.index = 0;
        }
    }

    /// Index of the current target.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of waypoints in the queue.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn square() -> Vec<Waypoint> {
        vec![
            Waypoint::new(1.0, 0.0, 0.0),
            Waypoint::new(1.0, 1.0, 0.0),
            Waypoint::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_new_tracker_holds_start() {
        let start = Waypoint::new(2.0, 3.0, 0.5);
        let t = TargetTracker::new(start);

        assert_eq!(t.current_target(), start);
        assert_eq!(t.index(), 0);
        assert!(!t.is_holding());
        assert!(t.has_reached(&Vector2::new(2.0, 3.0), 0.1));
    }

    #[test]
    fn test_advance_stops_at_last_target() {
        let mut t = TargetTracker::new(Waypoint::default());
        t.set_path(square());

        assert!(t.advance());
        assert!(t.advance());
        assert_eq!(t.index(), 2);
        assert!(!t.advance());
        assert_eq!(t.index(), 2);
        assert_eq!(t.current_target(), Waypoint::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_new_path_clears_abort_and_index() {
        let mut t = TargetTracker::new(Waypoint::default());
        t.set_path(square());
        t.advance();
        t.set_abort(true);
        assert!(t.is_holding());

        t.apply(TargetCmd::SetPath(square()));
        assert!(!t.is_holding());
        assert_eq!(t.index(), 0);
    }

    #[test]
    fn test_abort_preserves_progress() {
        let mut t = TargetTracker::new(Waypoint::default());
        t.set_path(square());
        t.advance();

        t.apply(TargetCmd::SetAbort(true));
        t.hold_at(&Pose2D::new(0.9, 0.4, 0.0));
        assert!(t.is_holding());
        assert_eq!(t.index(), 1);

        t.apply(TargetCmd::SetAbort(false));
        assert!(!t.is_holding());
        assert_eq!(t.current_target(), Waypoint::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_empty_path_holds_last_position() {
        let mut t = TargetTracker::new(Waypoint::default());
        t.set_path(square());
        t.set_path(vec![]);

        assert!(t.is_empty());
        assert!(t.is_holding());
        assert!(!t.advance());

        t.hold_at(&Pose2D::new(0.5, 0.25, 1.0));
        let target = t.current_target();
        assert_eq!(target.x_m, 0.5);
        assert_eq!(target.y_m, 0.25);
        assert_eq!(t.index(), 0);
    }
}
