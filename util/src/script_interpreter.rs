//! # Actor command script interpreter module
//!
//! This module provides an interpreter for actor command scripts, allowing
//! commands to be issued at fixed simulation times without a network
//! connection.
//!
//! A script is made of entries of the form `<time_s>: <json command>;`, for
//! example:
//!
//! ```text
//! 0.0: {"type": "PATH", "payload": {"poses": [{"position_m": [4.0, 0.0, 0.0]}]}};
//! 2.5: {"type": "ABORT", "payload": {"abort": true}};
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal
use comms_if::cmd::{ActorCmd, CmdParseError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command which is scripted to occur at a specific time.
#[derive(Debug, Clone)]
pub struct Command {
    /// The time the command is supposed to execute at
    exec_time_s: f64,

    /// The command to issue
    cmd: ActorCmd,
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use
/// `.get_pending_cmds` to acquire a list of commands that need issuing.
pub struct ScriptInterpreter {
    _script_path: PathBuf,
    cmds: VecDeque<Command>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0:?}")]
    ScriptNotFound(PathBuf),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error("Script contains an invalid timestamp: {0}. Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid command at {0} s: {1}")]
    InvalidCmd(f64, CmdParseError),
}

#[derive(Debug)]
pub enum PendingCmds {
    None,
    Some(Vec<ActorCmd>),
    EndOfScript,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {
    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        let path = PathBuf::from(script_path.as_ref());

        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path));
        }

        let script = fs::read_to_string(&path).map_err(ScriptError::ScriptLoadError)?;

        let mut interp = Self::from_str(&script)?;
        interp._script_path = path;

        Ok(interp)
    }

    /// Create a new interpreter from the contents of a script.
    pub fn from_str(script: &str) -> Result<Self, ScriptError> {
        let mut cmd_queue: VecDeque<Command> = VecDeque::new();

        // Go through the script executing __the magic regex__.
        let re = RegexBuilder::new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .map_err(|e| ScriptError::InvalidTimestamp(e.to_string()))?;

        for cap in re.captures_iter(script) {
            let time_str = cap.get(1).map(|m| m.as_str()).unwrap_or("");
            let exec_time_s: f64 = time_str
                .parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}: {}", time_str, e)))?;

            // The scripts contain JSON only.
            let body = cap.get(3).map(|m| m.as_str()).unwrap_or("");
            let cmd = ActorCmd::from_json(body)
                .map_err(|e| ScriptError::InvalidCmd(exec_time_s, e))?;

            cmd_queue.push_back(Command { exec_time_s, cmd });
        }

        if cmd_queue.is_empty() {
            return Err(ScriptError::ScriptEmpty);
        }

        // Commands are issued in time order, keeping file order for ties
        cmd_queue
            .make_contiguous()
            .sort_by(|a, b| a.exec_time_s.partial_cmp(&b.exec_time_s).unwrap_or(std::cmp::Ordering::Equal));

        Ok(ScriptInterpreter {
            _script_path: PathBuf::new(),
            cmds: cmd_queue,
        })
    }

    /// Return the commands whose execution time is earlier than or equal to
    /// `current_time_s`.
    pub fn get_pending_cmds(&mut self, current_time_s: f64) -> PendingCmds {
        if self.cmds.is_empty() {
            return PendingCmds::EndOfScript;
        }

        let mut cmd_vec: Vec<ActorCmd> = vec![];

        while let Some(c) = self.cmds.front() {
            if c.exec_time_s > current_time_s {
                break;
            }

            if let Some(c) = self.cmds.pop_front() {
                cmd_vec.push(c.cmd);
            }
        }

        if cmd_vec.is_empty() {
            PendingCmds::None
        } else {
            PendingCmds::Some(cmd_vec)
        }
    }

    /// Get the number of commands remaining in the script
    pub fn get_num_cmds(&self) -> usize {
        self.cmds.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.cmds.back() {
            Some(c) => c.exec_time_s,
            None => 0f64,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::cmd::{AbortCmd, CmdType};

    const SCRIPT: &str = r#"
        // Walk forwards then stop
        0.0: {"type": "PATH", "payload": {"poses": [{"position_m": [4.0, 0.0, 0.0]}]}};
        2.5: {"type": "ABORT", "payload": {"abort": true}};
        1.0: {"type": "VEL", "payload": {"linear_x_ms": 1.0, "angular_z_rads": 0.0}};
    "#;

    #[test]
    fn test_script_pending_cmds() {
        let mut si = ScriptInterpreter::from_str(SCRIPT).unwrap();

        assert_eq!(si.get_num_cmds(), 3);
        assert_eq!(si.get_duration(), 2.5);

        match si.get_pending_cmds(0.0) {
            PendingCmds::Some(v) => {
                assert_eq!(v.len(), 1);
                assert_eq!(v[0].cmd_type(), CmdType::Path);
            }
            p => panic!("Expected one pending command, got {:?}", p),
        }

        assert!(matches!(si.get_pending_cmds(0.5), PendingCmds::None));

        match si.get_pending_cmds(3.0) {
            PendingCmds::Some(v) => {
                assert_eq!(v.len(), 2);
                assert_eq!(v[0].cmd_type(), CmdType::Velocity);
                assert_eq!(v[1], ActorCmd::Abort(AbortCmd { abort: true }));
            }
            p => panic!("Expected two pending commands, got {:?}", p),
        }

        assert!(matches!(si.get_pending_cmds(4.0), PendingCmds::EndOfScript));
    }

    #[test]
    fn test_cmd_due_at_its_exec_time() {
        let mut si = ScriptInterpreter::from_str(
            r#"1.5: {"type": "ABORT", "payload": {"abort": false}};"#,
        )
        .unwrap();

        assert!(matches!(si.get_pending_cmds(1.25), PendingCmds::None));
        assert!(matches!(si.get_pending_cmds(1.5), PendingCmds::Some(ref v) if v.len() == 1));
        assert!(matches!(si.get_pending_cmds(1.5), PendingCmds::EndOfScript));
    }

    #[test]
    fn test_script_errors() {
        assert!(matches!(
            ScriptInterpreter::from_str("nothing to see here"),
            Err(ScriptError::ScriptEmpty)
        ));
        assert!(matches!(
            ScriptInterpreter::from_str(r#"1.0: {"type": "FLY", "payload": {}};"#),
            Err(ScriptError::InvalidCmd(_, _))
        ));
        assert!(matches!(
            ScriptInterpreter::new("/definitely/not/a/script.txt"),
            Err(ScriptError::ScriptNotFound(_))
        ));
    }
}
