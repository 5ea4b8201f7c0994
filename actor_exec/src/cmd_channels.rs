//! # Command Channels
//!
//! Receives velocity, path and abort commands in the background and buffers them for the
//! simulation tick.
//!
//! Each of the three command sources is polled by its own listener thread. Listeners never touch
//! the controller, they only deposit commands into buffers that the tick drains:
//!
//! - Velocity commands go into their own FIFO, which the tick pops at most once per step.
//! - Path and abort commands share a single FIFO of [`TargetCmd`]s, which the tick drains
//!   completely, so a path followed by an abort (or the reverse) is applied in the order it
//!   arrived.
//!
//! Stopping the channels (explicitly or on drop) clears the shared run flag, joins every listener
//! and only then releases the buffers.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{actor_ctrl::TargetCmd, pose::waypoints_from_path};
use comms_if::cmd::{AbortCmd, ActorCmd, CmdType, PathCmd, VelocityCmd};

#[cfg(feature = "net")]
pub use sub_source::SubSource;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// How long a listener waits on its source before checking the run flag again.
pub const POLL_TIMEOUT: Duration = Duration::from_millis(10);

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A source of commands of type `T`, polled by a listener thread.
pub trait CmdSource<T>: Send + 'static {
    /// Wait up to `timeout` for the next command.
    ///
    /// Returns `Ok(None)` if nothing arrived, which is not an error.
    fn poll(&mut self, timeout: Duration) -> Result<Option<T>, CmdSourceError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The three command sources of an actor.
pub struct CmdSources<V, P, A> {
    pub velocity: V,
    pub path: P,
    pub abort: A,
}

/// Sending half of in-process command sources.
#[derive(Clone)]
pub struct CmdSenders {
    pub velocity: Sender<VelocityCmd>,
    pub path: Sender<PathCmd>,
    pub abort: Sender<AbortCmd>,
}

/// Handle on the listener threads.
pub struct CmdChannels {
    run: Arc<AtomicBool>,
    listeners: Vec<(&'static str, JoinHandle<()>)>,
}

/// The tick's view of the received commands.
pub struct CmdBuffers {
    velocity: Receiver<VelocityCmd>,
    targets: Receiver<TargetCmd>,
}

/// Sources fed from inside the process, used by scripts and tests.
pub type InProcessSources = CmdSources<Receiver<VelocityCmd>, Receiver<PathCmd>, Receiver<AbortCmd>>;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CmdSourceError {
    #[error("The command source has disconnected")]
    Disconnected,

    #[error("The {0:?} command channel has been closed")]
    ChannelClosed(CmdType),

    #[error("Could not parse the command: {0}")]
    ParseError(serde_json::Error),

    #[error("Received a message which is not valid UTF-8")]
    NotUtf8,

    #[cfg(feature = "net")]
    #[error("Could not receive from the socket: {0}")]
    RecvError(comms_if::net::zmq::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum CmdChannelsError {
    #[error("Could not start the {0} listener: {1}")]
    SpawnError(&'static str, std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<T: Send + 'static> CmdSource<T> for Receiver<T> {
    fn poll(&mut self, timeout: Duration) -> Result<Option<T>, CmdSourceError> {
        match self.recv_timeout(timeout) {
            Ok(cmd) => Ok(Some(cmd)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(CmdSourceError::Disconnected),
        }
    }
}

impl InProcessSources {
    /// Create a set of in-process sources along with the senders that feed
    /// them.
    pub fn in_process() -> (Self, CmdSenders) {
        let (vel_tx, vel_rx) = mpsc::channel();
        let (path_tx, path_rx) = mpsc::channel();
        let (abort_tx, abort_rx) = mpsc::channel();

        (
            CmdSources {
                velocity: vel_rx,
                path: path_rx,
                abort: abort_rx,
            },
            CmdSenders {
                velocity: vel_tx,
                path: path_tx,
                abort: abort_tx,
            },
        )
    }
}

impl CmdSenders {
    /// Send a command to the source matching its type.
    pub fn send(&self, cmd: ActorCmd) -> Result<(), CmdSourceError> {
        let cmd_type = cmd.cmd_type();

        match cmd {
            ActorCmd::Velocity(v) => self.velocity.send(v).map_err(|_| ()),
            ActorCmd::Path(p) => self.path.send(p).map_err(|_| ()),
            ActorCmd::Abort(a) => self.abort.send(a).map_err(|_| ()),
        }
        .map_err(|_| CmdSourceError::ChannelClosed(cmd_type))
    }
}

impl CmdChannels {
    /// Start one listener thread per source.
    ///
    /// Returns the listener handle and the buffers the tick reads from.
    pub fn start<V, P, A>(
        sources: CmdSources<V, P, A>,
    ) -> Result<(Self, CmdBuffers), CmdChannelsError>
    where
        V: CmdSource<VelocityCmd>,
        P: CmdSource<PathCmd>,
        A: CmdSource<AbortCmd>,
    {
        let (vel_tx, vel_rx) = mpsc::channel();
        let (target_tx, target_rx) = mpsc::channel();
        let abort_target_tx = target_tx.clone();

        // If a later listener fails to spawn dropping this stops the earlier ones
        let mut channels = Self {
            run: Arc::new(AtomicBool::new(true)),
            listeners: Vec::with_capacity(3),
        };

        channels.spawn("velocity", sources.velocity, move |cmd: VelocityCmd| {
            vel_tx.send(cmd).is_ok()
        })?;

        channels.spawn("path", sources.path, move |cmd: PathCmd| {
            match waypoints_from_path(&cmd) {
                Ok(waypoints) => target_tx.send(TargetCmd::SetPath(waypoints)).is_ok(),
                Err(e) => {
                    warn!("Rejecting path command: {}", e);
                    true
                }
            }
        })?;

        channels.spawn("abort", sources.abort, move |cmd: AbortCmd| {
            abort_target_tx.send(TargetCmd::SetAbort(cmd.abort)).is_ok()
        })?;

        info!("Command channels started");

        Ok((
            channels,
            CmdBuffers {
                velocity: vel_rx,
                targets: target_rx,
            },
        ))
    }

    /// True while the listeners have been asked to run.
    pub fn is_running(&self) -> bool {
        self.run.load(Ordering::Relaxed)
    }

    /// Stop and join every listener. Calling this more than once has no
    /// further effect.
    pub fn stop(&mut self) {
        self.run.store(false, Ordering::Relaxed);

        for (name, jh) in self.listeners.drain(..) {
            if jh.join().is_err() {
                warn!("The {} listener panicked", name);
            }
        }
    }

    fn spawn<T, S, F>(
        &mut self,
        name: &'static str,
        source: S,
        deposit: F,
    ) -> Result<(), CmdChannelsError>
    where
        T: 'static,
        S: CmdSource<T>,
        F: FnMut(T) -> bool + Send + 'static,
    {
        let run = self.run.clone();

        let jh = thread::Builder::new()
            .name(format!("{}_listener", name))
            .spawn(move || listen(name, source, run, deposit))
            .map_err(|e| CmdChannelsError::SpawnError(name, e))?;

        self.listeners.push((name, jh));

        Ok(())
    }
}

impl Drop for CmdChannels {
    fn drop(&mut self) {
        self.stop();
    }
}

impl CmdBuffers {
    /// Take the oldest pending velocity command, never blocking.
    pub fn pop_velocity(&self) -> Option<VelocityCmd> {
        self.velocity.try_recv().ok()
    }

    /// Throw away every pending velocity command, returning how many there
    /// were.
    pub fn discard_velocity(&self) -> usize {
        self.velocity.try_iter().count()
    }

    /// Take every pending path and abort command in arrival order.
    pub fn drain_target_cmds(&self) -> Vec<TargetCmd> {
        self.targets.try_iter().collect()
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Listener thread, polls the source and deposits commands until told to stop.
///
/// `deposit` returns `false` once the buffer it feeds has gone away.
fn listen<T, S, F>(name: &'static str, mut source: S, run: Arc<AtomicBool>, mut deposit: F)
where
    S: CmdSource<T>,
    F: FnMut(T) -> bool,
{
    debug!("{} listener started", name);

    while run.load(Ordering::Relaxed) {
        match source.poll(POLL_TIMEOUT) {
            Ok(Some(cmd)) => {
                if !deposit(cmd) {
                    debug!("{} buffer closed", name);
                    break;
                }
            }
            Ok(None) => (),
            Err(CmdSourceError::Disconnected) => {
                warn!(
                    "{} command source disconnected, no further {} commands will be received",
                    name, name
                );
                break;
            }
            Err(e) => warn!("Error on {} command source: {}", name, e),
        }
    }

    debug!("{} listener stopped", name);
}

// ------------------------------------------------------------------------------------------------
// NETWORK SOURCE
// ------------------------------------------------------------------------------------------------

#[cfg(feature = "net")]
mod sub_source {
    use serde::de::DeserializeOwned;
    use std::{marker::PhantomData, time::Duration};

    use super::{CmdSource, CmdSourceError, POLL_TIMEOUT};
    use comms_if::net::{
        split_channel_message, zmq, MonitoredSocket, MonitoredSocketError, SocketOptions,
    };

    /// A command source reading JSON payloads from a single channel on a SUB
    /// socket.
    ///
    /// The socket's receive timeout is fixed to [`POLL_TIMEOUT`] when it is
    /// created, the timeout given to `poll` is not used.
    pub struct SubSource<T> {
        socket: MonitoredSocket,
        channel: String,
        _cmd: PhantomData<fn() -> T>,
    }

    impl<T> SubSource<T> {
        /// Connect a new source to the command endpoint, subscribed to
        /// `channel`.
        pub fn new(
            ctx: &zmq::Context,
            endpoint: &str,
            channel: &str,
        ) -> Result<Self, MonitoredSocketError> {
            let socket_options = SocketOptions {
                block_on_first_connect: false,
                linger: 1,
                recv_timeout: POLL_TIMEOUT.as_millis() as i32,
                ..Default::default()
            };

            let socket = MonitoredSocket::new(ctx, zmq::SUB, socket_options, endpoint)?;

            // The filter is a prefix match, exact channel names are checked on receipt
            socket
                .set_subscribe(channel.as_bytes())
                .map_err(|e| MonitoredSocketError::SocketOptionError(String::from("subscribe"), e))?;

            Ok(Self {
                socket,
                channel: String::from(channel),
                _cmd: PhantomData,
            })
        }
    }

    impl<T: DeserializeOwned + 'static> CmdSource<T> for SubSource<T> {
        fn poll(&mut self, _timeout: Duration) -> Result<Option<T>, CmdSourceError> {
            let msg = match self.socket.recv_string(0) {
                Ok(Ok(s)) => s,
                Ok(Err(_)) => return Err(CmdSourceError::NotUtf8),
                Err(zmq::Error::EAGAIN) => return Ok(None),
                Err(zmq::Error::ETERM) => return Err(CmdSourceError::Disconnected),
                Err(e) => return Err(CmdSourceError::RecvError(e)),
            };

            match split_channel_message(&msg) {
                Some((channel, json)) if channel == self.channel => serde_json::from_str(json)
                    .map(Some)
                    .map_err(CmdSourceError::ParseError),
                _ => Ok(None),
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::pose::Waypoint;
    use comms_if::cmd::PoseStamped;
    use std::time::Instant;

    /// Poll the buffers until `n` target commands have arrived or a second has
    /// passed.
    fn wait_for_targets(buffers: &CmdBuffers, n: usize) -> Vec<TargetCmd> {
        let start = Instant::now();
        let mut cmds = vec![];

        while cmds.len() < n && start.elapsed() < Duration::from_secs(1) {
            cmds.extend(buffers.drain_target_cmds());
            thread::sleep(Duration::from_millis(1));
        }

        cmds
    }

    fn wait_for_velocity(buffers: &CmdBuffers) -> Option<VelocityCmd> {
        let start = Instant::now();

        while start.elapsed() < Duration::from_secs(1) {
            if let Some(v) = buffers.pop_velocity() {
                return Some(v);
            }
            thread::sleep(Duration::from_millis(1));
        }

        None
    }

    #[test]
    fn test_velocity_fifo() {
        let (sources, senders) = InProcessSources::in_process();
        let (mut channels, buffers) = CmdChannels::start(sources).unwrap();

        for i in 0..3 {
            senders
                .send(ActorCmd::Velocity(VelocityCmd {
                    linear_x_ms: i as f64,
                    angular_z_rads: 0.0,
                }))
                .unwrap();
        }

        // One command per pop, oldest first
        for i in 0..3 {
            assert_eq!(wait_for_velocity(&buffers).unwrap().linear_x_ms, i as f64);
        }
        assert_eq!(buffers.pop_velocity(), None);

        channels.stop();
        assert!(!channels.is_running());
    }

    #[test]
    fn test_path_and_abort_share_fifo() {
        let (sources, senders) = InProcessSources::in_process();
        let (_channels, buffers) = CmdChannels::start(sources).unwrap();

        senders
            .send(ActorCmd::Path(PathCmd {
                poses: vec![PoseStamped::planar(1.0, 2.0, 0.0)],
            }))
            .unwrap();

        let cmds = wait_for_targets(&buffers, 1);
        assert_eq!(
            cmds,
            vec![TargetCmd::SetPath(vec![Waypoint::new(1.0, 2.0, 0.0)])]
        );

        senders.send(ActorCmd::Abort(AbortCmd { abort: true })).unwrap();
        assert_eq!(
            wait_for_targets(&buffers, 1),
            vec![TargetCmd::SetAbort(true)]
        );
    }

    #[test]
    fn test_malformed_path_dropped() {
        let (sources, senders) = InProcessSources::in_process();
        let (_channels, buffers) = CmdChannels::start(sources).unwrap();

        let mut bad = PoseStamped::planar(0.0, 0.0, 0.0);
        bad.position_m[1] = f64::NAN;
        senders
            .send(ActorCmd::Path(PathCmd { poses: vec![bad] }))
            .unwrap();
        senders
            .send(ActorCmd::Path(PathCmd {
                poses: vec![PoseStamped::planar(3.0, 0.0, 0.0)],
            }))
            .unwrap();

        // Only the good path makes it through
        let cmds = wait_for_targets(&buffers, 1);
        thread::sleep(Duration::from_millis(50));
        let late = buffers.drain_target_cmds();

        assert_eq!(
            cmds,
            vec![TargetCmd::SetPath(vec![Waypoint::new(3.0, 0.0, 0.0)])]
        );
        assert!(late.is_empty());
    }

    #[test]
    fn test_discard_velocity() {
        let (sources, senders) = InProcessSources::in_process();
        let (_channels, buffers) = CmdChannels::start(sources).unwrap();

        senders
            .send(ActorCmd::Velocity(VelocityCmd::default()))
            .unwrap();
        assert!(wait_for_velocity(&buffers).is_some());

        for _ in 0..4 {
            senders
                .send(ActorCmd::Velocity(VelocityCmd::default()))
                .unwrap();
        }
        thread::sleep(Duration::from_millis(100));

        assert_eq!(buffers.discard_velocity(), 4);
        assert_eq!(buffers.pop_velocity(), None);
    }

    #[test]
    fn test_stop_joins_listeners() {
        let (sources, senders) = InProcessSources::in_process();
        let (mut channels, buffers) = CmdChannels::start(sources).unwrap();

        channels.stop();
        channels.stop();

        // Listeners have exited, so their sources are gone
        assert!(matches!(
            senders.send(ActorCmd::Abort(AbortCmd { abort: true })),
            Err(CmdSourceError::ChannelClosed(CmdType::Abort))
        ));
        assert!(buffers.drain_target_cmds().is_empty());
    }

    #[test]
    fn test_disconnected_source_ends_listener() {
        let (sources, senders) = InProcessSources::in_process();
        let (mut channels, _buffers) = CmdChannels::start(sources).unwrap();

        drop(senders);
        thread::sleep(Duration::from_millis(50));

        // Joining must not hang on listeners that already exited
        channels.stop();
    }
}
