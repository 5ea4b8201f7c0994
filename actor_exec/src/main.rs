//! Main actor executable entry point.
//!
//! # Architecture
//!
//! The executable runs a single actor on the in-memory simulation host at a fixed cycle period:
//!
//!     - Initialise the session, logging and parameters
//!     - Set up the command source, either a script or the network
//!     - Load the actor plugin
//!     - Main loop:
//!         - Issue any scripted commands
//!         - Actor control processing
//!         - Archive and publish odometry
//!
//! Commands are taken from a script if one is given on the command line, otherwise the actor
//! subscribes to the command channels on the network.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use actor_lib::{
    actor_ctrl::Params,
    cmd_channels::{CmdSenders, InProcessSources},
    plugin::{ActorPlugin, Host},
    pose::{ActorPose, Pose2D},
    sim_host::SimHost,
};
use comms_if::odom::Odometry;
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    script_interpreter::{PendingCmds, ScriptInterpreter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "actor_exec", about = "Simulated actor motion controller")]
struct Opt {
    /// Command script to run. If not given commands are received from the
    /// network.
    #[structopt(parse(from_os_str))]
    script: Option<PathBuf>,

    /// Target period of one cycle in seconds
    #[structopt(short, long, default_value = "0.1")]
    cycle_period_s: f64,

    /// Stop after this much simulation time in seconds
    #[structopt(short, long)]
    duration_s: Option<f64>,

    /// Time to keep running after the last scripted command, in seconds
    #[structopt(long, default_value = "20.0")]
    script_tail_s: f64,

    /// Name of the actor, used to form the odometry channel
    #[structopt(short, long, default_value = "actor")]
    name: String,

    /// Starting position and heading of the actor as `x y yaw_rad`
    #[structopt(long, number_of_values = 3, allow_hyphen_values = true)]
    start: Option<Vec<f64>>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    if !(opt.cycle_period_s.is_finite() && opt.cycle_period_s > 0.0) {
        return Err(eyre!(
            "The cycle period must be greater than zero, found {}",
            opt.cycle_period_s
        ));
    }

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("actor_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Actor Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI arguments: {:?}", opt);

    // ---- LOAD PARAMETERS ----

    let params: Params =
        util::params::load("actor_ctrl.toml").wrap_err("Could not load actor control params")?;
    params
        .validate()
        .wrap_err("Invalid actor control params")?;

    info!("Actor control parameters loaded: {:#?}", params);

    // ---- INITIALISE HOST ----

    let start = match opt.start {
        Some(ref s) if s.len() == 3 => Pose2D::new(s[0], s[1], s[2]),
        Some(ref s) => return Err(eyre!("Expected 3 values for --start, found {}", s.len())),
        None => Pose2D::default(),
    };
    let host = SimHost::new(
        &opt.name,
        ActorPose::from_pose2d(&start, 0.0, params.default_rotation_rad),
    );

    // ---- INITIALISE COMMAND SOURCE ----

    match opt.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);

            let si = ScriptInterpreter::new(path).wrap_err("Failed to load script")?;

            info!(
                "Loaded script lasts {:.02} s and contains {} commands\n",
                si.get_duration(),
                si.get_num_cmds()
            );

            let (sources, senders) = InProcessSources::in_process();
            let plugin = ActorPlugin::load(host, params, sources)
                .wrap_err("Failed to load the actor plugin")?;

            run(plugin, Some((si, senders)), |_| (), &session, &opt)
        }
        None => run_networked(host, params, &session, &opt),
    }
}

/// Load the plugin with network command sources and run it, publishing
/// odometry.
#[cfg(feature = "net")]
fn run_networked(host: SimHost, params: Params, session: &Session, opt: &Opt) -> Result<(), Report> {
    use actor_lib::{cmd_channels::CmdSources, cmd_channels::SubSource, odom_server::OdomServer};
    use comms_if::net::{zmq, NetParams};

    info!("No script provided, commands will be received from the network\n");

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    info!("Initialising network");

    let ctx = zmq::Context::new();

    let sources = CmdSources {
        velocity: SubSource::new(&ctx, &net_params.cmd_endpoint, &params.vel_channel)
            .wrap_err("Failed to subscribe to velocity commands")?,
        path: SubSource::new(&ctx, &net_params.cmd_endpoint, &params.path_channel)
            .wrap_err("Failed to subscribe to path commands")?,
        abort: SubSource::new(&ctx, &net_params.cmd_endpoint, &params.abort_channel)
            .wrap_err("Failed to subscribe to abort commands")?,
    };

    let plugin =
        ActorPlugin::load(host, params, sources).wrap_err("Failed to load the actor plugin")?;

    let mut odom_server = OdomServer::new(&ctx, &net_params, plugin.odom_channel())
        .wrap_err("Failed to initialise OdomServer")?;
    info!("OdomServer publishing on {}", odom_server.channel());

    info!("Network initialisation complete");

    run(
        plugin,
        None,
        |odom| {
            if let Err(e) = odom_server.send(odom) {
                warn!("OdomServer error: {}", e);
            }
        },
        session,
        opt,
    )
}

#[cfg(not(feature = "net"))]
fn run_networked(_: SimHost, _: Params, _: &Session, _: &Opt) -> Result<(), Report> {
    Err(eyre!(
        "actor_exec was built without network support, a command script is required"
    ))
}

/// Main loop, ticks the plugin every cycle until an end condition is met.
fn run<H, F>(
    mut plugin: ActorPlugin<H>,
    mut script: Option<(ScriptInterpreter, CmdSenders)>,
    mut publish: F,
    session: &Session,
    opt: &Opt,
) -> Result<(), Report>
where
    H: Host,
    F: FnMut(&Odometry),
{
    let mut odom_arch = Archiver::from_path(session, "actor_ctrl/odom.csv")
        .wrap_err("Failed to create the odometry archive")?;
    let mut report_arch = Archiver::from_path(session, "actor_ctrl/status_report.csv")
        .wrap_err("Failed to create the status report archive")?;

    let cycle_period = Duration::from_secs_f64(opt.cycle_period_s);
    let mut sim_time_s = 0.0;
    let mut end_of_script_s: Option<f64> = None;
    let mut num_consec_cycle_overruns: u64 = 0;

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        sim_time_s += opt.cycle_period_s;

        // ---- SCRIPTED COMMANDS ----

        if let Some((ref mut si, ref senders)) = script {
            match si.get_pending_cmds(sim_time_s) {
                PendingCmds::None => (),
                PendingCmds::Some(cmds) => {
                    for cmd in cmds {
                        info!("Issuing {:?} command at {:.02} s", cmd.cmd_type(), sim_time_s);
                        senders.send(cmd).wrap_err("Failed to issue a scripted command")?;
                    }
                }
                PendingCmds::EndOfScript => {
                    if end_of_script_s.is_none() {
                        info!("End of script reached");
                        end_of_script_s = Some(sim_time_s);
                    }
                }
            }
        }

        // ---- ACTOR CONTROL ----

        let (output, report) = plugin
            .on_update(sim_time_s)
            .wrap_err("Actor control processing failed")?;

        if report.trajectory_changed {
            debug!("Actor is now {}", output.anim.trajectory.label());
        }

        // ---- WRITE ARCHIVES ----

        if let Err(e) = odom_arch.serialise(output.odom.to_record()) {
            warn!("Could not archive odometry: {}", e);
        }
        if let Err(e) = report_arch.serialise(report) {
            warn!("Could not archive the status report: {}", e);
        }

        // ---- ODOMETRY ----

        publish(&output.odom);

        // ---- END CONDITIONS ----

        if let Some(max_s) = opt.duration_s {
            if sim_time_s >= max_s {
                info!("Maximum duration of {:.02} s reached", max_s);
                break;
            }
        }

        if let Some(end_s) = end_of_script_s {
            if sim_time_s - end_s >= opt.script_tail_s {
                info!("Script complete");
                break;
            }
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                num_consec_cycle_overruns += 1;
                warn!(
                    "Cycle overran by {:.06} s ({} consecutive)",
                    cycle_dur.as_secs_f64() - cycle_period.as_secs_f64(),
                    num_consec_cycle_overruns
                );
            }
        }
    }

    // ---- SHUTDOWN ----

    info!("Final pose: {:?}", plugin.host().world_pose().to_pose2d());

    // Stops the command listeners
    drop(plugin);

    info!("End of execution");

    Ok(())
}
