//! Simple command publisher for driving an actor over the network.
//!
//! Binds a PUB socket on the command endpoint and sends a single command on the given channel.

use comms_if::{
    cmd::{AbortCmd, PathCmd, PoseStamped, VelocityCmd},
    net::{channel_message, zmq, MonitoredSocket, SocketOptions},
};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "actor_cmd_pub")]
struct Opt {
    /// Endpoint to bind the publisher to
    #[structopt(short, long, default_value = "tcp://*:5010")]
    endpoint: String,

    /// Time to wait for subscribers to connect before sending, in milliseconds
    #[structopt(short, long, default_value = "500")]
    wait_ms: u64,

    #[structopt(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, StructOpt)]
enum Cmd {
    /// Send a velocity command
    #[structopt(name = "vel")]
    Velocity {
        #[structopt(long, default_value = "/cmd_vel")]
        channel: String,

        /// Linear velocity in meters/second
        #[structopt(allow_hyphen_values = true)]
        linear_x_ms: f64,

        /// Angular velocity in radians/second
        #[structopt(allow_hyphen_values = true)]
        angular_z_rads: f64,
    },

    /// Send a path of `x,y,yaw` waypoints
    #[structopt(name = "path")]
    Path {
        #[structopt(long, default_value = "/cmd_path")]
        channel: String,

        /// Waypoints as `x,y,yaw_rad`
        waypoints: Vec<String>,
    },

    /// Abort (or resume with `--resume`) the current path
    #[structopt(name = "abort")]
    Abort {
        #[structopt(long, default_value = "/abort_goal")]
        channel: String,

        #[structopt(long)]
        resume: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::from_args();

    let (channel, json) = match opt.cmd {
        Cmd::Velocity {
            channel,
            linear_x_ms,
            angular_z_rads,
        } => (
            channel,
            serde_json::to_string(&VelocityCmd {
                linear_x_ms,
                angular_z_rads,
            })?,
        ),
        Cmd::Path { channel, waypoints } => {
            let mut poses = Vec::with_capacity(waypoints.len());
            for wp in waypoints.iter() {
                let vals = wp
                    .split(',')
                    .map(|v| v.trim().parse::<f64>())
                    .collect::<Result<Vec<f64>, _>>()?;
                if vals.len() != 3 {
                    return Err(format!("Expected x,y,yaw but got \"{}\"", wp).into());
                }
                poses.push(PoseStamped::planar(vals[0], vals[1], vals[2]));
            }
            (channel, serde_json::to_string(&PathCmd { poses })?)
        }
        Cmd::Abort { channel, resume } => (
            channel,
            serde_json::to_string(&AbortCmd { abort: !resume })?,
        ),
    };

    let ctx = zmq::Context::new();

    let socket = MonitoredSocket::new(
        &ctx,
        zmq::PUB,
        SocketOptions {
            bind: true,
            block_on_first_connect: false,
            linger: 1000,
            ..Default::default()
        },
        &opt.endpoint,
    )?;

    // PUB sockets drop messages sent before a subscriber has joined
    std::thread::sleep(std::time::Duration::from_millis(opt.wait_ms));

    let msg = channel_message(&channel, &json);
    socket.send(msg.as_str(), 0)?;

    println!("Sent: {}", msg);

    Ok(())
}
