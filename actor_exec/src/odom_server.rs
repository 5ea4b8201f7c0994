//! # Odometry Server
//!
//! Publishes each tick's odometry sample on the actor's odometry channel.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    net::{channel_message, zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
    odom::Odometry,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Odometry publisher
pub struct OdomServer {
    socket: MonitoredSocket,
    channel: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum OdomServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send odometry: {0}")]
    SendError(zmq::Error),

    #[error("Could not serialize the odometry: {0}")]
    SerializationError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl OdomServer {
    /// Create a new odometry server publishing on `channel`.
    ///
    /// This function will not block until a subscriber connects.
    pub fn new(ctx: &zmq::Context, params: &NetParams, channel: &str) -> Result<Self, OdomServerError> {
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            bind: true,
            linger: 1,
            send_timeout: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::PUB, socket_options, &params.odom_endpoint)
            .map_err(OdomServerError::SocketError)?;

        Ok(Self {
            socket,
            channel: String::from(channel),
        })
    }

    /// Publish a sample. Samples are dropped by the socket if nobody is
    /// subscribed.
    pub fn send(&mut self, odom: &Odometry) -> Result<(), OdomServerError> {
        let json = serde_json::to_string(odom).map_err(OdomServerError::SerializationError)?;

        self.socket
            .send(channel_message(&self.channel, &json).as_str(), 0)
            .map_err(OdomServerError::SendError)
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}
