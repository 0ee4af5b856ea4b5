use std::io;

use thiserror::Error;

use crate::channel::ChannelRef;

/// Errors that can occur in the UDP multiplexer
#[derive(Error, Debug)]
pub enum NetUdpError {
    /// Remote host name could not be resolved
    #[error("Failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    /// Remote host resolved only to non-IPv4 addresses
    #[error("Host {0} has no IPv4 address")]
    NoIpv4Address(String),

    /// Local port could not be bound
    #[error("Failed to bind local port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    /// Socket option or runtime registration failed
    #[error("Failed to set up socket: {0}")]
    Socket(#[source] io::Error),

    /// Datagram could not be sent
    #[error("Failed to send on {channel}: {source}")]
    Send {
        channel: ChannelRef,
        #[source]
        source: io::Error,
    },

    /// Empty buffer or similar caller error
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Reference does not name a live channel
    #[error("No such channel {0}")]
    NoSuchChannel(ChannelRef),

    /// Receiver runtime or thread could not be started
    #[error("Failed to start receiver: {0}")]
    Receiver(#[source] io::Error),
}

impl NetUdpError {
    /// Underlying OS error, when there is one
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            NetUdpError::Resolve { source, .. }
            | NetUdpError::Bind { source, .. }
            | NetUdpError::Send { source, .. } => Some(source),
            NetUdpError::Socket(source) | NetUdpError::Receiver(source) => Some(source),
            _ => None,
        }
    }
}

/// Result type for UDP multiplexer operations
pub type Result<T> = std::result::Result<T, NetUdpError>;
