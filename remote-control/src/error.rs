use thiserror::Error;

use crate::backend::BackendError;
use crate::config::ConfigError;

/// Startup errors of the composition root
///
/// Any of these aborts daemon startup; there is no partial composition.
#[derive(Error, Debug)]
pub enum RemoteControlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to create {name} backend: {source}")]
    Backend {
        name: &'static str,
        #[source]
        source: BackendError,
    },

    #[error("Failed to create UDP multiplexer: {0}")]
    NetUdp(#[from] net_udp::NetUdpError),
}

pub type Result<T> = std::result::Result<T, RemoteControlError>;
