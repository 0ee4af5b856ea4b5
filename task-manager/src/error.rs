use std::io;

use nix::errno::Errno;
use thiserror::Error;

use crate::argv::ArgvError;

/// Errors returned by the task manager
#[derive(Error, Debug)]
pub enum TaskError {
    /// Command line could not be split into arguments
    #[error("Failed to parse command line {command:?}: {source}")]
    Parse {
        command: String,
        #[source]
        source: ArgvError,
    },

    /// Child process could not be started
    #[error("Failed to execute {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// Public PID names no live task
    #[error("No such process {0}")]
    NoSuchProcess(i32),

    /// Signal number unknown to the platform
    #[error("Invalid signal {0}")]
    InvalidSignal(i32),

    /// Every public PID between floor and ceiling is in use
    #[error("All {0} public PIDs are in use")]
    Exhausted(usize),

    /// kill(2) failed for a task that was found
    #[error("Failed to signal process {pid}: {source}")]
    Signal {
        pid: i32,
        #[source]
        source: Errno,
    },
}

/// Result type for task manager operations
pub type Result<T> = std::result::Result<T, TaskError>;
