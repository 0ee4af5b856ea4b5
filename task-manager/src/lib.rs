//! Subprocess supervisor for the remote-control daemon
//!
//! Remote callers start commands with [`TaskManager::exec`] and stop them
//! with [`TaskManager::kill`]. They only ever see public PIDs, issued from a
//! private numbering space starting at [`PID_MIN`]; the OS process ids stay
//! internal.
//!
//! Each child gets a waiter thread that blocks until the child exits without
//! reaping it. The exit is forwarded to the main loop through the
//! [`QueueSource`](main_loop::QueueSource) returned by [`TaskManager::new`],
//! and the child is reaped there. A killed task's later exit is collected
//! the same way and otherwise ignored.

pub mod argv;
pub mod error;
pub mod manager;
pub mod pid;

pub use argv::{parse_command_line, ArgvError};
pub use error::{Result, TaskError};
pub use manager::{ChildExit, TaskInfo, TaskManager, TaskManagerConfig};
pub use pid::{PidAllocator, PID_MAX, PID_MIN};
