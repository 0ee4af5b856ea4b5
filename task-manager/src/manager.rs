//! Task table, spawning and signalling

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io;
use std::process::{Child, Command};
use std::sync::Arc;
use std::thread;

use main_loop::{QueueSender, QueueSource};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{waitid, Id, WaitPidFlag};
use nix::unistd::Pid;
use parking_lot::Mutex;

use crate::argv::parse_command_line;
use crate::error::{Result, TaskError};
use crate::pid::{PidAllocator, PID_MAX};

/// Tunables for the task manager
#[derive(Debug, Clone)]
pub struct TaskManagerConfig {
    /// Highest public PID before numbering wraps
    pub pid_ceiling: i32,
    /// Pass the daemon's `DISPLAY` on to children
    pub forward_display: bool,
    /// Let children inherit the daemon's whole environment; otherwise they
    /// start from an empty one
    pub inherit_env: bool,
}

impl Default for TaskManagerConfig {
    fn default() -> Self {
        Self {
            pid_ceiling: PID_MAX,
            forward_display: true,
            inherit_env: false,
        }
    }
}

/// Exit notification produced by a child's waiter thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildExit {
    pub os_pid: u32,
}

/// Snapshot of one live task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub pid: i32,
    pub os_pid: u32,
    pub command: String,
}

struct Task {
    command: String,
    child: Child,
}

struct Table {
    tasks: BTreeMap<i32, Task>,
    /// Killed children whose exit has not been collected yet
    reaping: HashMap<u32, Child>,
    pids: PidAllocator,
}

/// Supervisor of spawned commands
///
/// Callers only ever see public PIDs. Children are reaped on the scheduler
/// thread when the [`QueueSource`] returned by [`TaskManager::new`]
/// dispatches their exit notification.
pub struct TaskManager {
    table: Arc<Mutex<Table>>,
    exits: QueueSender<ChildExit>,
    config: TaskManagerConfig,
}

impl TaskManager {
    /// Create a manager and the main-loop source that collects exits
    pub fn new(config: TaskManagerConfig) -> (Self, QueueSource<ChildExit>) {
        let table = Arc::new(Mutex::new(Table {
            tasks: BTreeMap::new(),
            reaping: HashMap::new(),
            pids: PidAllocator::new(config.pid_ceiling),
        }));

        let reaper = Arc::clone(&table);
        let (source, exits) =
            QueueSource::new("task exits", move |exit: ChildExit| reap(&reaper, exit));

        let manager = Self {
            table,
            exits,
            config,
        };
        (manager, source)
    }

    /// Run a command line and return its public PID
    pub fn exec(&self, command_line: &str) -> Result<i32> {
        let argv = parse_command_line(command_line).map_err(|source| {
            tracing::error!("Failed to parse command line {:?}: {}", command_line, source);
            TaskError::Parse {
                command: command_line.to_string(),
                source,
            }
        })?;

        let mut guard = self.table.lock();
        let table = &mut *guard;

        let pid = table
            .pids
            .next(|pid| table.tasks.contains_key(&pid))
            .ok_or(TaskError::Exhausted(table.pids.capacity()))?;

        let mut command = Command::new(&argv[0]);
        command.args(&argv[1..]);
        if !self.config.inherit_env {
            command.env_clear();
        }
        if self.config.forward_display {
            if let Ok(display) = std::env::var("DISPLAY") {
                command.env("DISPLAY", display);
            }
        } else {
            command.env_remove("DISPLAY");
        }

        let spawn_error = |source: io::Error| {
            tracing::error!("Failed to execute {:?}: {}", command_line, source);
            TaskError::Spawn {
                command: command_line.to_string(),
                source,
            }
        };

        let mut child = command.spawn().map_err(spawn_error)?;
        let os_pid = child.id();

        if let Err(e) = watch_exit(os_pid, self.exits.clone()) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(spawn_error(e));
        }

        tracing::info!("Running {:?} (PID {}/{})", command_line, pid, os_pid);

        table.tasks.insert(
            pid,
            Task {
                command: command_line.to_string(),
                child,
            },
        );
        table.pids.commit(pid);

        Ok(pid)
    }

    /// Send `signal` to the task with public PID `pid`
    ///
    /// The task is forgotten even when delivery fails. Signal 0 checks that
    /// the process exists without signalling it.
    pub fn kill(&self, pid: i32, signal: i32) -> Result<()> {
        let signal = match signal {
            0 => None,
            n => Some(Signal::try_from(n).map_err(|_| TaskError::InvalidSignal(n))?),
        };

        let mut table = self.table.lock();
        let task = table.tasks.remove(&pid).ok_or(TaskError::NoSuchProcess(pid))?;
        let os_pid = task.child.id();

        let result = signal::kill(Pid::from_raw(os_pid as i32), signal);
        tracing::info!(
            "Child {}/{} killed with signal {:?} ({:?})",
            pid,
            os_pid,
            signal,
            result
        );

        table.reaping.insert(os_pid, task.child);
        result.map_err(|source| TaskError::Signal { pid, source })
    }

    /// Number of live tasks
    pub fn len(&self) -> usize {
        self.table.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, pid: i32) -> bool {
        self.table.lock().tasks.contains_key(&pid)
    }

    /// Snapshot of every live task, ordered by public PID
    pub fn tasks(&self) -> Vec<TaskInfo> {
        self.table
            .lock()
            .tasks
            .iter()
            .map(|(pid, task)| TaskInfo {
                pid: *pid,
                os_pid: task.child.id(),
                command: task.command.clone(),
            })
            .collect()
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        let table = self.table.lock();
        if !table.tasks.is_empty() {
            tracing::info!("Leaving {} tasks running", table.tasks.len());
        }
    }
}

impl fmt::Debug for TaskManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskManager")
            .field("tasks", &self.tasks())
            .field("config", &self.config)
            .finish()
    }
}

/// Wait for a child to exit without reaping it, then notify the scheduler
fn watch_exit(os_pid: u32, exits: QueueSender<ChildExit>) -> io::Result<()> {
    thread::Builder::new()
        .name(format!("task-watch-{}", os_pid))
        .spawn(move || {
            let pid = Pid::from_raw(os_pid as i32);
            loop {
                match waitid(Id::Pid(pid), WaitPidFlag::WEXITED | WaitPidFlag::WNOWAIT) {
                    Ok(_) => break,
                    Err(Errno::EINTR) => continue,
                    Err(e) => {
                        tracing::warn!("Waiting for child {} failed: {}", os_pid, e);
                        break;
                    }
                }
            }

            if exits.send(ChildExit { os_pid }).is_err() {
                tracing::debug!("Exit of child {} arrived after shutdown", os_pid);
            }
        })?;
    Ok(())
}

/// Collect an exited child on the scheduler thread
fn reap(table: &Mutex<Table>, exit: ChildExit) {
    let mut table = table.lock();

    let live = table
        .tasks
        .iter()
        .find(|(_, task)| task.child.id() == exit.os_pid)
        .map(|(pid, _)| *pid);

    let (pid, mut child) = match live {
        Some(pid) => match table.tasks.remove(&pid) {
            Some(task) => (Some(pid), task.child),
            None => return,
        },
        None => match table.reaping.remove(&exit.os_pid) {
            Some(child) => (None, child),
            None => {
                tracing::debug!("Ignoring exit of unknown child {}", exit.os_pid);
                return;
            }
        },
    };
    drop(table);

    match child.wait() {
        Ok(status) => match pid {
            Some(pid) => tracing::info!("Child {}/{} exited with {}", pid, exit.os_pid, status),
            None => tracing::debug!("Killed child {} exited with {}", exit.os_pid, status),
        },
        Err(e) => tracing::warn!("Failed to reap child {}: {}", exit.os_pid, e),
    }
}
