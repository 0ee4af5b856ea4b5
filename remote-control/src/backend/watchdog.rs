//! Application watchdog
//!
//! Guards against a stalled front-end: once started, the front-end must call
//! [`AppWatchdog::trigger`] within every interval or the daemon terminates
//! itself. The deadline is carried by a [`WatchdogSource`] on the scheduler,
//! so a stalled scheduler cannot fire it either.

use std::sync::Arc;
use std::time::{Duration, Instant};

use main_loop::{Dispatch, Source, Wakeup};
use nix::sys::signal::{raise, Signal};
use parking_lot::Mutex;
use serde::Deserialize;

use super::{BackendError, BackendResult};

/// `[watchdog]` table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Interval in seconds; a positive value starts the watchdog at once
    pub timeout: u64,
}

type ExpireAction = Box<dyn FnMut() + Send>;

#[derive(Default)]
struct WatchdogState {
    interval: Option<Duration>,
    deadline: Option<Instant>,
    wakeup: Option<Wakeup>,
}

impl WatchdogState {
    /// Wake the scheduler so it picks up a changed deadline
    fn notify(&self) {
        if let Some(wakeup) = &self.wakeup {
            wakeup.wake();
        }
    }

    /// Move the deadline one interval past now
    fn arm(&mut self) -> BackendResult<()> {
        let interval = self.interval.ok_or_else(|| {
            BackendError::InvalidArgument("watchdog interval was never set".to_string())
        })?;

        self.deadline = Some(Instant::now() + interval);
        self.notify();
        Ok(())
    }
}

/// Front-end liveness watchdog
#[derive(Clone)]
pub struct AppWatchdog {
    state: Arc<Mutex<WatchdogState>>,
}

impl AppWatchdog {
    /// Create the watchdog and its scheduler source
    ///
    /// On expiry the daemon raises `SIGTERM` against itself.
    pub fn new(config: &WatchdogConfig) -> (Self, WatchdogSource) {
        Self::with_action(config, || {
            if let Err(e) = raise(Signal::SIGTERM) {
                tracing::error!("Failed to raise SIGTERM: {}", e);
            }
        })
    }

    /// Create the watchdog with a custom expiry action
    pub fn with_action(
        config: &WatchdogConfig,
        on_expire: impl FnMut() + Send + 'static,
    ) -> (Self, WatchdogSource) {
        let state = Arc::new(Mutex::new(WatchdogState::default()));
        let watchdog = Self {
            state: Arc::clone(&state),
        };
        let source = WatchdogSource {
            state,
            on_expire: Box::new(on_expire),
        };

        if config.timeout > 0 {
            tracing::debug!("Autostart watchdog with interval {}s", config.timeout);
            if let Err(e) = watchdog.start(Duration::from_secs(config.timeout)) {
                tracing::warn!("Could not autostart watchdog: {}", e);
            }
        }

        (watchdog, source)
    }

    /// Arm the watchdog for `interval` from now
    ///
    /// A zero interval keeps the previous one; it is an error when no
    /// interval was ever set.
    pub fn start(&self, interval: Duration) -> BackendResult<()> {
        let mut state = self.state.lock();
        if !interval.is_zero() {
            state.interval = Some(interval);
        }
        state.arm()
    }

    /// Disarm the watchdog; the interval is kept for later restarts
    pub fn stop(&self) {
        let mut state = self.state.lock();
        state.deadline = None;
        state.notify();
    }

    /// Push the deadline one interval into the future
    pub fn trigger(&self) -> BackendResult<()> {
        let mut state = self.state.lock();
        if state.deadline.is_none() {
            return Err(BackendError::NoDevice("watchdog"));
        }
        state.arm()
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().deadline.is_some()
    }

    /// Current interval, if one was ever set
    pub fn timeout(&self) -> Option<Duration> {
        self.state.lock().interval
    }
}

impl std::fmt::Debug for AppWatchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppWatchdog")
            .field("enabled", &self.is_enabled())
            .field("timeout", &self.timeout())
            .finish()
    }
}

/// Scheduler source that fires the watchdog's deadline
pub struct WatchdogSource {
    state: Arc<Mutex<WatchdogState>>,
    on_expire: ExpireAction,
}

impl Source for WatchdogSource {
    fn name(&self) -> &str {
        "watchdog"
    }

    fn attach(&mut self, wakeup: Wakeup) {
        self.state.lock().wakeup = Some(wakeup);
    }

    fn deadline(&self) -> Option<Instant> {
        self.state.lock().deadline
    }

    fn dispatch(&mut self) -> Dispatch {
        let expired = {
            let mut state = self.state.lock();
            match state.deadline {
                Some(deadline) if deadline <= Instant::now() => {
                    state.deadline = None;
                    true
                }
                _ => false,
            }
        };

        if expired {
            tracing::error!("WATCHDOG: the user interface seems stalled, restarting");
            (self.on_expire)();
        }

        Dispatch::Continue
    }
}
