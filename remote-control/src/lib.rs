//! Composition root of the remote-control daemon
//!
//! [`RemoteControl`] creates every backend in dependency order, attaches each
//! backend's scheduling source to one root [`CompositeSource`] and hands out
//! typed accessors. [`rpc::dispatch`] maps front-end requests onto those
//! accessors.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────── RemoteControl ────────────────────────────┐
//! │                                                                       │
//! │  EventManager ◄── report ── GpioBackend ──► gpio QueueSource ─┐       │
//! │       ▲                                                       │       │
//! │       │                     NetUdp ──► recv thread            │       │
//! │  rpc::dispatch              TaskManager ──► task exits ───────┤       │
//! │       │                     AppWatchdog ──► WatchdogSource ───┤       │
//! │       ▼                                                       ▼       │
//! │  typed accessors                                   CompositeSource    │
//! │  (backlight, audio, mixer, modem, voip, ...)       (root, MainLoop)   │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use remote_control::{Config, RemoteControl};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("/etc/remote-control.conf")?;
//!     let mut rc = RemoteControl::new(&config)?;
//!
//!     let quit = rc.quit_handle();
//!     std::thread::spawn(move || {
//!         std::thread::sleep(std::time::Duration::from_secs(5));
//!         quit.quit();
//!     });
//!
//!     rc.run();
//!     Ok(())
//! }
//! ```
//!
//! [`CompositeSource`]: main_loop::CompositeSource

pub mod backend;
pub mod config;
pub mod error;
pub mod logging;
pub mod remote_control;
pub mod rpc;

pub use config::{Config, ConfigError};
pub use error::{RemoteControlError, Result};
pub use logging::{init_logging, init_logging_from_env, LoggingError, LoggingMode};
pub use remote_control::RemoteControl;
pub use rpc::{dispatch, handle_json, Request, Response, StatusCode, MAX_SMARTCARD_READ};

// Re-export the core crates so front-ends depend on one crate only
pub use event_manager;
pub use main_loop;
pub use net_udp;
pub use task_manager;
