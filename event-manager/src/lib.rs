//! Event bus for the remote-control daemon
//!
//! Backends report hardware state changes here; RPC sessions and the script
//! bridge register one callback each and pull the latest value on demand.
//!
//! # Sources
//!
//! | Source | Kind | Initial value |
//! |---|---|---|
//! | `Modem` | cached | `Idle` |
//! | `Voip` | cached | `Idle` |
//! | `Smartcard` | cached | `Removed` |
//! | `Hook` | cached | `On` |
//! | `Rfid` | cached | `Lost` |
//! | `Handset` | FIFO queue | empty |
//! | `Io` | notification only | none |
//!
//! # Ownership of callbacks
//!
//! Every registration belongs to an [`OwnerId`](main_loop::OwnerId). A
//! consumer that registers again replaces its previous callback, and a
//! consumer that tears down uses
//! [`clear_event_cb_if_owner`](EventManager::clear_event_cb_if_owner) so it
//! never removes a registration another consumer has taken over.

pub mod error;
pub mod event;
pub mod manager;

pub use error::{CallbackError, EventError, Result};
pub use event::{
    Event, EventSource, HandsetKey, HookState, ModemState, RfidState, SmartcardState, VoipState,
};
pub use manager::{CallbackHandle, EventCallback, EventManager, EventManagerConfig};
