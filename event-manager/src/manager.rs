//! Event bus with per-source state cache
//!
//! The manager answers two questions for every consumer: "what is the
//! current state of source X" and "tell me when any source changes".
//! Stateful sources keep only their most recent value; handset key events
//! queue up and are drained strictly oldest first.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use main_loop::OwnerId;
use parking_lot::Mutex;

use crate::error::{CallbackError, EventError, Result};
use crate::event::{
    Event, EventSource, HandsetKey, HookState, ModemState, RfidState, SmartcardState, VoipState,
};

/// Signature of a consumer callback
pub type EventCallback = dyn Fn(&Event) -> std::result::Result<(), CallbackError> + Send + Sync;

/// Shared handle to a consumer callback
///
/// Two handles are the same callback when they were cloned from one another.
#[derive(Clone)]
pub struct CallbackHandle(Arc<EventCallback>);

impl CallbackHandle {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Event) -> std::result::Result<(), CallbackError> + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    /// Whether both handles refer to the same callback allocation
    pub fn same(&self, other: &CallbackHandle) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }

    fn call(&self, event: &Event) -> std::result::Result<(), CallbackError> {
        (self.0)(event)
    }
}

impl fmt::Debug for CallbackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallbackHandle({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// Tunables for the event manager
#[derive(Debug, Clone)]
pub struct EventManagerConfig {
    /// Maximum number of undrained handset events
    pub handset_queue_capacity: usize,
}

impl Default for EventManagerConfig {
    fn default() -> Self {
        Self {
            handset_queue_capacity: 256,
        }
    }
}

struct Registration {
    callback: CallbackHandle,
    owner: OwnerId,
}

struct State {
    modem: ModemState,
    voip: VoipState,
    smartcard: SmartcardState,
    hook: HookState,
    rfid: RfidState,
    handset: VecDeque<HandsetKey>,
    status: u32,
    /// Most recently registered first
    callbacks: Vec<Registration>,
}

/// In-process event bus for hardware state changes
pub struct EventManager {
    state: Mutex<State>,
    config: EventManagerConfig,
}

impl EventManager {
    /// Create a manager with every stateful source at its idle value
    pub fn new() -> Self {
        Self::with_config(EventManagerConfig::default())
    }

    pub fn with_config(config: EventManagerConfig) -> Self {
        Self {
            state: Mutex::new(State {
                modem: ModemState::default(),
                voip: VoipState::default(),
                smartcard: SmartcardState::default(),
                hook: HookState::default(),
                rfid: RfidState::default(),
                handset: VecDeque::new(),
                status: 0,
                callbacks: Vec::new(),
            }),
            config,
        }
    }

    /// Record a state change and notify every registered consumer
    ///
    /// Callbacks run on the calling thread, most recently registered first,
    /// after the cache has been updated and outside the manager's lock. A
    /// failing callback is logged and does not stop delivery to the others.
    pub fn report(&self, event: Event) -> Result<()> {
        let callbacks: Vec<CallbackHandle> = {
            let mut state = self.state.lock();

            match event {
                Event::Modem(modem) => state.modem = modem,
                Event::Voip(voip) => state.voip = voip,
                Event::Smartcard(smartcard) => state.smartcard = smartcard,
                Event::Hook(hook) => state.hook = hook,
                Event::Rfid(rfid) => state.rfid = rfid,
                Event::Handset(key) => {
                    let capacity = self.config.handset_queue_capacity;
                    if state.handset.len() >= capacity {
                        tracing::warn!("Dropping handset key {}: queue full", key.keycode);
                        return Err(EventError::OutOfMemory { capacity });
                    }
                    state.handset.push_back(key);
                }
                Event::Io => {}
            }

            state.status |= event.source().bit();
            state
                .callbacks
                .iter()
                .map(|registration| registration.callback.clone())
                .collect()
        };

        tracing::debug!("Reported {:?} to {} consumers", event, callbacks.len());

        for callback in callbacks {
            if let Err(e) = callback.call(&event) {
                tracing::warn!("Event callback for {} failed: {}", event.source(), e);
            }
        }

        Ok(())
    }

    /// Current state of a source
    ///
    /// Stateful sources return their cached value. The handset source pops
    /// the oldest queued key event and fails with [`EventError::NoData`] when
    /// none is queued. Never blocks.
    pub fn get_source_state(&self, source: EventSource) -> Result<Event> {
        let mut state = self.state.lock();

        let event = match source {
            EventSource::Modem => Event::Modem(state.modem),
            EventSource::Voip => Event::Voip(state.voip),
            EventSource::Smartcard => Event::Smartcard(state.smartcard),
            EventSource::Hook => Event::Hook(state.hook),
            EventSource::Rfid => Event::Rfid(state.rfid),
            EventSource::Handset => {
                let key = state.handset.pop_front();
                if state.handset.is_empty() {
                    state.status &= !source.bit();
                }
                return key.map(Event::Handset).ok_or(EventError::NoData(source));
            }
            EventSource::Io => return Err(EventError::NotSupported(source)),
        };

        state.status &= !source.bit();
        Ok(event)
    }

    /// Bit mask of sources reported since they were last queried
    pub fn status(&self) -> u32 {
        self.state.lock().status
    }

    /// Sources reported since they were last queried
    pub fn pending_sources(&self) -> Vec<EventSource> {
        EventSource::from_mask(self.status())
    }

    /// Number of undrained handset events
    pub fn handset_backlog(&self) -> usize {
        self.state.lock().handset.len()
    }

    /// Install, replace or remove the registration held by `owner`
    ///
    /// An owner holds at most one registration. `Some` replaces whatever the
    /// owner had registered; `None` removes it.
    pub fn set_event_cb(&self, callback: Option<CallbackHandle>, owner: OwnerId) {
        let mut state = self.state.lock();
        state.callbacks.retain(|registration| registration.owner != owner);

        match callback {
            Some(callback) => {
                tracing::debug!("Registered event callback for {}", owner);
                state.callbacks.insert(0, Registration { callback, owner });
            }
            None => tracing::debug!("Removed event callback for {}", owner),
        }
    }

    /// Owner of the most recent registration of `callback`, if any
    pub fn get_event_cb_owner(&self, callback: &CallbackHandle) -> Option<OwnerId> {
        self.state
            .lock()
            .callbacks
            .iter()
            .find(|registration| registration.callback.same(callback))
            .map(|registration| registration.owner)
    }

    /// Remove the registration of `owner` only if it still holds `callback`
    ///
    /// Returns whether a registration was removed. Consumers call this on
    /// teardown so they never revoke a registration another consumer has
    /// taken over since.
    pub fn clear_event_cb_if_owner(&self, callback: &CallbackHandle, owner: OwnerId) -> bool {
        let mut state = self.state.lock();
        let before = state.callbacks.len();
        state
            .callbacks
            .retain(|registration| !(registration.owner == owner && registration.callback.same(callback)));
        state.callbacks.len() != before
    }

    /// Number of live callback registrations
    pub fn registrations(&self) -> usize {
        self.state.lock().callbacks.len()
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("EventManager")
            .field("modem", &state.modem)
            .field("voip", &state.voip)
            .field("smartcard", &state.smartcard)
            .field("hook", &state.hook)
            .field("rfid", &state.rfid)
            .field("handset_backlog", &state.handset.len())
            .field("registrations", &state.callbacks.len())
            .finish()
    }
}
