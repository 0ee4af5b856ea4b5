//! Event sources and their payloads

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EventError;

/// Hardware or software subsystem that can report state changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    Modem,
    Io,
    Voip,
    Smartcard,
    Hook,
    Handset,
    Rfid,
}

impl EventSource {
    pub const ALL: [EventSource; 7] = [
        EventSource::Modem,
        EventSource::Io,
        EventSource::Voip,
        EventSource::Smartcard,
        EventSource::Hook,
        EventSource::Handset,
        EventSource::Rfid,
    ];

    /// Wire index of the source
    pub fn index(self) -> u32 {
        match self {
            EventSource::Modem => 0,
            EventSource::Io => 1,
            EventSource::Voip => 2,
            EventSource::Smartcard => 3,
            EventSource::Hook => 4,
            EventSource::Handset => 5,
            EventSource::Rfid => 6,
        }
    }

    /// Bit of this source in the pending-status mask
    pub fn bit(self) -> u32 {
        1 << self.index()
    }

    /// Sources whose last reported value is cached
    pub fn is_stateful(self) -> bool {
        !matches!(self, EventSource::Io | EventSource::Handset)
    }

    /// Expand a status mask into the sources it names
    pub fn from_mask(mask: u32) -> Vec<EventSource> {
        Self::ALL
            .into_iter()
            .filter(|source| mask & source.bit() != 0)
            .collect()
    }
}

impl TryFrom<u32> for EventSource {
    type Error = EventError;

    fn try_from(index: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|source| source.index() == index)
            .ok_or(EventError::InvalidSource(index))
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventSource::Modem => "modem",
            EventSource::Io => "io",
            EventSource::Voip => "voip",
            EventSource::Smartcard => "smartcard",
            EventSource::Hook => "hook",
            EventSource::Handset => "handset",
            EventSource::Rfid => "rfid",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModemState {
    #[default]
    Idle,
    Ringing,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoipState {
    #[default]
    Idle,
    Outgoing,
    OutgoingConnected,
    OutgoingDisconnected,
    Incoming,
    IncomingConnected,
    IncomingDisconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmartcardState {
    #[default]
    Removed,
    Inserted,
}

/// Handset hook switch; `On` means the handset rests in its cradle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookState {
    #[default]
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RfidState {
    #[default]
    Lost,
    Detected,
}

/// One key press or release on the handset keypad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandsetKey {
    pub keycode: u32,
    pub pressed: bool,
}

/// A state change reported by a backend
///
/// The variant determines the source; each carries only the payload that
/// is meaningful for that source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "state", rename_all = "lowercase")]
pub enum Event {
    Modem(ModemState),
    Io,
    Voip(VoipState),
    Smartcard(SmartcardState),
    Hook(HookState),
    Handset(HandsetKey),
    Rfid(RfidState),
}

impl Event {
    pub fn source(&self) -> EventSource {
        match self {
            Event::Modem(_) => EventSource::Modem,
            Event::Io => EventSource::Io,
            Event::Voip(_) => EventSource::Voip,
            Event::Smartcard(_) => EventSource::Smartcard,
            Event::Hook(_) => EventSource::Hook,
            Event::Handset(_) => EventSource::Handset,
            Event::Rfid(_) => EventSource::Rfid,
        }
    }
}
