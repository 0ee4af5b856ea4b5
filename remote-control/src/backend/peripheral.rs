//! Cursor, smartcard and tuner capabilities

use serde::{Deserialize, Serialize};

use super::{BackendError, BackendResult};

/// Hides the pointer after a period without movement
pub trait CursorMovement: Send {
    fn set_timeout(&self, timeout_ms: u32) -> BackendResult<()>;
    fn timeout(&self) -> BackendResult<u32>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    I2c,
    T0,
    T1,
    Unknown,
}

pub trait Smartcard: Send {
    /// Type of the inserted card; `None` when no card is present
    fn card_type(&self) -> BackendResult<Option<CardType>>;
    fn read(&self, offset: u64, buffer: &mut [u8]) -> BackendResult<usize>;
    fn write(&self, offset: u64, buffer: &[u8]) -> BackendResult<usize>;
}

/// Analog TV tuner
pub trait Tuner: Send {
    fn set_input(&self, input: i32) -> BackendResult<()>;
    fn set_standard(&self, standard: &str) -> BackendResult<()>;
    fn set_frequency(&self, frequency: u64) -> BackendResult<()>;
}

#[derive(Debug, Default)]
pub struct NullCursorMovement;

impl CursorMovement for NullCursorMovement {
    fn set_timeout(&self, _timeout_ms: u32) -> BackendResult<()> {
        Err(BackendError::NotSupported("cursor_movement_set_timeout"))
    }

    fn timeout(&self) -> BackendResult<u32> {
        Err(BackendError::NotSupported("cursor_movement_get_timeout"))
    }
}

/// Smartcard slot that never holds a card
#[derive(Debug, Default)]
pub struct NullSmartcard;

impl Smartcard for NullSmartcard {
    fn card_type(&self) -> BackendResult<Option<CardType>> {
        Ok(None)
    }

    fn read(&self, _offset: u64, _buffer: &mut [u8]) -> BackendResult<usize> {
        Err(BackendError::NoDevice("smartcard"))
    }

    fn write(&self, _offset: u64, _buffer: &[u8]) -> BackendResult<usize> {
        Err(BackendError::NoDevice("smartcard"))
    }
}

#[derive(Debug, Default)]
pub struct NullTuner;

impl Tuner for NullTuner {
    fn set_input(&self, _input: i32) -> BackendResult<()> {
        Err(BackendError::NotSupported("tuner_set_input"))
    }

    fn set_standard(&self, _standard: &str) -> BackendResult<()> {
        Err(BackendError::NotSupported("tuner_set_standard"))
    }

    fn set_frequency(&self, _frequency: u64) -> BackendResult<()> {
        Err(BackendError::NotSupported("tuner_set_frequency"))
    }
}
