//! Hardware capability slots
//!
//! Each capability is a trait with a null implementation that accepts
//! nothing and reports [`BackendError::NotSupported`]. The composition root
//! only sees the traits; which implementation sits behind one is decided
//! when the backend is created.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub mod backlight;
pub mod gpio;
pub mod media;
pub mod peripheral;
pub mod telephony;
pub mod watchdog;

mod sysfs;

/// Errors returned by backend operations
#[derive(Error, Debug)]
pub enum BackendError {
    /// Operation not implemented by the active backend
    #[error("{0} is not supported by this backend")]
    NotSupported(&'static str),

    /// Out-of-range or malformed input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Device required by the operation is absent or inactive
    #[error("No device: {0}")]
    NoDevice(&'static str),

    /// Device file access failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Device file held something other than expected
    #[error("Unexpected contents in {}: {contents:?}", path.display())]
    Parse { path: PathBuf, contents: String },

    /// Worker thread could not be started
    #[error("Failed to start {name}: {source}")]
    Thread {
        name: &'static str,
        #[source]
        source: io::Error,
    },
}

impl BackendError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for backend operations
pub type BackendResult<T> = std::result::Result<T, BackendError>;

pub use backlight::{Backlight, BacklightConfig, BacklightKind, NullBacklight, SysfsBacklight};
pub use gpio::{GpioBackend, GpioConfig, GpioKind, GpioLine, GpioReading};
pub use media::{
    Audio, AudioState, MediaPlayer, MediaPlayerState, Mixer, MixerControl, MixerInputSource,
    NullAudio, NullMediaPlayer, NullMixer, NullSoundManager, OutputWindow, SoundManager,
};
pub use peripheral::{
    CardType, CursorMovement, NullCursorMovement, NullSmartcard, NullTuner, Smartcard, Tuner,
};
pub use telephony::{
    Handset, ModemManager, NullHandset, NullModemManager, NullUsbHandset, NullVoip, UsbHandset,
    Voip, VoipAccount,
};
pub use watchdog::{AppWatchdog, WatchdogConfig, WatchdogSource};
