//! Display backlight
//!
//! The sysfs backend drives `/sys/class/backlight/<device>`. When the device
//! directory is missing and the backend is left on `auto`, the null backend
//! is used instead.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::sysfs::{read_u32, write_attr};
use super::{BackendError, BackendResult};

/// `bl_power` value for an enabled backlight (FB_BLANK_UNBLANK)
const POWER_ON: u32 = 0;
/// `bl_power` value for a disabled backlight (FB_BLANK_POWERDOWN)
const POWER_OFF: u32 = 4;

pub trait Backlight: Send {
    fn enable(&self, enable: bool) -> BackendResult<()>;
    fn is_enabled(&self) -> BackendResult<bool>;
    fn set_brightness(&self, brightness: u32) -> BackendResult<()>;
    fn brightness(&self) -> BackendResult<u32>;
}

/// Which backlight implementation to create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BacklightKind {
    #[default]
    Auto,
    Sysfs,
    Null,
}

/// `[backlight]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BacklightConfig {
    pub backend: BacklightKind,
    pub device: String,
    pub sysfs_root: PathBuf,
}

impl Default for BacklightConfig {
    fn default() -> Self {
        Self {
            backend: BacklightKind::Auto,
            device: "pwm-backlight".to_string(),
            sysfs_root: PathBuf::from("/sys"),
        }
    }
}

impl BacklightConfig {
    fn device_dir(&self) -> PathBuf {
        self.sysfs_root
            .join("class/backlight")
            .join(&self.device)
    }

    /// Create the configured backend
    pub fn create(&self) -> BackendResult<Box<dyn Backlight>> {
        let dir = self.device_dir();
        match self.backend {
            BacklightKind::Null => Ok(Box::new(NullBacklight)),
            BacklightKind::Sysfs => Ok(Box::new(SysfsBacklight::open(dir)?)),
            BacklightKind::Auto if dir.is_dir() => Ok(Box::new(SysfsBacklight::open(dir)?)),
            BacklightKind::Auto => {
                tracing::info!("No backlight at {}, using null backend", dir.display());
                Ok(Box::new(NullBacklight))
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct NullBacklight;

impl Backlight for NullBacklight {
    fn enable(&self, _enable: bool) -> BackendResult<()> {
        Err(BackendError::NotSupported("backlight_enable"))
    }

    fn is_enabled(&self) -> BackendResult<bool> {
        Err(BackendError::NotSupported("backlight_is_enabled"))
    }

    fn set_brightness(&self, _brightness: u32) -> BackendResult<()> {
        Err(BackendError::NotSupported("backlight_set"))
    }

    fn brightness(&self) -> BackendResult<u32> {
        Err(BackendError::NotSupported("backlight_get"))
    }
}

/// Backlight class device in sysfs
#[derive(Debug)]
pub struct SysfsBacklight {
    dir: PathBuf,
    max_brightness: u32,
}

impl SysfsBacklight {
    /// Open a backlight device directory and read its range
    pub fn open(dir: impl Into<PathBuf>) -> BackendResult<Self> {
        let dir = dir.into();
        let max_brightness = read_u32(&dir.join("max_brightness"))?;

        tracing::debug!(
            "Using backlight {} (max brightness {})",
            dir.display(),
            max_brightness
        );

        Ok(Self {
            dir,
            max_brightness,
        })
    }

    pub fn max_brightness(&self) -> u32 {
        self.max_brightness
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

impl Backlight for SysfsBacklight {
    fn enable(&self, enable: bool) -> BackendResult<()> {
        let power = if enable { POWER_ON } else { POWER_OFF };
        write_attr(&self.dir.join("bl_power"), power)
    }

    fn is_enabled(&self) -> BackendResult<bool> {
        Ok(read_u32(&self.dir.join("bl_power"))? == POWER_ON)
    }

    fn set_brightness(&self, brightness: u32) -> BackendResult<()> {
        if brightness > self.max_brightness {
            return Err(BackendError::InvalidArgument(format!(
                "brightness {} exceeds maximum {}",
                brightness, self.max_brightness
            )));
        }
        write_attr(&self.dir.join("brightness"), brightness)
    }

    fn brightness(&self) -> BackendResult<u32> {
        read_u32(&self.dir.join("brightness"))
    }
}
