//! Hook switch and smartcard-detect lines on sysfs GPIOs
//!
//! Each configured line is exported, set to interrupt on both edges and
//! watched by one background thread. The thread only reads values; readings
//! cross to the scheduler thread through a [`QueueSource`] whose handler
//! reports them to the event manager.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::os::fd::AsFd;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use event_manager::{Event, EventManager, HookState, SmartcardState};
use main_loop::{QueueSender, QueueSource};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use serde::Deserialize;

use super::sysfs::write_attr;
use super::{BackendError, BackendResult};

/// Upper bound of one poll; also bounds shutdown latency
const POLL_TIMEOUT_MS: u16 = 500;

/// Which GPIO implementation to create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpioKind {
    #[default]
    Auto,
    Sysfs,
    Null,
}

/// `[gpio]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GpioConfig {
    pub backend: GpioKind,
    pub sysfs_root: PathBuf,
    /// Line number of the handset hook switch
    pub handset: Option<u32>,
    /// Line number of the smartcard presence switch
    pub smartcard: Option<u32>,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            backend: GpioKind::Auto,
            sysfs_root: PathBuf::from("/sys"),
            handset: None,
            smartcard: None,
        }
    }
}

/// Function of a watched line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioLine {
    Handset,
    Smartcard,
}

/// One value read from a watched line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioReading {
    pub line: GpioLine,
    pub value: u8,
}

impl GpioReading {
    /// Event the reading stands for; both switches are active high
    pub fn event(self) -> Event {
        match (self.line, self.value) {
            (GpioLine::Handset, 0) => Event::Hook(HookState::On),
            (GpioLine::Handset, _) => Event::Hook(HookState::Off),
            (GpioLine::Smartcard, 0) => Event::Smartcard(SmartcardState::Inserted),
            (GpioLine::Smartcard, _) => Event::Smartcard(SmartcardState::Removed),
        }
    }
}

impl GpioConfig {
    fn lines(&self) -> Vec<(GpioLine, u32)> {
        let mut lines = Vec::new();
        if let Some(number) = self.handset {
            lines.push((GpioLine::Handset, number));
        }
        if let Some(number) = self.smartcard {
            lines.push((GpioLine::Smartcard, number));
        }
        lines
    }

    fn class_dir(&self) -> PathBuf {
        self.sysfs_root.join("class/gpio")
    }

    /// Create the configured backend and, when any line is watched, the
    /// source that reports its readings to `events`
    pub fn create(
        &self,
        events: Arc<EventManager>,
    ) -> BackendResult<(GpioBackend, Option<QueueSource<GpioReading>>)> {
        let lines = self.lines();
        let use_sysfs = match self.backend {
            GpioKind::Null => false,
            GpioKind::Sysfs => true,
            GpioKind::Auto => !lines.is_empty() && has_gpio_class(&self.sysfs_root),
        };

        if !use_sysfs || lines.is_empty() {
            tracing::debug!("No GPIO lines watched");
            return Ok((GpioBackend::null(), None));
        }

        let (source, readings) = QueueSource::new("gpio", move |reading: GpioReading| {
            let event = reading.event();
            tracing::debug!("GPIO {:?} --> {:?}", reading.line, event);
            if let Err(e) = events.report(event) {
                tracing::warn!("Failed to report {:?}: {}", event, e);
            }
        });

        let backend = GpioBackend::open(self.class_dir(), &lines, readings)?;
        Ok((backend, Some(source)))
    }
}

struct WatchedLine {
    line: GpioLine,
    number: u32,
    value: File,
}

/// Exported GPIO lines and their watcher thread
pub struct GpioBackend {
    class_dir: PathBuf,
    lines: Vec<(GpioLine, u32)>,
    /// Lines this backend exported and must unexport again
    exported: Vec<u32>,
    done: Arc<AtomicBool>,
    watcher: Option<JoinHandle<()>>,
}

impl GpioBackend {
    fn null() -> Self {
        Self {
            class_dir: PathBuf::new(),
            lines: Vec::new(),
            exported: Vec::new(),
            done: Arc::new(AtomicBool::new(true)),
            watcher: None,
        }
    }

    fn open(
        class_dir: PathBuf,
        lines: &[(GpioLine, u32)],
        readings: QueueSender<GpioReading>,
    ) -> BackendResult<Self> {
        let mut backend = Self {
            class_dir,
            lines: lines.to_vec(),
            exported: Vec::new(),
            done: Arc::new(AtomicBool::new(false)),
            watcher: None,
        };

        // On error `backend` is dropped, which unexports what was exported
        let mut watched = Vec::with_capacity(lines.len());
        for &(line, number) in lines {
            let mut value = backend.watch(number)?;
            let reading = read_value(&mut value)
                .map_err(|e| BackendError::io(backend.line_dir(number).join("value"), e))?;
            tracing::debug!("GPIO#{} exported, watching...", number);

            // The initial level is reported like any later edge
            let initial = GpioReading {
                line,
                value: reading,
            };
            if readings.send(initial).is_err() {
                tracing::debug!("GPIO source gone, dropping initial level of GPIO#{}", number);
            }
            watched.push(WatchedLine {
                line,
                number,
                value,
            });
        }

        let done = Arc::clone(&backend.done);
        let watcher = thread::Builder::new()
            .name("gpio-watch".to_string())
            .spawn(move || watch_lines(watched, readings, done))
            .map_err(|source| BackendError::Thread {
                name: "gpio-watch",
                source,
            })?;
        backend.watcher = Some(watcher);

        Ok(backend)
    }

    fn line_dir(&self, number: u32) -> PathBuf {
        self.class_dir.join(format!("gpio{}", number))
    }

    /// Export a line if needed and arm it for both edges
    fn watch(&mut self, number: u32) -> BackendResult<File> {
        let dir = self.line_dir(number);
        if !dir.is_dir() {
            write_attr(&self.class_dir.join("export"), number)?;
            self.exported.push(number);
        }

        write_attr(&dir.join("edge"), "both")?;

        let path = dir.join("value");
        File::open(&path).map_err(|e| BackendError::io(path, e))
    }

    /// Watched lines and their numbers
    pub fn lines(&self) -> &[(GpioLine, u32)] {
        &self.lines
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }
}

impl Drop for GpioBackend {
    fn drop(&mut self) {
        self.done.store(true, Ordering::Release);

        if let Some(watcher) = self.watcher.take() {
            if watcher.join().is_err() {
                tracing::error!("GPIO watcher thread panicked");
            }
        }

        for number in self.exported.drain(..) {
            let unexport = self.class_dir.join("unexport");
            if let Err(e) = write_attr(&unexport, number) {
                tracing::debug!("Failed to unexport GPIO#{}: {}", number, e);
            }
        }
    }
}

impl std::fmt::Debug for GpioBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpioBackend")
            .field("lines", &self.lines)
            .field("watching", &self.is_watching())
            .finish()
    }
}

fn read_value(file: &mut File) -> io::Result<u8> {
    file.seek(SeekFrom::Start(0))?;
    let mut byte = [0u8; 1];
    if file.read(&mut byte)? == 0 {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
    }
    Ok(byte[0].wrapping_sub(b'0'))
}

fn watch_lines(
    mut lines: Vec<WatchedLine>,
    readings: QueueSender<GpioReading>,
    done: Arc<AtomicBool>,
) {
    let events = PollFlags::POLLPRI | PollFlags::POLLERR;

    while !done.load(Ordering::Acquire) {
        let ready: Vec<bool> = {
            let mut fds: Vec<PollFd> = lines
                .iter()
                .map(|watched| PollFd::new(watched.value.as_fd(), events))
                .collect();

            match poll(&mut fds, PollTimeout::from(POLL_TIMEOUT_MS)) {
                Ok(0) | Err(Errno::EINTR) => continue,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Polling GPIO lines failed: {}", e);
                    break;
                }
            }

            fds.iter()
                .map(|fd| fd.revents().is_some_and(|revents| revents.intersects(events)))
                .collect()
        };

        for (watched, ready) in lines.iter_mut().zip(ready) {
            if !ready {
                continue;
            }

            let value = match read_value(&mut watched.value) {
                Ok(value) => value,
                Err(e) => {
                    tracing::debug!("Reading GPIO#{} failed: {}", watched.number, e);
                    continue;
                }
            };

            let reading = GpioReading {
                line: watched.line,
                value,
            };
            if readings.send(reading).is_err() {
                tracing::debug!("GPIO source gone, stopping watcher");
                return;
            }
        }
    }
}

/// Whether `root` looks like a sysfs tree with the GPIO class
pub fn has_gpio_class(root: &Path) -> bool {
    root.join("class/gpio").is_dir()
}
