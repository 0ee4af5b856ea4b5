//! Composition root
//!
//! [`RemoteControl`] owns one instance of every backend and the root
//! scheduling unit that every backend source is attached to.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use event_manager::{EventManager, EventManagerConfig};
use main_loop::{CompositeSource, MainLoop, OwnerId, OwnerIds, QuitHandle, Source, SourceId};
use net_udp::NetUdp;
use task_manager::{TaskManager, TaskManagerConfig};

use crate::backend::{
    AppWatchdog, Audio, Backlight, BacklightConfig, CursorMovement, GpioBackend, GpioConfig,
    Handset, MediaPlayer, Mixer, ModemManager, NullAudio, NullCursorMovement, NullHandset,
    NullMediaPlayer, NullMixer, NullModemManager, NullSmartcard, NullSoundManager, NullTuner,
    NullUsbHandset, NullVoip, Smartcard, SoundManager, Tuner, UsbHandset, Voip, WatchdogConfig,
};
use crate::config::{Config, EventsSection, TasksSection};
use crate::error::{RemoteControlError, Result};

/// Owner of every backend of the daemon
///
/// Backends are created in a fixed order because later ones may report
/// through earlier ones, and dropped in the exact reverse order. The field
/// order below is that reverse order.
pub struct RemoteControl {
    root: CompositeSource,
    main_loop: MainLoop,
    owners: OwnerIds,
    watchdog: AppWatchdog,
    usb_handset: Box<dyn UsbHandset>,
    gpio: GpioBackend,
    mixer: Box<dyn Mixer>,
    handset: Box<dyn Handset>,
    tuner: Box<dyn Tuner>,
    tasks: TaskManager,
    net: NetUdp,
    voip: Box<dyn Voip>,
    modem: Box<dyn ModemManager>,
    smartcard: Box<dyn Smartcard>,
    sound: Box<dyn SoundManager>,
    audio: Box<dyn Audio>,
    media_player: Box<dyn MediaPlayer>,
    cursor: Box<dyn CursorMovement>,
    backlight: Box<dyn Backlight>,
    events: Arc<EventManager>,
}

fn backend<T>(name: &'static str, result: crate::backend::BackendResult<T>) -> Result<T> {
    result
        .map(|value| {
            tracing::debug!("Created {} backend", name);
            value
        })
        .map_err(|source| {
            tracing::error!("Failed to create {} backend: {}", name, source);
            RemoteControlError::Backend { name, source }
        })
}

impl RemoteControl {
    /// Create every backend from `config`
    ///
    /// The first failing backend aborts construction; backends created
    /// before it are dropped again in reverse order.
    pub fn new(config: &Config) -> Result<Self> {
        let mut root = CompositeSource::new();

        let events_config: EventManagerConfig = config.section::<EventsSection>("events")?.into();
        let events = Arc::new(EventManager::with_config(events_config));

        let backlight = backend(
            "backlight",
            config.section::<BacklightConfig>("backlight")?.create(),
        )?;
        let cursor: Box<dyn CursorMovement> = Box::new(NullCursorMovement);
        let media_player: Box<dyn MediaPlayer> = Box::new(NullMediaPlayer);
        let audio: Box<dyn Audio> = Box::new(NullAudio);
        let sound: Box<dyn SoundManager> = Box::new(NullSoundManager);
        let smartcard: Box<dyn Smartcard> = Box::new(NullSmartcard);
        let modem: Box<dyn ModemManager> = Box::new(NullModemManager);
        let voip: Box<dyn Voip> = Box::new(NullVoip);

        let net = NetUdp::new()?;

        let tasks_config: TaskManagerConfig = config.section::<TasksSection>("tasks")?.into();
        let (tasks, exits) = TaskManager::new(tasks_config);
        root.add_child(Box::new(exits));

        let tuner: Box<dyn Tuner> = Box::new(NullTuner);
        let handset: Box<dyn Handset> = Box::new(NullHandset);
        let mixer: Box<dyn Mixer> = Box::new(NullMixer);

        let (gpio, gpio_source) = backend(
            "gpio",
            config.section::<GpioConfig>("gpio")?.create(Arc::clone(&events)),
        )?;
        if let Some(source) = gpio_source {
            root.add_child(Box::new(source));
        }

        let usb_handset: Box<dyn UsbHandset> = Box::new(NullUsbHandset);

        let (watchdog, watchdog_source) =
            AppWatchdog::new(&config.section::<WatchdogConfig>("watchdog")?);
        root.add_child(Box::new(watchdog_source));

        let main_loop = MainLoop::new(&root);

        tracing::info!("Remote control ready with {} sources", root.len());

        Ok(Self {
            root,
            main_loop,
            owners: OwnerIds::new(),
            watchdog,
            usb_handset,
            gpio,
            mixer,
            handset,
            tuner,
            tasks,
            net,
            voip,
            modem,
            smartcard,
            sound,
            audio,
            media_player,
            cursor,
            backlight,
            events,
        })
    }

    pub fn event_manager(&self) -> &EventManager {
        &self.events
    }

    /// Shared handle for consumers that report from their own sources
    pub fn event_manager_handle(&self) -> Arc<EventManager> {
        Arc::clone(&self.events)
    }

    pub fn backlight(&self) -> &dyn Backlight {
        self.backlight.as_ref()
    }

    pub fn cursor_movement(&self) -> &dyn CursorMovement {
        self.cursor.as_ref()
    }

    pub fn media_player(&self) -> &dyn MediaPlayer {
        self.media_player.as_ref()
    }

    pub fn audio(&self) -> &dyn Audio {
        self.audio.as_ref()
    }

    pub fn sound_manager(&self) -> &dyn SoundManager {
        self.sound.as_ref()
    }

    pub fn smartcard(&self) -> &dyn Smartcard {
        self.smartcard.as_ref()
    }

    pub fn modem_manager(&self) -> &dyn ModemManager {
        self.modem.as_ref()
    }

    pub fn voip(&self) -> &dyn Voip {
        self.voip.as_ref()
    }

    pub fn net_udp(&self) -> &NetUdp {
        &self.net
    }

    pub fn task_manager(&self) -> &TaskManager {
        &self.tasks
    }

    pub fn tuner(&self) -> &dyn Tuner {
        self.tuner.as_ref()
    }

    pub fn handset(&self) -> &dyn Handset {
        self.handset.as_ref()
    }

    pub fn mixer(&self) -> &dyn Mixer {
        self.mixer.as_ref()
    }

    pub fn gpio(&self) -> &GpioBackend {
        &self.gpio
    }

    pub fn usb_handset(&self) -> &dyn UsbHandset {
        self.usb_handset.as_ref()
    }

    pub fn app_watchdog(&self) -> &AppWatchdog {
        &self.watchdog
    }

    /// Identity for a new consumer's callback registrations
    pub fn new_owner(&self) -> OwnerId {
        self.owners.allocate()
    }

    /// Attach a consumer source, e.g. from [`NetUdp::watch_channel`]
    pub fn add_source(&mut self, source: Box<dyn Source>) -> SourceId {
        self.root.add_child(source)
    }

    pub fn remove_source(&mut self, id: SourceId) -> bool {
        self.root.remove_child(id)
    }

    /// Number of sources attached to the root
    pub fn source_count(&self) -> usize {
        self.root.len()
    }

    /// Run one scheduling pass; see [`CompositeSource::iteration`]
    pub fn iteration(&mut self, max_wait: Option<Duration>) -> usize {
        self.root.iteration(max_wait)
    }

    pub fn quit_handle(&self) -> QuitHandle {
        self.main_loop.quit_handle()
    }

    /// Dispatch sources until the quit handle is used
    pub fn run(&mut self) {
        self.main_loop.run(&mut self.root);
    }
}

impl Drop for RemoteControl {
    fn drop(&mut self) {
        tracing::debug!("Shutting down remote control");
    }
}

impl fmt::Debug for RemoteControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteControl")
            .field("sources", &self.root.len())
            .field("channels", &self.net.len())
            .field("tasks", &self.tasks.len())
            .field("gpio", &self.gpio)
            .field("watchdog", &self.watchdog)
            .finish()
    }
}
