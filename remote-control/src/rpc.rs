//! RPC dispatch
//!
//! Front-ends send [`Request`] values and receive [`Response`] values; how
//! they travel between processes is up to the transport. Every failure is
//! reported as a negative errno status so clients of the original C
//! interface can keep their error handling.

use std::fmt;
use std::time::Duration;

use event_manager::{EventError, EventSource};
use net_udp::{ChannelRef, NetUdpError, MAX_PACKET_SIZE};
use nix::errno::Errno;
use serde::{Deserialize, Serialize};
use serde_json::json;
use task_manager::TaskError;

use crate::backend::{
    AudioState, BackendError, MixerControl, MixerInputSource, OutputWindow, VoipAccount,
};
use crate::remote_control::RemoteControl;

/// Largest smartcard read a single request may ask for
pub const MAX_SMARTCARD_READ: usize = 4096;

/// Errors that can be reported as an errno status
pub trait StatusCode: fmt::Display {
    fn errno(&self) -> Errno;

    /// Negative errno, as returned on the wire
    fn status(&self) -> i32 {
        -(self.errno() as i32)
    }
}

fn os_errno(error: &std::io::Error, fallback: Errno) -> Errno {
    error.raw_os_error().map(Errno::from_raw).unwrap_or(fallback)
}

impl StatusCode for EventError {
    fn errno(&self) -> Errno {
        match self {
            EventError::InvalidSource(_) => Errno::EINVAL,
            EventError::NoData(_) => Errno::ENODATA,
            EventError::NotSupported(_) => Errno::ENOSYS,
            EventError::OutOfMemory { .. } => Errno::ENOMEM,
        }
    }
}

impl StatusCode for NetUdpError {
    fn errno(&self) -> Errno {
        match self {
            NetUdpError::Resolve { .. } | NetUdpError::NoIpv4Address(_) => Errno::EINVAL,
            NetUdpError::InvalidArgument(_) => Errno::EINVAL,
            NetUdpError::NoSuchChannel(_) => Errno::ENOENT,
            other => other
                .io_error()
                .map(|e| os_errno(e, Errno::EIO))
                .unwrap_or(Errno::EIO),
        }
    }
}

impl StatusCode for TaskError {
    fn errno(&self) -> Errno {
        match self {
            TaskError::Parse { .. } | TaskError::Spawn { .. } => Errno::EACCES,
            TaskError::NoSuchProcess(_) => Errno::ESRCH,
            TaskError::InvalidSignal(_) => Errno::EINVAL,
            TaskError::Exhausted(_) => Errno::EAGAIN,
            TaskError::Signal { source, .. } => *source,
        }
    }
}

impl StatusCode for BackendError {
    fn errno(&self) -> Errno {
        match self {
            BackendError::NotSupported(_) => Errno::ENOSYS,
            BackendError::InvalidArgument(_) => Errno::EINVAL,
            BackendError::NoDevice(_) => Errno::ENODEV,
            BackendError::Io { source, .. } | BackendError::Thread { source, .. } => {
                os_errno(source, Errno::EIO)
            }
            BackendError::Parse { .. } => Errno::EIO,
        }
    }
}

/// One call from a front-end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum Request {
    EventGetStatus,
    EventGetSourceState { source: EventSource },

    BacklightEnable { enable: bool },
    BacklightIsEnabled,
    BacklightSet { brightness: u32 },
    BacklightGet,

    NetCreateChannel { local_port: u16, remote_host: String, remote_port: u16 },
    NetDestroyChannel { channel: i32 },
    NetSend { channel: i32, data: Vec<u8> },
    NetRecv { channel: i32, max_size: usize },

    TaskExec { command: String },
    TaskKill { pid: i32, signal: i32 },
    TaskList,

    WatchdogStart { interval: u64 },
    WatchdogStop,
    WatchdogTrigger,
    WatchdogIsEnabled,

    MediaPlayerSetOutputWindow { x: u32, y: u32, width: u32, height: u32 },
    MediaPlayerSetUri { uri: String },
    MediaPlayerGetUri,
    MediaPlayerPlay,
    MediaPlayerStop,
    MediaPlayerGetState,

    AudioSetState { state: AudioState },
    AudioGetState,
    AudioSetVolume { volume: u8 },
    AudioGetVolume,
    AudioEnableSpeakers { enable: bool },
    AudioSpeakersEnabled,

    SoundPlay { uri: String },

    MixerSetVolume { control: MixerControl, volume: u32 },
    MixerGetVolume { control: MixerControl },
    MixerSetMute { control: MixerControl, mute: bool },
    MixerIsMuted { control: MixerControl },
    MixerSetInputSource { source: MixerInputSource },
    MixerGetInputSource,
    MixerLoopbackEnable { enable: bool },
    MixerLoopbackIsEnabled,

    ModemCall { number: String },
    ModemAccept,
    ModemTerminate,
    ModemGetState,

    VoipLogin { host: String, port: u16, username: String, password: String },
    VoipLogout,
    VoipCall { uri: String },
    VoipAccept,
    VoipTerminate,
    VoipGetState,
    VoipGetContact,
    VoipDial { dtmf: u8 },

    HandsetDisplayClear,
    HandsetDisplaySync,
    HandsetDisplaySetBrightness { brightness: u32 },
    HandsetKeypadSetBrightness { brightness: u32 },
    HandsetIconShow { id: u32, show: bool },
    HandsetTextShow { x: u32, y: u32, text: String, show: bool },

    SmartcardGetType,
    SmartcardRead { offset: u64, size: usize },
    SmartcardWrite { offset: u64, data: Vec<u8> },

    TunerSetInput { input: i32 },
    TunerSetStandard { standard: String },
    TunerSetFrequency { frequency: u64 },

    CursorSetTimeout { timeout_ms: u32 },
    CursorGetTimeout,
}

/// Result of one call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", content = "value", rename_all = "snake_case")]
pub enum Response {
    Ok,
    Value(serde_json::Value),
    Error { code: i32, message: String },
}

impl Response {
    fn failure(error: &dyn StatusCode) -> Self {
        Response::Error {
            code: error.status(),
            message: error.to_string(),
        }
    }

    /// Status code of an error response
    pub fn status(&self) -> Option<i32> {
        match self {
            Response::Error { code, .. } => Some(*code),
            _ => None,
        }
    }
}

fn done<E: StatusCode>(result: Result<(), E>) -> Response {
    match result {
        Ok(()) => Response::Ok,
        Err(e) => Response::failure(&e),
    }
}

fn value<T: Serialize, E: StatusCode>(result: Result<T, E>) -> Response {
    match result {
        Ok(value) => match serde_json::to_value(value) {
            Ok(value) => Response::Value(value),
            Err(e) => Response::Error {
                code: -(Errno::EINVAL as i32),
                message: e.to_string(),
            },
        },
        Err(e) => Response::failure(&e),
    }
}

/// Execute `request` against the backends of `rc`
pub fn dispatch(rc: &RemoteControl, request: Request) -> Response {
    tracing::trace!("Dispatching {:?}", request);

    match request {
        Request::EventGetStatus => value::<_, EventError>(Ok(rc.event_manager().status())),
        Request::EventGetSourceState { source } => {
            value(rc.event_manager().get_source_state(source))
        }

        Request::BacklightEnable { enable } => done(rc.backlight().enable(enable)),
        Request::BacklightIsEnabled => value(rc.backlight().is_enabled()),
        Request::BacklightSet { brightness } => done(rc.backlight().set_brightness(brightness)),
        Request::BacklightGet => value(rc.backlight().brightness()),

        Request::NetCreateChannel {
            local_port,
            remote_host,
            remote_port,
        } => value(
            rc.net_udp()
                .create_channel(local_port, &remote_host, remote_port)
                .map(ChannelRef::as_raw),
        ),
        Request::NetDestroyChannel { channel } => {
            rc.net_udp().destroy_channel(ChannelRef::from_raw(channel));
            Response::Ok
        }
        Request::NetSend { channel, data } => {
            value(rc.net_udp().send(ChannelRef::from_raw(channel), &data))
        }
        Request::NetRecv { channel, max_size } => {
            // No datagram is ever longer than the receiver's scratch buffer
            let mut buffer = vec![0u8; max_size.min(MAX_PACKET_SIZE)];
            value(
                rc.net_udp()
                    .recv(ChannelRef::from_raw(channel), &mut buffer)
                    .map(|count| {
                        buffer.truncate(count);
                        buffer
                    }),
            )
        }

        Request::TaskExec { command } => value(rc.task_manager().exec(&command)),
        Request::TaskKill { pid, signal } => done(rc.task_manager().kill(pid, signal)),
        Request::TaskList => {
            let tasks: Vec<_> = rc
                .task_manager()
                .tasks()
                .into_iter()
                .map(|task| json!({ "pid": task.pid, "command": task.command }))
                .collect();
            value::<_, TaskError>(Ok(tasks))
        }

        Request::WatchdogStart { interval } => {
            done(rc.app_watchdog().start(Duration::from_secs(interval)))
        }
        Request::WatchdogStop => {
            rc.app_watchdog().stop();
            Response::Ok
        }
        Request::WatchdogTrigger => done(rc.app_watchdog().trigger()),
        Request::WatchdogIsEnabled => {
            value::<_, BackendError>(Ok(rc.app_watchdog().is_enabled()))
        }

        Request::MediaPlayerSetOutputWindow {
            x,
            y,
            width,
            height,
        } => done(rc.media_player().set_output_window(OutputWindow {
            x,
            y,
            width,
            height,
        })),
        Request::MediaPlayerSetUri { uri } => done(rc.media_player().set_uri(&uri)),
        Request::MediaPlayerGetUri => value(rc.media_player().uri()),
        Request::MediaPlayerPlay => done(rc.media_player().play()),
        Request::MediaPlayerStop => done(rc.media_player().stop()),
        Request::MediaPlayerGetState => value(rc.media_player().state()),

        Request::AudioSetState { state } => done(rc.audio().set_state(state)),
        Request::AudioGetState => value(rc.audio().state()),
        Request::AudioSetVolume { volume } => done(rc.audio().set_volume(volume)),
        Request::AudioGetVolume => value(rc.audio().volume()),
        Request::AudioEnableSpeakers { enable } => done(rc.audio().set_speakers_enable(enable)),
        Request::AudioSpeakersEnabled => value(rc.audio().speakers_enabled()),

        Request::SoundPlay { uri } => done(rc.sound_manager().play(&uri)),

        Request::MixerSetVolume { control, volume } => {
            done(rc.mixer().set_volume(control, volume))
        }
        Request::MixerGetVolume { control } => value(rc.mixer().volume(control)),
        Request::MixerSetMute { control, mute } => done(rc.mixer().set_mute(control, mute)),
        Request::MixerIsMuted { control } => value(rc.mixer().is_muted(control)),
        Request::MixerSetInputSource { source } => done(rc.mixer().set_input_source(source)),
        Request::MixerGetInputSource => value(rc.mixer().input_source()),
        Request::MixerLoopbackEnable { enable } => done(rc.mixer().set_loopback(enable)),
        Request::MixerLoopbackIsEnabled => value(rc.mixer().loopback_enabled()),

        Request::ModemCall { number } => done(rc.modem_manager().call(&number)),
        Request::ModemAccept => done(rc.modem_manager().accept()),
        Request::ModemTerminate => done(rc.modem_manager().terminate()),
        Request::ModemGetState => value(rc.modem_manager().state()),

        Request::VoipLogin {
            host,
            port,
            username,
            password,
        } => done(rc.voip().login(&VoipAccount {
            host,
            port,
            username,
            password,
        })),
        Request::VoipLogout => done(rc.voip().logout()),
        Request::VoipCall { uri } => done(rc.voip().call(&uri)),
        Request::VoipAccept => value(rc.voip().accept()),
        Request::VoipTerminate => done(rc.voip().terminate()),
        Request::VoipGetState => value(rc.voip().state()),
        Request::VoipGetContact => value(rc.voip().contact()),
        Request::VoipDial { dtmf } => done(rc.voip().dial(dtmf)),

        Request::HandsetDisplayClear => done(rc.handset().display_clear()),
        Request::HandsetDisplaySync => done(rc.handset().display_sync()),
        Request::HandsetDisplaySetBrightness { brightness } => {
            done(rc.handset().display_set_brightness(brightness))
        }
        Request::HandsetKeypadSetBrightness { brightness } => {
            done(rc.handset().keypad_set_brightness(brightness))
        }
        Request::HandsetIconShow { id, show } => done(rc.handset().icon_show(id, show)),
        Request::HandsetTextShow { x, y, text, show } => {
            done(rc.handset().text_show(x, y, &text, show))
        }

        Request::SmartcardGetType => value(rc.smartcard().card_type()),
        Request::SmartcardRead { size, .. } if size > MAX_SMARTCARD_READ => {
            value::<Vec<u8>, _>(Err(BackendError::InvalidArgument(format!(
                "smartcard read of {} bytes exceeds {}",
                size, MAX_SMARTCARD_READ
            ))))
        }
        Request::SmartcardRead { offset, size } => {
            let mut buffer = vec![0u8; size];
            value(rc.smartcard().read(offset, &mut buffer).map(|count| {
                buffer.truncate(count);
                buffer
            }))
        }
        Request::SmartcardWrite { offset, data } => value(rc.smartcard().write(offset, &data)),

        Request::TunerSetInput { input } => done(rc.tuner().set_input(input)),
        Request::TunerSetStandard { standard } => done(rc.tuner().set_standard(&standard)),
        Request::TunerSetFrequency { frequency } => done(rc.tuner().set_frequency(frequency)),

        Request::CursorSetTimeout { timeout_ms } => {
            done(rc.cursor_movement().set_timeout(timeout_ms))
        }
        Request::CursorGetTimeout => value(rc.cursor_movement().timeout()),
    }
}

/// Decode a JSON request, dispatch it and encode the response
pub fn handle_json(rc: &RemoteControl, request: &str) -> String {
    let response = match serde_json::from_str::<Request>(request) {
        Ok(request) => dispatch(rc, request),
        Err(e) => {
            tracing::debug!("Malformed request {:?}: {}", request, e);
            Response::Error {
                code: -(Errno::EINVAL as i32),
                message: e.to_string(),
            }
        }
    };

    serde_json::to_string(&response).unwrap_or_else(|e| {
        json!({
            "result": "error",
            "value": { "code": -(Errno::EIO as i32), "message": e.to_string() },
        })
        .to_string()
    })
}
