//! Media playback, audio routing, sound effects and mixer controls

use serde::{Deserialize, Serialize};

use super::{BackendError, BackendResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaPlayerState {
    #[default]
    Stopped,
    Playing,
}

/// Window rectangle for video output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

pub trait MediaPlayer: Send {
    fn set_output_window(&self, window: OutputWindow) -> BackendResult<()>;
    fn set_uri(&self, uri: &str) -> BackendResult<()>;
    fn uri(&self) -> BackendResult<String>;
    fn play(&self) -> BackendResult<()>;
    fn stop(&self) -> BackendResult<()>;
    fn state(&self) -> BackendResult<MediaPlayerState>;
}

/// Audio routing profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioState {
    #[default]
    Inactive,
    HifiPlaybackSpeaker,
    HifiPlaybackHeadset,
    VoicecallHandset,
    VoicecallHeadset,
    VoicecallSpeaker,
    VoicecallIpHandset,
    VoicecallIpHeadset,
    VoicecallIpSpeaker,
}

pub trait Audio: Send {
    fn set_state(&self, state: AudioState) -> BackendResult<()>;
    fn state(&self) -> BackendResult<AudioState>;
    fn set_volume(&self, volume: u8) -> BackendResult<()>;
    fn volume(&self) -> BackendResult<u8>;
    fn set_speakers_enable(&self, enable: bool) -> BackendResult<()>;
    fn speakers_enabled(&self) -> BackendResult<bool>;
}

/// Plays short sounds such as ring tones
pub trait SoundManager: Send {
    fn play(&self, uri: &str) -> BackendResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixerControl {
    PlaybackMaster,
    PlaybackPcm,
    PlaybackHeadset,
    PlaybackSpeaker,
    PlaybackHandset,
    CaptureMaster,
    CaptureHeadset,
    CaptureHandset,
    CaptureLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixerInputSource {
    #[default]
    Unknown,
    Headset,
    Handset,
    Line,
}

pub trait Mixer: Send {
    fn set_volume(&self, control: MixerControl, volume: u32) -> BackendResult<()>;
    fn volume(&self, control: MixerControl) -> BackendResult<u32>;
    fn set_mute(&self, control: MixerControl, mute: bool) -> BackendResult<()>;
    fn is_muted(&self, control: MixerControl) -> BackendResult<bool>;
    fn set_input_source(&self, source: MixerInputSource) -> BackendResult<()>;
    fn input_source(&self) -> BackendResult<MixerInputSource>;
    fn set_loopback(&self, enable: bool) -> BackendResult<()>;
    fn loopback_enabled(&self) -> BackendResult<bool>;
}

#[derive(Debug, Default)]
pub struct NullMediaPlayer;

impl MediaPlayer for NullMediaPlayer {
    fn set_output_window(&self, _window: OutputWindow) -> BackendResult<()> {
        Err(BackendError::NotSupported("media_player_set_output_window"))
    }

    fn set_uri(&self, _uri: &str) -> BackendResult<()> {
        Err(BackendError::NotSupported("media_player_set_uri"))
    }

    fn uri(&self) -> BackendResult<String> {
        Err(BackendError::NotSupported("media_player_get_uri"))
    }

    fn play(&self) -> BackendResult<()> {
        Err(BackendError::NotSupported("media_player_play"))
    }

    fn stop(&self) -> BackendResult<()> {
        Err(BackendError::NotSupported("media_player_stop"))
    }

    fn state(&self) -> BackendResult<MediaPlayerState> {
        Err(BackendError::NotSupported("media_player_get_state"))
    }
}

#[derive(Debug, Default)]
pub struct NullAudio;

impl Audio for NullAudio {
    fn set_state(&self, _state: AudioState) -> BackendResult<()> {
        Err(BackendError::NotSupported("audio_set_state"))
    }

    fn state(&self) -> BackendResult<AudioState> {
        Err(BackendError::NotSupported("audio_get_state"))
    }

    fn set_volume(&self, _volume: u8) -> BackendResult<()> {
        Err(BackendError::NotSupported("audio_set_volume"))
    }

    fn volume(&self) -> BackendResult<u8> {
        Err(BackendError::NotSupported("audio_get_volume"))
    }

    fn set_speakers_enable(&self, _enable: bool) -> BackendResult<()> {
        Err(BackendError::NotSupported("audio_set_speakers_enable"))
    }

    fn speakers_enabled(&self) -> BackendResult<bool> {
        Err(BackendError::NotSupported("audio_get_speakers_enable"))
    }
}

#[derive(Debug, Default)]
pub struct NullSoundManager;

impl SoundManager for NullSoundManager {
    fn play(&self, _uri: &str) -> BackendResult<()> {
        Err(BackendError::NotSupported("sound_manager_play"))
    }
}

#[derive(Debug, Default)]
pub struct NullMixer;

impl Mixer for NullMixer {
    fn set_volume(&self, _control: MixerControl, _volume: u32) -> BackendResult<()> {
        Err(BackendError::NotSupported("mixer_set_volume"))
    }

    fn volume(&self, _control: MixerControl) -> BackendResult<u32> {
        Err(BackendError::NotSupported("mixer_get_volume"))
    }

    fn set_mute(&self, _control: MixerControl, _mute: bool) -> BackendResult<()> {
        Err(BackendError::NotSupported("mixer_set_mute"))
    }

    fn is_muted(&self, _control: MixerControl) -> BackendResult<bool> {
        Err(BackendError::NotSupported("mixer_is_muted"))
    }

    fn set_input_source(&self, _source: MixerInputSource) -> BackendResult<()> {
        Err(BackendError::NotSupported("mixer_set_input_source"))
    }

    fn input_source(&self) -> BackendResult<MixerInputSource> {
        Err(BackendError::NotSupported("mixer_get_input_source"))
    }

    fn set_loopback(&self, _enable: bool) -> BackendResult<()> {
        Err(BackendError::NotSupported("mixer_loopback_enable"))
    }

    fn loopback_enabled(&self) -> BackendResult<bool> {
        Err(BackendError::NotSupported("mixer_loopback_is_enabled"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_backends_reject_every_operation() {
        assert!(matches!(
            NullMediaPlayer.play(),
            Err(BackendError::NotSupported("media_player_play"))
        ));
        assert!(matches!(NullAudio.volume(), Err(BackendError::NotSupported(_))));
        assert!(matches!(
            NullSoundManager.play("file:///ring.wav"),
            Err(BackendError::NotSupported(_))
        ));
        assert!(matches!(
            NullMixer.set_mute(MixerControl::PlaybackMaster, true),
            Err(BackendError::NotSupported(_))
        ));
    }

    #[test]
    fn test_mixer_control_names() {
        let control: MixerControl = serde_json::from_str("\"capture_line\"").unwrap();
        assert_eq!(control, MixerControl::CaptureLine);
        assert_eq!(
            serde_json::to_string(&AudioState::VoicecallIpSpeaker).unwrap(),
            "\"voicecall_ip_speaker\""
        );
    }
}
