//! Controller error type.

use chip_audio::AudioError;
use chip_ir::{ChannelKind, SongError};
use thiserror::Error;

/// Why a session could not be started.
#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("playback is already running; stop it first")]
    AlreadyPlaying,

    #[error("invalid song: {0}")]
    InvalidSong(#[from] SongError),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("audio device: {0}")]
    Device(#[from] AudioError),

    #[error("failed to spawn {channel} producer: {source}")]
    Spawn {
        channel: ChannelKind,
        #[source]
        source: std::io::Error,
    },
}
