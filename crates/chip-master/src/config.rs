//! Playback configuration.

use chip_engine::{block_len, SAMPLE_RATE};
use std::time::Duration;

use crate::error::ControllerError;

/// What happens when the last note event has been rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EndOfSong {
    /// Stop the session once the buffers have played out
    #[default]
    Stop,
    /// Start over at the first event, on every channel at the same step
    Loop,
}

/// Settings applied when a session starts.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackConfig {
    /// Output sample rate in hertz
    pub sample_rate: u32,
    /// Capacity of each channel buffer, in seconds of audio
    pub buffer_seconds: f32,
    /// How far ahead of playback the producers render
    pub lookahead: Duration,
    /// End-of-song policy
    pub end_of_song: EndOfSong,
    /// How long `stop` waits for producers to acknowledge
    pub stop_timeout: Duration,
    /// Mixer scratch size; larger device requests are mixed in passes
    pub max_block_frames: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            buffer_seconds: 2.0,
            lookahead: Duration::from_millis(250),
            end_of_song: EndOfSong::Stop,
            stop_timeout: Duration::from_secs(1),
            max_block_frames: 4096,
        }
    }
}

impl PlaybackConfig {
    pub fn with_end_of_song(mut self, policy: EndOfSong) -> Self {
        self.end_of_song = policy;
        self
    }

    pub fn with_lookahead(mut self, lookahead: Duration) -> Self {
        self.lookahead = lookahead;
        self
    }

    pub fn with_buffer_seconds(mut self, seconds: f32) -> Self {
        self.buffer_seconds = seconds;
        self
    }

    pub fn looping(&self) -> bool {
        self.end_of_song == EndOfSong::Loop
    }

    /// Channel buffer capacity in samples.
    pub fn buffer_capacity(&self) -> usize {
        block_len(self.buffer_seconds as f64, self.sample_rate)
    }

    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.sample_rate == 0 {
            return Err(ControllerError::InvalidConfig("sample rate must be non-zero".into()));
        }
        if !(self.buffer_seconds.is_finite() && self.buffer_capacity() > 0) {
            return Err(ControllerError::InvalidConfig(format!(
                "buffer of {} s holds no samples",
                self.buffer_seconds
            )));
        }
        if self.max_block_frames == 0 {
            return Err(ControllerError::InvalidConfig("mixer block size must be non-zero".into()));
        }
        Ok(())
    }
}
