//! Audio output trait and error types.

use thiserror::Error;

/// Error type for audio operations.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("no audio output device available")]
    NoDevice,

    #[error("device init error: {0}")]
    DeviceInit(String),

    #[error("stream create error: {0}")]
    StreamCreate(String),

    #[error("playback error: {0}")]
    Playback(String),

    #[error("audio output is not open")]
    NotOpen,

    #[error("audio output is already open")]
    AlreadyOpen,
}

/// Callback filling one block of mono output samples.
///
/// Runs on the device's real-time thread.
pub type RenderCallback = Box<dyn FnMut(&mut [f32]) + Send + 'static>;

/// Trait for pull-based audio output backends.
///
/// The device owns the schedule: once started it invokes the callback
/// passed to [`AudioOutput::open`] whenever it needs more samples.
pub trait AudioOutput {
    /// Open a stream at `sample_rate` with `channels` device channels.
    ///
    /// The callback always renders mono; backends with more than one
    /// channel copy it to every channel.
    fn open(&mut self, sample_rate: u32, channels: u16, callback: RenderCallback) -> Result<(), AudioError>;

    /// Start pulling samples.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Stop pulling samples. The stream stays open.
    fn stop(&mut self) -> Result<(), AudioError>;

    /// Release the stream and drop the callback.
    fn close(&mut self);

    fn is_open(&self) -> bool;
}
