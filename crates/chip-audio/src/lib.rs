//! Audio plumbing for the chiptune player.
//!
//! Channel buffers carry samples from the producer threads to the mixer;
//! the mixer runs inside an [`AudioOutput`] backend's callback.

mod buffer;
mod cpal_backend;
mod manual;
mod mixer;
mod traits;

pub use buffer::{channel_buffer, BufferReader, BufferWriter};
pub use cpal_backend::CpalOutput;
pub use manual::{ManualHandle, ManualOutput};
pub use mixer::{MixStats, Mixer};
pub use traits::{AudioError, AudioOutput, RenderCallback};
