//! Synthesis engine for the chiptune player.
//!
//! Turns note events into sample blocks (one generator per channel kind),
//! sums channel blocks into the mono output, and renders whole songs
//! offline.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod mix;
mod render;
mod synth;
pub mod waveform;

pub use mix::{accumulate, clamp_block, MIX_CEILING};
pub use render::{position_at_sample, render_channel, render_song, samples_per_event};
pub use synth::render_event_into;
pub use waveform::{block_len, SAMPLE_RATE};
