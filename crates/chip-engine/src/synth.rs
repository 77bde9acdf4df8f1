//! Per-channel block synthesis for a single note event.

use chip_ir::{ChannelKind, NoteEvent, Voice};
use rand::Rng;

use crate::waveform::{fill_noise, fill_square, fill_triangle};

/// Overwrite `out` with what `channel` plays during `event`, starting
/// `start` samples into the event.
///
/// Silent voices write zeros, so every channel emits exactly as many
/// samples for an event as every other. Rendering an event in pieces
/// gives the same samples as rendering it whole, except for noise.
pub fn render_event_into<R: Rng + ?Sized>(
    out: &mut [f32],
    start: u64,
    channel: ChannelKind,
    event: &NoteEvent,
    sample_rate: u32,
    rng: &mut R,
) {
    match (channel, event.voice(channel)) {
        (_, Voice::Silent) => out.fill(0.0),
        (ChannelKind::Triangle, Voice::Tone(freq)) => fill_triangle(out, start, freq as f64, sample_rate),
        (_, Voice::Tone(freq)) => fill_square(out, start, freq as f64, sample_rate),
        (_, Voice::Noise) => fill_noise(out, rng),
    }
}
