//! Offline rendering of whole songs.

use alloc::vec;
use alloc::vec::Vec;
use chip_ir::{ChannelKind, PlaybackPosition, Song};
use rand::Rng;

use crate::mix::{accumulate, clamp_block};
use crate::synth::render_event_into;
use crate::waveform::block_len;

/// Block length of each event, in song order.
pub fn samples_per_event(song: &Song, sample_rate: u32) -> impl Iterator<Item = usize> + '_ {
    song.notes
        .iter()
        .map(move |event| block_len(song.event_seconds(event), sample_rate))
}

/// Render one pass of a single channel.
pub fn render_channel<R: Rng + ?Sized>(
    song: &Song,
    channel: ChannelKind,
    sample_rate: u32,
    rng: &mut R,
) -> Vec<f32> {
    let total: usize = samples_per_event(song, sample_rate).sum();
    let mut out = vec![0.0; total];
    let mut offset = 0;
    for (event, len) in song.notes.iter().zip(samples_per_event(song, sample_rate)) {
        render_event_into(&mut out[offset..offset + len], 0, channel, event, sample_rate, rng);
        offset += len;
    }
    out
}

/// Render one pass of the song with all four channels mixed to mono.
pub fn render_song<R: Rng + ?Sized>(song: &Song, sample_rate: u32, rng: &mut R) -> Vec<f32> {
    let mut mixed = render_channel(song, ChannelKind::ALL[0], sample_rate, rng);
    for &channel in &ChannelKind::ALL[1..] {
        let block = render_channel(song, channel, sample_rate, rng);
        accumulate(&mut mixed, &block);
    }
    clamp_block(&mut mixed);
    mixed
}

/// Event being heard after `samples` output samples.
///
/// Past the end of a non-looping song this stays on the last event.
pub fn position_at_sample(
    song: &Song,
    sample_rate: u32,
    samples: u64,
    looping: bool,
) -> PlaybackPosition {
    let pass: u64 = samples_per_event(song, sample_rate).map(|n| n as u64).sum();
    if pass == 0 {
        return PlaybackPosition::default();
    }
    if !looping && samples >= pass {
        return PlaybackPosition {
            event_index: song.notes.len() - 1,
            loop_count: 0,
        };
    }

    let mut remaining = samples % pass;
    let mut event_index = 0;
    for (i, len) in samples_per_event(song, sample_rate).enumerate() {
        event_index = i;
        if remaining < len as u64 {
            break;
        }
        remaining -= len as u64;
    }
    PlaybackPosition {
        event_index,
        loop_count: samples / pass,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::SAMPLE_RATE;
    use approx::assert_abs_diff_eq;
    use chip_ir::NoteEvent;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn beep_then_rest() -> Song {
        Song::new(
            "beep",
            120,
            vec![NoteEvent::new(440, 0, 0, false), NoteEvent::rest()],
        )
    }

    #[test]
    fn beep_then_rest_renders_one_second() {
        let mut rng = SmallRng::seed_from_u64(3);
        let out = render_song(&beep_then_rest(), SAMPLE_RATE, &mut rng);
        assert_eq!(out.len(), 44100);

        let (beep, rest) = out.split_at(22050);
        assert!(beep.iter().all(|s| s.abs() == 0.3 || *s == 0.0));
        assert!(beep.iter().filter(|s| s.abs() == 0.3).count() > 22000);
        assert!(rest.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn beep_has_440_cycles_per_second() {
        let mut rng = SmallRng::seed_from_u64(3);
        let out = render_song(&beep_then_rest(), SAMPLE_RATE, &mut rng);
        let rising = out[..22050]
            .windows(2)
            .filter(|w| w[0] <= 0.0 && w[1] > 0.0)
            .count();
        // 0.5 s of 440 Hz
        assert!((219..=221).contains(&rising), "rising edges: {}", rising);
    }

    #[test]
    fn mixed_output_sums_channels() {
        let song = Song::new("chord", 120, vec![NoteEvent::new(441, 441, 0, false)]);
        let mut rng = SmallRng::seed_from_u64(3);
        let out = render_song(&song, SAMPLE_RATE, &mut rng);
        // Both pulses in phase: 0.3 + 0.3
        assert_abs_diff_eq!(out[25], 0.6, epsilon = 1e-6);
    }

    #[test]
    fn durations_extend_blocks() {
        let song = Song::new(
            "long",
            120,
            vec![NoteEvent::new(440, 0, 0, false).with_duration(3)],
        );
        let lens: Vec<usize> = samples_per_event(&song, SAMPLE_RATE).collect();
        assert_eq!(lens, vec![66150]);
    }

    #[test]
    fn position_tracks_events_and_loops() {
        let song = beep_then_rest();
        assert_eq!(position_at_sample(&song, SAMPLE_RATE, 0, true).event_index, 0);
        assert_eq!(position_at_sample(&song, SAMPLE_RATE, 22049, true).event_index, 0);
        assert_eq!(position_at_sample(&song, SAMPLE_RATE, 22050, true).event_index, 1);

        let wrapped = position_at_sample(&song, SAMPLE_RATE, 44100 + 10, true);
        assert_eq!(wrapped.event_index, 0);
        assert_eq!(wrapped.loop_count, 1);
    }

    #[test]
    fn position_holds_last_event_without_loop() {
        let song = beep_then_rest();
        let pos = position_at_sample(&song, SAMPLE_RATE, 1_000_000, false);
        assert_eq!(pos.event_index, 1);
        assert_eq!(pos.loop_count, 0);
    }
}
