//! WAV encoding for 16-bit mono PCM.

use chip_engine::{render_song, samples_per_event};
use chip_ir::Song;
use rand::Rng;
use std::io::{self, Write};

const NUM_CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;
/// Header bytes counted by the RIFF size field besides the sample data.
const RIFF_OVERHEAD: u32 = 36;

/// Convert a float sample to signed 16-bit, clamping out-of-range input.
pub fn to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

/// Size of the data chunk for `samples` frames.
///
/// Fails when the file would not fit the 32-bit RIFF size fields.
fn data_size(samples: usize, block_align: u16) -> io::Result<u32> {
    u32::try_from(samples)
        .ok()
        .and_then(|n| n.checked_mul(u32::from(block_align)))
        .filter(|&size| size <= u32::MAX - RIFF_OVERHEAD)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} samples is too long for a WAV file", samples),
            )
        })
}

pub fn write_wav(w: &mut impl Write, samples: &[f32], sample_rate: u32) -> io::Result<()> {
    let block_align = NUM_CHANNELS * (BITS_PER_SAMPLE / 8);
    let data_size = data_size(samples.len(), block_align)?;

    write_riff_header(w, data_size)?;
    write_fmt_chunk(w, sample_rate, block_align)?;
    write_data_chunk(w, samples, data_size)
}

pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(44 + samples.len() * 2);
    write_wav(&mut buf, samples, sample_rate)?;
    Ok(buf)
}

/// Render one pass of `song` offline and encode it.
///
/// Songs too long for a WAV file are rejected before anything is rendered.
pub fn render_to_wav<R: Rng + ?Sized>(song: &Song, sample_rate: u32, rng: &mut R) -> io::Result<Vec<u8>> {
    let total = samples_per_event(song, sample_rate).fold(0usize, usize::saturating_add);
    data_size(total, NUM_CHANNELS * (BITS_PER_SAMPLE / 8))?;

    let samples = render_song(song, sample_rate, rng);
    samples_to_wav(&samples, sample_rate)
}

fn write_riff_header(w: &mut impl Write, data_size: u32) -> io::Result<()> {
    w.write_all(b"RIFF")?;
    w.write_all(&(RIFF_OVERHEAD + data_size).to_le_bytes())?;
    w.write_all(b"WAVE")
}

fn write_fmt_chunk(w: &mut impl Write, sample_rate: u32, block_align: u16) -> io::Result<()> {
    w.write_all(b"fmt ")?;
    w.write_all(&16u32.to_le_bytes())?;
    // PCM
    w.write_all(&1u16.to_le_bytes())?;
    w.write_all(&NUM_CHANNELS.to_le_bytes())?;
    w.write_all(&sample_rate.to_le_bytes())?;
    w.write_all(&sample_rate.wrapping_mul(u32::from(block_align)).to_le_bytes())?;
    w.write_all(&block_align.to_le_bytes())?;
    w.write_all(&BITS_PER_SAMPLE.to_le_bytes())
}

fn write_data_chunk(w: &mut impl Write, samples: &[f32], data_size: u32) -> io::Result<()> {
    w.write_all(b"data")?;
    w.write_all(&data_size.to_le_bytes())?;
    for &sample in samples {
        w.write_all(&to_pcm16(sample).to_le_bytes())?;
    }
    Ok(())
}
