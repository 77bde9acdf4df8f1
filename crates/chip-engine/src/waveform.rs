//! Waveform generators.
//!
//! Sample `i` of a block is taken at time `t = i / sample_rate`, so every
//! block starts at phase zero. The `fill_*` functions write into an
//! existing slice starting `start` samples into the block, so a long block
//! can be produced piecewise with the same phase; the block-returning
//! helpers allocate and run at [`SAMPLE_RATE`].

use alloc::vec;
use alloc::vec::Vec;
use core::f64::consts::TAU;
use rand::Rng;

/// Output sample rate of the player.
pub const SAMPLE_RATE: u32 = 44100;

/// Peak level of the pulse channels.
pub const PULSE_AMPLITUDE: f32 = 0.3;

/// Peak level of the triangle channel.
pub const TRIANGLE_AMPLITUDE: f32 = 0.3;

/// Peak level of the noise channel.
pub const NOISE_AMPLITUDE: f32 = 0.1;

/// Number of samples covering `duration` seconds, rounded to nearest.
pub fn block_len(duration: f64, sample_rate: u32) -> usize {
    let len = libm::round(sample_rate as f64 * duration);
    if len > 0.0 {
        len as usize
    } else {
        0
    }
}

/// Fill `out` with a square wave: the sign of `sin(2π·f·t)` scaled to ±0.3.
///
/// Samples that land exactly on a zero crossing are 0.
pub fn fill_square(out: &mut [f32], start: u64, freq: f64, sample_rate: u32) {
    let step = freq / sample_rate as f64;
    for (i, sample) in out.iter_mut().enumerate() {
        let s = libm::sin(TAU * unit_phase(step * (start + i as u64) as f64));
        *sample = if s > 0.0 {
            PULSE_AMPLITUDE
        } else if s < 0.0 {
            -PULSE_AMPLITUDE
        } else {
            0.0
        };
    }
}

/// Fill `out` with a bipolar triangle wave scaled to ±0.3.
pub fn fill_triangle(out: &mut [f32], start: u64, freq: f64, sample_rate: u32) {
    let step = freq / sample_rate as f64;
    for (i, sample) in out.iter_mut().enumerate() {
        let x = step * (start + i as u64) as f64;
        let tri = 2.0 * libm::fabs(2.0 * (x - libm::floor(0.5 + x))) - 1.0;
        *sample = TRIANGLE_AMPLITUDE * tri as f32;
    }
}

/// Fill `out` with uniform noise in `[-0.1, 0.1]`.
pub fn fill_noise<R: Rng + ?Sized>(out: &mut [f32], rng: &mut R) {
    for sample in out.iter_mut() {
        *sample = rng.gen_range(-NOISE_AMPLITUDE..=NOISE_AMPLITUDE);
    }
}

/// Square-wave block of `duration` seconds.
pub fn square(freq: f64, duration: f64) -> Vec<f32> {
    let mut block = silence(duration);
    fill_square(&mut block, 0, freq, SAMPLE_RATE);
    block
}

/// Triangle-wave block of `duration` seconds.
pub fn triangle(freq: f64, duration: f64) -> Vec<f32> {
    let mut block = silence(duration);
    fill_triangle(&mut block, 0, freq, SAMPLE_RATE);
    block
}

/// Noise block of `duration` seconds.
pub fn noise<R: Rng + ?Sized>(duration: f64, rng: &mut R) -> Vec<f32> {
    let mut block = silence(duration);
    fill_noise(&mut block, rng);
    block
}

/// Silent block of `duration` seconds.
pub fn silence(duration: f64) -> Vec<f32> {
    vec![0.0; block_len(duration, SAMPLE_RATE)]
}

// Fractional part of a cycle count, keeping `sin` arguments small on long blocks.
fn unit_phase(cycles: f64) -> f64 {
    cycles - libm::floor(cycles)
}
