//! Summing channel blocks into the mono output.
//!
//! Nothing here allocates; the mixer callback calls these on the audio thread.

/// Output samples are clamped to `±MIX_CEILING`.
///
/// The four channel peaks (0.3 + 0.3 + 0.3 + 0.1) add up to exactly this
/// value, so clamping only ever touches out-of-range input.
pub const MIX_CEILING: f32 = 1.0;

/// Add `input` into `out` sample by sample.
///
/// Only the overlapping prefix is touched.
#[inline]
pub fn accumulate(out: &mut [f32], input: &[f32]) {
    for (o, i) in out.iter_mut().zip(input) {
        *o += *i;
    }
}

/// Clamp every sample of `out` to the output range.
#[inline]
pub fn clamp_block(out: &mut [f32]) {
    for sample in out.iter_mut() {
        *sample = sample.clamp(-MIX_CEILING, MIX_CEILING);
    }
}
