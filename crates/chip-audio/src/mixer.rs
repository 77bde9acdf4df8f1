//! Real-time mix callback.
//!
//! The audio device calls [`Mixer::process`] on its own thread whenever it
//! needs samples. The mixer drains every channel buffer by the same amount,
//! sums the channels and writes the mono result. It never locks, sleeps or
//! allocates; diagnostics go out through the atomic counters in
//! [`MixStats`].

use chip_engine::{accumulate, clamp_block};
use chip_ir::CHANNEL_COUNT;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::buffer::BufferReader;

/// Counters published by the mixer, read by the controller.
#[derive(Debug, Default)]
pub struct MixStats {
    callbacks: AtomicU64,
    underruns: AtomicU64,
    consumed: AtomicU64,
}

impl MixStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of device requests served.
    pub fn callbacks(&self) -> u64 {
        self.callbacks.load(Ordering::Relaxed)
    }

    /// Requests that had to be partly or wholly zero-filled.
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    /// Real (non-padding) samples taken from every channel so far.
    pub fn consumed_samples(&self) -> u64 {
        self.consumed.load(Ordering::Relaxed)
    }

}

/// Consumer side of a playback session.
pub struct Mixer {
    readers: [BufferReader; CHANNEL_COUNT],
    scratch: Box<[f32]>,
    stats: Arc<MixStats>,
}

impl Mixer {
    /// Create a mixer over one reader per channel.
    ///
    /// `max_block` sizes the scratch buffer; larger device requests are
    /// processed in several passes.
    pub fn new(readers: [BufferReader; CHANNEL_COUNT], max_block: usize, stats: Arc<MixStats>) -> Self {
        Self {
            readers,
            scratch: vec![0.0; max_block.max(1)].into_boxed_slice(),
            stats,
        }
    }

    pub fn stats(&self) -> &Arc<MixStats> {
        &self.stats
    }

    /// Fill `out` with the next mixed samples.
    ///
    /// Every channel gives up the same number of real samples, namely the
    /// smallest amount any channel has ready, so samples from different
    /// ticks are never summed together. The rest of `out` is silence.
    pub fn process(&mut self, out: &mut [f32]) {
        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| self.mix(out));

        #[cfg(not(feature = "alloc_check"))]
        self.mix(out);
    }

    fn mix(&mut self, out: &mut [f32]) {
        // One snapshot per request: samples landing mid-request wait for the next one
        let ready = self.ready().min(out.len());
        let (real, pad) = out.split_at_mut(ready);

        for chunk in real.chunks_mut(self.scratch.len()) {
            let n = chunk.len();
            chunk.fill(0.0);
            for reader in self.readers.iter_mut() {
                let got = reader.take_into(&mut self.scratch[..n]);
                debug_assert_eq!(got, n, "reader lost samples between ready() and take");
                accumulate(chunk, &self.scratch[..n]);
            }
            clamp_block(chunk);
        }
        pad.fill(0.0);

        self.stats.callbacks.fetch_add(1, Ordering::Relaxed);
        self.stats.consumed.fetch_add(ready as u64, Ordering::Relaxed);
        if !pad.is_empty() {
            self.stats.underruns.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn ready(&self) -> usize {
        self.readers
            .iter()
            .map(BufferReader::available)
            .min()
            .unwrap_or(0)
    }
}
