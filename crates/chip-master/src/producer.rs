//! Channel producer threads.
//!
//! One producer per channel walks the song, renders each event's block for
//! its channel and appends it to the channel buffer, pacing itself so it
//! stays `lookahead` ahead of what the device is playing.

use chip_audio::BufferWriter;
use chip_engine::{block_len, render_event_into};
use chip_ir::{ChannelKind, NoteEvent, Song};
use rand::rngs::ThreadRng;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::PlaybackConfig;
use crate::transport::{FinishGuard, Transport};

/// How long a producer waits before retrying an append to a full buffer.
const THROTTLE_INTERVAL: Duration = Duration::from_millis(5);

/// Largest piece of an event synthesized at once.
const RENDER_CHUNK: usize = 8192;

type RenderFn = fn(&mut [f32], u64, ChannelKind, &NoteEvent, u32, &mut ThreadRng);

pub struct ChannelProducer {
    channel: ChannelKind,
    song: Arc<Song>,
    writer: BufferWriter,
    transport: Arc<Transport>,
    looping: bool,
    sample_rate: u32,
    lookahead: Duration,
    render: RenderFn,
}

/// Where the producer is in the song.
struct Cursor {
    /// Events fully appended
    step: u64,
    /// Samples appended so far
    emitted: u64,
}

impl ChannelProducer {
    pub fn new(
        channel: ChannelKind,
        song: Arc<Song>,
        writer: BufferWriter,
        transport: Arc<Transport>,
        config: &PlaybackConfig,
    ) -> Self {
        Self {
            channel,
            song,
            writer,
            transport,
            looping: config.looping(),
            sample_rate: config.sample_rate,
            lookahead: config.lookahead,
            render: render_event_into,
        }
    }

    #[cfg(test)]
    fn with_renderer(mut self, render: RenderFn) -> Self {
        self.render = render;
        self
    }

    /// Produce until the song runs out or a stop is requested.
    ///
    /// Events are synthesized in pieces of at most [`RENDER_CHUNK`] samples
    /// (and never more than the buffer holds), so memory stays bounded
    /// however long an event lasts.
    pub fn run(mut self) {
        let transport = self.transport.clone();
        let _finished = FinishGuard::new(&transport, self.channel);

        let mut rng = rand::thread_rng();
        let mut scratch = vec![0.0f32; RENDER_CHUNK.min(self.writer.capacity())];
        let start = Instant::now();
        let mut cursor = Cursor { step: 0, emitted: 0 };

        log::debug!("{} producer started", self.channel);

        'song: while !transport.is_stopped() {
            let Some(index) = self.song.event_at(cursor.step, self.looping) else {
                log::debug!("{} producer reached the end after {} events", self.channel, cursor.step);
                break;
            };

            let event = self.song.notes[index];
            let len = block_len(self.song.event_seconds(&event), self.sample_rate);
            let mut offset = 0;
            let mut failed = false;

            while offset < len {
                let piece = &mut scratch[..(len - offset).min(RENDER_CHUNK)];
                if failed {
                    piece.fill(0.0);
                } else if !self.synthesize(index, &event, offset as u64, piece, &mut rng) {
                    failed = true;
                }
                if !self.push(piece, &mut cursor) {
                    break 'song;
                }
                offset += piece.len();

                // Deadlines come from the sample count, not from summed sleeps, so pacing never drifts
                let due = start + Duration::from_secs_f64(cursor.emitted as f64 / self.sample_rate as f64);
                let wake = due.checked_sub(self.lookahead).unwrap_or(start);
                if !transport.sleep_until(wake) {
                    break 'song;
                }
            }

            cursor.step += 1;
            transport.advance(self.channel, cursor.step, cursor.emitted);
        }

        log::debug!("{} producer exiting at step {}", self.channel, cursor.step);
    }

    /// Render part of event `index` into `out`, writing silence if synthesis panics.
    ///
    /// Returns `false` after a panic.
    fn synthesize(
        &self,
        index: usize,
        event: &NoteEvent,
        start: u64,
        out: &mut [f32],
        rng: &mut ThreadRng,
    ) -> bool {
        let render = self.render;
        let rendered = panic::catch_unwind(AssertUnwindSafe(|| {
            render(out, start, self.channel, event, self.sample_rate, rng)
        }));

        if rendered.is_ok() {
            return true;
        }
        log::error!(
            "{} channel failed to render event {}; playing silence instead",
            self.channel,
            index
        );
        self.transport.record_failure();
        out.fill(0.0);
        false
    }

    /// Append the whole piece, waiting for space while the buffer is full.
    ///
    /// Progress is published after every partial append, so the samples
    /// counted as appended are always in the buffer. Returns `false` if a
    /// stop arrived before the piece fit.
    fn push(&mut self, piece: &[f32], cursor: &mut Cursor) -> bool {
        let mut written = 0;
        let mut throttled = false;
        loop {
            let n = self.writer.append(&piece[written..]);
            if n > 0 {
                written += n;
                cursor.emitted += n as u64;
                self.transport.advance(self.channel, cursor.step, cursor.emitted);
            }
            if written == piece.len() {
                return true;
            }
            if !throttled {
                log::debug!("{} buffer full, throttling producer", self.channel);
                throttled = true;
            }
            if !self.transport.sleep_for(THROTTLE_INTERVAL) {
                return false;
            }
        }
    }
}
