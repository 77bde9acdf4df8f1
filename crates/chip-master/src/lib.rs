//! Headless controller for the chiptune player.
//!
//! Owns a playback session: one producer thread per channel feeding a
//! bounded buffer, and a mixer running in the audio device's callback.
//! Both the CLI and the integration tests drive playback through
//! [`Controller`].

mod config;
mod error;
mod producer;
mod transport;
mod wav;

use chip_audio::{channel_buffer, MixStats, Mixer};
use chip_engine::position_at_sample;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use producer::ChannelProducer;
use transport::Transport;

// Re-export common types so callers don't need chip-ir/chip-audio directly.
pub use chip_audio::{AudioError, AudioOutput, CpalOutput, ManualHandle, ManualOutput};
pub use chip_formats::{load_file, FormatError};
pub use chip_ir::{ChannelKind, NoteEvent, PlaybackPosition, Song, SongError};

pub use config::{EndOfSong, PlaybackConfig};
pub use error::ControllerError;
pub use wav::{render_to_wav, samples_to_wav, to_pcm16, write_wav};

/// Lifecycle of the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Stopping,
}

/// Headless player: owns the output device and at most one session.
pub struct Controller {
    config: PlaybackConfig,
    output: Box<dyn AudioOutput>,
    state: PlaybackState,
    session: Option<Session>,
}

struct Session {
    song: Arc<Song>,
    transport: Arc<Transport>,
    stats: Arc<MixStats>,
    producers: Vec<JoinHandle<()>>,
    reported_underruns: u64,
    reported_failures: u64,
}

impl Controller {
    pub fn new() -> Self {
        Self::with_config(PlaybackConfig::default())
    }

    /// Controller on the default sound card.
    pub fn with_config(config: PlaybackConfig) -> Self {
        Self::with_output(config, Box::new(CpalOutput::new()))
    }

    pub fn with_output(config: PlaybackConfig, output: Box<dyn AudioOutput>) -> Self {
        Self {
            config,
            output,
            state: PlaybackState::Idle,
            session: None,
        }
    }

    // --- Session lifecycle ---

    /// Start playing `song` from its first event.
    ///
    /// Fails without side effects if a session is already running, if the
    /// song or config is invalid, or if the device cannot be opened.
    pub fn start(&mut self, song: Song) -> Result<(), ControllerError> {
        if self.state != PlaybackState::Idle {
            return Err(ControllerError::AlreadyPlaying);
        }
        song.validate()?;
        self.config.validate()?;

        let song = Arc::new(song);
        let transport = Arc::new(Transport::new());
        let stats = Arc::new(MixStats::new());

        let capacity = self.config.buffer_capacity();
        let mut writers = Vec::with_capacity(ChannelKind::ALL.len());
        let readers = std::array::from_fn(|_| {
            let (writer, reader) = channel_buffer(capacity);
            writers.push(writer);
            reader
        });
        let mut mixer = Mixer::new(readers, self.config.max_block_frames, stats.clone());

        self.output
            .open(self.config.sample_rate, 1, Box::new(move |out: &mut [f32]| mixer.process(out)))?;

        let mut producers = Vec::with_capacity(ChannelKind::ALL.len());
        for (channel, writer) in ChannelKind::ALL.into_iter().zip(writers) {
            let producer = ChannelProducer::new(channel, song.clone(), writer, transport.clone(), &self.config);
            let spawned = thread::Builder::new()
                .name(format!("chip-{}", channel))
                .spawn(move || producer.run());
            match spawned {
                Ok(handle) => producers.push(handle),
                Err(source) => {
                    transport.request_stop();
                    join_all(producers);
                    self.output.close();
                    return Err(ControllerError::Spawn { channel, source });
                }
            }
        }

        if let Err(e) = self.output.start() {
            transport.request_stop();
            join_all(producers);
            self.output.close();
            return Err(e.into());
        }

        log::info!(
            "Playing \"{}\" at {} BPM ({} events, {:.1} s per pass{})",
            song.name,
            song.tempo_bpm,
            song.notes.len(),
            song.total_seconds(),
            if self.config.looping() { ", looping" } else { "" }
        );

        self.session = Some(Session {
            song,
            transport,
            stats,
            producers,
            reported_underruns: 0,
            reported_failures: 0,
        });
        self.state = PlaybackState::Playing;
        Ok(())
    }

    /// Halt producers and the device. Does nothing when already idle.
    pub fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        self.state = PlaybackState::Stopping;

        session.transport.request_stop();
        if !session.transport.wait_all_finished(self.config.stop_timeout) {
            log::warn!(
                "producers did not stop within {:?}; detaching them",
                self.config.stop_timeout
            );
        }
        for handle in session.producers {
            if handle.is_finished() && handle.join().is_err() {
                log::error!("a producer thread panicked");
            }
        }

        if let Err(e) = self.output.stop() {
            log::warn!("failed to pause output: {}", e);
        }
        self.output.close();

        log::info!(
            "Stopped after {} samples ({} underruns)",
            session.stats.consumed_samples(),
            session.stats.underruns()
        );
        self.state = PlaybackState::Idle;
    }

    /// Report new diagnostics and end a finished non-looping session.
    ///
    /// Call periodically from the thread that owns the controller.
    pub fn update(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let underruns = session.stats.underruns();
        if underruns > session.reported_underruns {
            log::debug!("{} new buffer underruns", underruns - session.reported_underruns);
            session.reported_underruns = underruns;
        }
        let failures = session.transport.failures();
        if failures > session.reported_failures {
            log::warn!(
                "{} blocks replaced with silence after synthesis failures",
                failures - session.reported_failures
            );
            session.reported_failures = failures;
        }

        if self.config.end_of_song == EndOfSong::Stop && self.is_exhausted() && self.is_drained() {
            log::info!("End of song");
            self.stop();
        }
    }

    // --- Queries ---

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Song of the running session.
    pub fn song(&self) -> Option<&Song> {
        self.session.as_ref().map(|s| s.song.as_ref())
    }

    /// Every producer has rendered its last event (or stopped).
    pub fn is_exhausted(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.transport.all_finished())
    }

    /// Everything the producers appended has been played.
    fn is_drained(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.stats.consumed_samples() >= s.transport.appended_samples())
    }

    /// Event currently heard, derived from the samples the device has consumed.
    pub fn position(&self) -> Option<PlaybackPosition> {
        let session = self.session.as_ref()?;
        Some(position_at_sample(
            &session.song,
            self.config.sample_rate,
            session.stats.consumed_samples(),
            self.config.looping(),
        ))
    }

    /// Samples every channel has queued beyond what the device has played.
    pub fn buffered_samples(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| {
            s.transport
                .appended_samples()
                .saturating_sub(s.stats.consumed_samples())
        })
    }

    pub fn underruns(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| s.stats.underruns())
    }

    pub fn channel_failures(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| s.transport.failures())
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn join_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        let _ = handle.join();
    }
}
