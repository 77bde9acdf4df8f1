//! Song structure and tick timing.

use alloc::vec::Vec;
use arrayvec::ArrayString;
use thiserror::Error;

use crate::note::NoteEvent;

/// Longest song name kept; longer names are truncated.
pub const MAX_NAME_LEN: usize = 64;

/// Length of one tick in seconds at `tempo_bpm`.
///
/// One event tick is one beat of the song's tempo: 120 BPM gives 0.5 s.
pub fn tick_seconds(tempo_bpm: u16) -> f64 {
    60.0 / tempo_bpm as f64
}

/// Reasons a song cannot be played.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SongError {
    #[error("tempo must be greater than 0 BPM")]
    ZeroTempo,

    #[error("song has no note events")]
    Empty,

    #[error("note event {index} has zero duration")]
    ZeroDuration { index: usize },
}

/// Audible location inside a song.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaybackPosition {
    /// Index into [`Song::notes`]
    pub event_index: usize,
    /// Completed passes through the whole note list
    pub loop_count: u64,
}

/// A complete song.
#[derive(Clone, Debug, PartialEq)]
pub struct Song {
    /// Song name
    pub name: ArrayString<MAX_NAME_LEN>,
    /// Tempo in beats per minute
    pub tempo_bpm: u16,
    /// Events in playback order
    pub notes: Vec<NoteEvent>,
}

impl Song {
    /// Create a song, truncating `name` to [`MAX_NAME_LEN`] bytes on a char boundary.
    pub fn new(name: &str, tempo_bpm: u16, notes: Vec<NoteEvent>) -> Self {
        let mut title = ArrayString::new();
        for c in name.chars() {
            if title.try_push(c).is_err() {
                break;
            }
        }
        Self {
            name: title,
            tempo_bpm,
            notes,
        }
    }

    /// Check that the song can be played.
    pub fn validate(&self) -> Result<(), SongError> {
        if self.tempo_bpm == 0 {
            return Err(SongError::ZeroTempo);
        }
        if self.notes.is_empty() {
            return Err(SongError::Empty);
        }
        if let Some(index) = self.notes.iter().position(|n| n.duration == 0) {
            return Err(SongError::ZeroDuration { index });
        }
        Ok(())
    }

    /// Length of one tick in seconds.
    pub fn tick_seconds(&self) -> f64 {
        tick_seconds(self.tempo_bpm)
    }

    /// Length of `event` in seconds.
    pub fn event_seconds(&self, event: &NoteEvent) -> f64 {
        self.tick_seconds() * event.duration as f64
    }

    /// Total song length in ticks.
    pub fn total_ticks(&self) -> u64 {
        self.notes.iter().map(|n| n.duration as u64).sum()
    }

    /// Total song length in seconds (one pass).
    pub fn total_seconds(&self) -> f64 {
        self.total_ticks() as f64 * self.tick_seconds()
    }

    /// Map a step number to an index into `notes`.
    ///
    /// Steps count rendered events from the start of playback and never
    /// reset. Every channel goes through this mapping, so two channels at
    /// the same step always read the same event, including across loop
    /// boundaries. Returns `None` once a non-looping song is exhausted.
    pub fn event_at(&self, step: u64, looping: bool) -> Option<usize> {
        let len = self.notes.len() as u64;
        if len == 0 {
            return None;
        }
        if step < len {
            Some(step as usize)
        } else if looping {
            Some((step % len) as usize)
        } else {
            None
        }
    }
}

impl Default for Song {
    fn default() -> Self {
        Self::new("Untitled", 120, Vec::new())
    }
}
