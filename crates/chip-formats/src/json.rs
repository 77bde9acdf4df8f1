//! JSON note-event files.
//!
//! ```json
//! {
//!   "song_name": "pixel",
//!   "tempo": 150,
//!   "notes": [
//!     { "pulse1": 440, "pulse2": 0, "triangle": 110, "noise": 0 },
//!     { "pulse1": 0, "pulse2": 0, "triangle": 0, "noise": 1, "duration": 2 }
//!   ]
//! }
//! ```
//!
//! `noise` is a truthy flag: a boolean, or any number where non-zero means on.
//! Missing channel fields are silent and `duration` defaults to one tick.

use chip_ir::{NoteEvent, Song};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;

use crate::FormatError;

#[derive(Serialize, Deserialize)]
struct SongFile {
    song_name: String,
    tempo: u16,
    notes: Vec<NoteRecord>,
}

#[derive(Serialize, Deserialize)]
struct NoteRecord {
    #[serde(default)]
    pulse1: u32,
    #[serde(default)]
    pulse2: u32,
    #[serde(default)]
    triangle: u32,
    #[serde(default, deserialize_with = "truthy", serialize_with = "flag_as_number")]
    noise: bool,
    #[serde(default = "one_tick", skip_serializing_if = "is_one_tick")]
    duration: u16,
}

fn one_tick() -> u16 {
    1
}

fn is_one_tick(ticks: &u16) -> bool {
    *ticks == 1
}

fn truthy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(f64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(on) => on,
        Flag::Number(n) => n != 0.0,
    })
}

fn flag_as_number<S: serde::Serializer>(on: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*on))
}

impl From<NoteRecord> for NoteEvent {
    fn from(r: NoteRecord) -> Self {
        NoteEvent::new(r.pulse1, r.pulse2, r.triangle, r.noise).with_duration(r.duration)
    }
}

impl From<&NoteEvent> for NoteRecord {
    fn from(e: &NoteEvent) -> Self {
        Self {
            pulse1: e.pulse1,
            pulse2: e.pulse2,
            triangle: e.triangle,
            noise: e.noise,
            duration: e.duration,
        }
    }
}

/// Decode and validate a song from JSON bytes.
pub fn load_json(data: &[u8]) -> Result<Song, FormatError> {
    let file: SongFile = serde_json::from_slice(data)?;
    into_song(file)
}

/// Decode and validate a song from a JSON string.
pub fn load_json_str(text: &str) -> Result<Song, FormatError> {
    let file: SongFile = serde_json::from_str(text)?;
    into_song(file)
}

/// Read, decode and validate a song file.
pub fn load_file(path: impl AsRef<Path>) -> Result<Song, FormatError> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|source| FormatError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_json(&data)
}

/// Encode a song in the same JSON shape [`load_json`] reads.
pub fn to_json(song: &Song) -> Result<String, FormatError> {
    let file = SongFile {
        song_name: song.name.to_string(),
        tempo: song.tempo_bpm,
        notes: song.notes.iter().map(NoteRecord::from).collect(),
    };
    Ok(serde_json::to_string_pretty(&file)?)
}

fn into_song(file: SongFile) -> Result<Song, FormatError> {
    let notes = file.notes.into_iter().map(NoteEvent::from).collect();
    let song = Song::new(&file.song_name, file.tempo, notes);
    song.validate()?;
    Ok(song)
}
