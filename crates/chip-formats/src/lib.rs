//! Song file loading for the chiptune player.
//!
//! Decodes the JSON note-event files the player consumes into [`chip_ir::Song`].

mod json;

pub use json::{load_file, load_json, load_json_str, to_json};

use chip_ir::SongError;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for song file loading.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed song file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid song: {0}")]
    Invalid(#[from] SongError),
}
