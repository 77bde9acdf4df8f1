//! Core IR types for the chiptune player.
//!
//! A song is a tempo plus an ordered list of note events. Every event
//! carries one value for each of the four chip channels, so all channels
//! advance through the list together.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod channel;
mod note;
pub mod song;

pub use channel::{ChannelKind, CHANNEL_COUNT};
pub use note::{NoteEvent, Voice};
pub use song::{tick_seconds, PlaybackPosition, Song, SongError, MAX_NAME_LEN};
