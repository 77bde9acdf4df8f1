//! Note events.

use crate::channel::ChannelKind;

/// What a single channel does for the length of one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Voice {
    /// Channel is quiet
    Silent,
    /// Pitched tone at the given frequency in hertz
    Tone(u32),
    /// Unpitched noise
    Noise,
}

/// One time slot of the song, holding a value for every channel.
///
/// A frequency of 0 silences that channel for the slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteEvent {
    /// First pulse channel frequency (Hz)
    pub pulse1: u32,
    /// Second pulse channel frequency (Hz)
    pub pulse2: u32,
    /// Triangle channel frequency (Hz)
    pub triangle: u32,
    /// Noise channel on/off
    pub noise: bool,
    /// Length of the slot in ticks (always at least 1 in a valid song)
    pub duration: u16,
}

impl NoteEvent {
    /// Create a one-tick event.
    pub const fn new(pulse1: u32, pulse2: u32, triangle: u32, noise: bool) -> Self {
        Self {
            pulse1,
            pulse2,
            triangle,
            noise,
            duration: 1,
        }
    }

    /// A one-tick event with every channel silent.
    pub const fn rest() -> Self {
        Self::new(0, 0, 0, false)
    }

    /// Same event spanning `ticks` ticks.
    pub const fn with_duration(mut self, ticks: u16) -> Self {
        self.duration = ticks;
        self
    }

    /// Resolve what `channel` plays during this event.
    pub fn voice(&self, channel: ChannelKind) -> Voice {
        let tone = |freq: u32| if freq == 0 { Voice::Silent } else { Voice::Tone(freq) };
        match channel {
            ChannelKind::Pulse1 => tone(self.pulse1),
            ChannelKind::Pulse2 => tone(self.pulse2),
            ChannelKind::Triangle => tone(self.triangle),
            ChannelKind::Noise if self.noise => Voice::Noise,
            ChannelKind::Noise => Voice::Silent,
        }
    }
}

impl Default for NoteEvent {
    fn default() -> Self {
        Self::rest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_frequency_is_silent() {
        let event = NoteEvent::new(0, 220, 0, false);
        assert_eq!(event.voice(ChannelKind::Pulse1), Voice::Silent);
        assert_eq!(event.voice(ChannelKind::Pulse2), Voice::Tone(220));
        assert_eq!(event.voice(ChannelKind::Triangle), Voice::Silent);
    }

    #[test]
    fn noise_follows_flag() {
        assert_eq!(NoteEvent::new(0, 0, 0, true).voice(ChannelKind::Noise), Voice::Noise);
        assert_eq!(NoteEvent::rest().voice(ChannelKind::Noise), Voice::Silent);
    }

    #[test]
    fn default_duration_is_one_tick() {
        assert_eq!(NoteEvent::rest().duration, 1);
        assert_eq!(NoteEvent::rest().with_duration(3).duration, 3);
    }
}
