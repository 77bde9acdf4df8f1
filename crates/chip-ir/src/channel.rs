//! The four chip channels.

use core::fmt;

/// Number of synthesis channels mixed into the output.
pub const CHANNEL_COUNT: usize = 4;

/// One of the chip's synthesis lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// First square-wave channel
    Pulse1,
    /// Second square-wave channel
    Pulse2,
    /// Triangle-wave channel
    Triangle,
    /// White-noise channel
    Noise,
}

impl ChannelKind {
    /// All channels in mixer order.
    pub const ALL: [ChannelKind; CHANNEL_COUNT] = [
        ChannelKind::Pulse1,
        ChannelKind::Pulse2,
        ChannelKind::Triangle,
        ChannelKind::Noise,
    ];

    /// Position of this channel in [`ChannelKind::ALL`].
    pub const fn index(self) -> usize {
        match self {
            ChannelKind::Pulse1 => 0,
            ChannelKind::Pulse2 => 1,
            ChannelKind::Triangle => 2,
            ChannelKind::Noise => 3,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ChannelKind::Pulse1 => "pulse1",
            ChannelKind::Pulse2 => "pulse2",
            ChannelKind::Triangle => "triangle",
            ChannelKind::Noise => "noise",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
