//! Song structure and per-channel assignments.

use alloc::sync::Arc;
use alloc::vec::Vec;
use arrayvec::ArrayString;

use crate::instrument::Instrument;

/// Channels addressable by the 4-bit channel field.
pub const MAX_CHANNELS: usize = 16;

/// Per-channel volume: an explicit level or the instrument's own default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VolumeOverride {
    #[default]
    UseDefault,
    /// Override amplitude, 0-255
    Level(u8),
}

impl VolumeOverride {
    /// Pick the override level, falling back to `default`.
    pub fn resolve(self, default: u8) -> u8 {
        match self {
            VolumeOverride::UseDefault => default,
            VolumeOverride::Level(level) => level,
        }
    }
}

impl From<Option<u8>> for VolumeOverride {
    fn from(level: Option<u8>) -> Self {
        level.map_or(VolumeOverride::UseDefault, VolumeOverride::Level)
    }
}

/// A complete song: a packed note stream plus channel assignments.
///
/// Immutable once built; the scheduler only reads it.
#[derive(Clone, Debug)]
pub struct Song {
    /// Song title
    pub name: ArrayString<32>,
    /// Artist credit
    pub artist: ArrayString<32>,
    /// Milliseconds per tick
    pub resolution: u16,
    /// Packed note stream, 4 bytes per record
    pub data: Arc<[u8]>,
    /// Instrument per channel (index = MIDI channel - 1)
    pub instruments: Vec<Instrument>,
    /// Volume override per channel, parallel to `instruments`
    pub volume_overrides: Vec<VolumeOverride>,
}

impl Song {
    /// Create a song with no channel assignments.
    pub fn new(name: &str, artist: &str, resolution: u16, data: impl Into<Arc<[u8]>>) -> Self {
        let mut song = Self {
            name: ArrayString::new(),
            artist: ArrayString::new(),
            resolution,
            data: data.into(),
            instruments: Vec::new(),
            volume_overrides: Vec::new(),
        };
        let _ = song.name.try_push_str(name);
        let _ = song.artist.try_push_str(artist);
        song
    }

    /// Append the next channel's instrument and volume override.
    pub fn with_channel(mut self, instrument: Instrument, volume: VolumeOverride) -> Self {
        self.instruments.push(instrument);
        self.volume_overrides.push(volume);
        self
    }

    /// Assign an instrument to a channel, filling skipped channels with silence.
    pub fn set_channel(&mut self, channel: u8, instrument: Instrument, volume: VolumeOverride) {
        let idx = channel as usize;
        if self.instruments.len() <= idx {
            self.instruments.resize(idx + 1, Instrument::NoSound);
        }
        if self.volume_overrides.len() <= idx {
            self.volume_overrides.resize(idx + 1, VolumeOverride::UseDefault);
        }
        self.instruments[idx] = instrument;
        self.volume_overrides[idx] = volume;
    }

    /// The instrument mapped to a channel, if any.
    pub fn instrument(&self, channel: u8) -> Option<&Instrument> {
        self.instruments.get(channel as usize)
    }

    /// The volume override for a channel; unmapped channels use the default.
    pub fn volume(&self, channel: u8) -> VolumeOverride {
        self.volume_overrides.get(channel as usize).copied().unwrap_or_default()
    }

    /// Number of whole 4-byte records in the note stream.
    pub fn record_count(&self) -> usize {
        self.data.len() / 4
    }
}
