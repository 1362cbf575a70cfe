//! Playback errors.

use ms_formats::FormatError;
use ms_ir::RangeError;
use thiserror::Error;

/// Error type for scheduler operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaybackError {
    /// The note stream could not be decoded
    #[error(transparent)]
    Format(#[from] FormatError),

    /// A note referenced a pitch outside the frequency table
    #[error(transparent)]
    Range(#[from] RangeError),

    /// A chunk boundary was expected but the cached record is a note.
    #[error("chunk indicator expected at record {cursor}, found a note")]
    Desync { cursor: usize },

    /// A note was played on a channel with no instrument assigned
    #[error("channel {channel} has no instrument")]
    UnmappedChannel { channel: u8 },

    #[error("playback speed must be finite and positive, got {0}")]
    InvalidSpeed(f32),

    /// An operation that needs a song was called before `start`
    #[error("no song loaded")]
    NoSong,
}
