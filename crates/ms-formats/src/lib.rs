//! Wire formats for midisong.
//!
//! Two fixed-size record formats cross the crate boundary: the 4-byte
//! big-endian note-stream record a song is stored as, and the 12-byte
//! little-endian instruction record the host sound engine consumes.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod instruction;
mod note_stream;

pub use instruction::{InstructionBuffer, InstructionRecord, INSTRUCTION_SIZE};
pub use note_stream::{
    decode_note, decode_raw, encode_raw, record_count, NoteStreamWriter, RawRecord, RECORD_SIZE,
};

use alloc::string::String;
use thiserror::Error;

/// Error type for format decoding and encoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Record index past the end of the note stream
    #[error("record {index} out of bounds ({records} records in stream)")]
    RecordOutOfBounds { index: usize, records: usize },
    /// A field value does not fit its bit width
    #[error("{field} value {value} exceeds {max}")]
    FieldOverflow { field: &'static str, value: u32, max: u32 },
    /// A note was written into a chunk that is already closed
    #[error("note at tick {tick} precedes current chunk starting at tick {chunk_start}")]
    OutOfOrder { tick: u32, chunk_start: u32 },
    /// Byte length is not a whole number of records
    #[error("buffer of {len} bytes is not a whole number of records")]
    Truncated { len: usize },
    /// Low-level binary read/write failure
    #[error("binary codec error: {0}")]
    Binary(String),
}

impl From<binrw::Error> for FormatError {
    fn from(err: binrw::Error) -> Self {
        use alloc::string::ToString;
        FormatError::Binary(err.to_string())
    }
}
