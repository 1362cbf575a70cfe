//! Packed note-stream records.
//!
//! Each record is two big-endian 16-bit words:
//!
//! ```text
//! word A: [chunk:1][relative start:11][channel:4]
//! word B: [duration:9][pitch:7]
//! ```
//!
//! A record with the chunk bit set is a chunk boundary; its other fields
//! carry no audio.

use alloc::vec::Vec;
use binrw::io::Cursor;
use binrw::{binrw, BinRead, BinWrite};
use ms_ir::{NoteEvent, NoteRecord};

use crate::FormatError;

/// Bytes per note-stream record.
pub const RECORD_SIZE: usize = 4;

#[binrw]
#[brw(big)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PackedWords {
    a: u16,
    b: u16,
}

/// The five packed fields of a record, exactly as stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub chunk: bool,
    pub relative_start: u16,
    pub duration: u16,
    pub pitch: u8,
    pub channel: u8,
}

impl RawRecord {
    pub const MAX_RELATIVE_START: u16 = 0x7FF;
    pub const MAX_DURATION: u16 = 0x1FF;
    pub const MAX_PITCH: u8 = 0x7F;
    pub const MAX_CHANNEL: u8 = 0xF;

    /// A bare chunk-boundary record.
    pub const fn boundary() -> Self {
        Self { chunk: true, relative_start: 0, duration: 0, pitch: 0, channel: 0 }
    }

    /// The record for a playable note.
    pub const fn from_note(note: &NoteEvent) -> Self {
        Self {
            chunk: false,
            relative_start: note.relative_start,
            duration: note.duration,
            pitch: note.pitch,
            channel: note.channel,
        }
    }

    /// Interpret the record for playback.
    pub fn to_record(self) -> NoteRecord {
        if self.chunk {
            NoteRecord::ChunkBoundary
        } else {
            NoteRecord::Note(NoteEvent::new(self.relative_start, self.duration, self.pitch, self.channel))
        }
    }

    fn from_words(words: PackedWords) -> Self {
        Self {
            chunk: words.a >> 15 == 1,
            relative_start: (words.a & 0x7FF0) >> 4,
            channel: (words.a & 0x000F) as u8,
            duration: (words.b & 0xFF80) >> 7,
            pitch: (words.b & 0x007F) as u8,
        }
    }

    fn to_words(self) -> Result<PackedWords, FormatError> {
        check("relative start", self.relative_start as u32, Self::MAX_RELATIVE_START as u32)?;
        check("duration", self.duration as u32, Self::MAX_DURATION as u32)?;
        check("pitch", self.pitch as u32, Self::MAX_PITCH as u32)?;
        check("channel", self.channel as u32, Self::MAX_CHANNEL as u32)?;

        Ok(PackedWords {
            a: (self.chunk as u16) << 15 | self.relative_start << 4 | self.channel as u16,
            b: self.duration << 7 | self.pitch as u16,
        })
    }
}

fn check(field: &'static str, value: u32, max: u32) -> Result<(), FormatError> {
    if value > max {
        return Err(FormatError::FieldOverflow { field, value, max });
    }
    Ok(())
}

/// Number of whole records in a note stream.
pub fn record_count(data: &[u8]) -> usize {
    data.len() / RECORD_SIZE
}

/// Decode the record at `index` into its raw fields.
pub fn decode_raw(data: &[u8], index: usize) -> Result<RawRecord, FormatError> {
    let records = record_count(data);
    if index >= records {
        return Err(FormatError::RecordOutOfBounds { index, records });
    }
    let offset = index * RECORD_SIZE;
    let words = PackedWords::read(&mut Cursor::new(&data[offset..offset + RECORD_SIZE]))?;
    Ok(RawRecord::from_words(words))
}

/// Decode the record at `index` for playback.
pub fn decode_note(data: &[u8], index: usize) -> Result<NoteRecord, FormatError> {
    decode_raw(data, index).map(RawRecord::to_record)
}

/// Pack a record into its 4-byte form.
pub fn encode_raw(record: &RawRecord) -> Result<[u8; RECORD_SIZE], FormatError> {
    let words = record.to_words()?;
    let mut out = [0u8; RECORD_SIZE];
    words.write(&mut Cursor::new(&mut out[..]))?;
    Ok(out)
}

/// Builds a note stream from notes at absolute ticks, inserting chunk
/// boundaries every `chunk_ticks` ticks.
///
/// Notes must arrive in chunk order; within a chunk any order is kept.
#[derive(Clone, Debug)]
pub struct NoteStreamWriter {
    bytes: Vec<u8>,
    chunk_ticks: u32,
    chunk: u32,
}

impl NoteStreamWriter {
    pub fn new(chunk_ticks: u32) -> Self {
        Self { bytes: Vec::new(), chunk_ticks: chunk_ticks.max(1), chunk: 0 }
    }

    /// Append a note starting at an absolute tick.
    pub fn push_note(
        &mut self,
        start_tick: u32,
        duration: u16,
        pitch: u8,
        channel: u8,
    ) -> Result<(), FormatError> {
        let target = start_tick / self.chunk_ticks;
        if target < self.chunk {
            return Err(FormatError::OutOfOrder {
                tick: start_tick,
                chunk_start: self.chunk * self.chunk_ticks,
            });
        }
        while self.chunk < target {
            self.push_boundary()?;
        }

        let relative = start_tick - self.chunk * self.chunk_ticks;
        check("relative start", relative, RawRecord::MAX_RELATIVE_START as u32)?;
        let note = NoteEvent::new(relative as u16, duration, pitch, channel);
        self.bytes.extend_from_slice(&encode_raw(&RawRecord::from_note(&note))?);
        Ok(())
    }

    /// Close the current chunk.
    pub fn push_boundary(&mut self) -> Result<(), FormatError> {
        self.bytes.extend_from_slice(&encode_raw(&RawRecord::boundary())?);
        self.chunk += 1;
        Ok(())
    }

    /// Number of records written so far.
    pub fn len(&self) -> usize {
        record_count(&self.bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}
