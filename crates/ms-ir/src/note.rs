//! Decoded note-stream records.

/// One decoded entry of the note stream.
///
/// A record is either a chunk boundary (the chunk bit is set; any other
/// bits carry no audio meaning) or a playable note.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteRecord {
    /// Advances the scheduler to the next chunk.
    ChunkBoundary,
    /// A note to queue within the current chunk.
    Note(NoteEvent),
}

impl NoteRecord {
    /// True for chunk-boundary sentinels.
    pub fn is_boundary(&self) -> bool {
        matches!(self, NoteRecord::ChunkBoundary)
    }

    /// The note payload, if this is a playable note.
    pub fn note(&self) -> Option<&NoteEvent> {
        match self {
            NoteRecord::Note(note) => Some(note),
            NoteRecord::ChunkBoundary => None,
        }
    }
}

/// A playable note, in song ticks relative to its chunk's origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteEvent {
    /// Start offset from the chunk origin, in ticks (0-2047)
    pub relative_start: u16,
    /// Length in ticks (0-511)
    pub duration: u16,
    /// Note index into the frequency table (0-108 used, 0-127 encodable)
    pub pitch: u8,
    /// Channel (0-15), index into the song's instrument map
    pub channel: u8,
}

impl NoteEvent {
    pub const fn new(relative_start: u16, duration: u16, pitch: u8, channel: u8) -> Self {
        Self { relative_start, duration, pitch, channel }
    }
}
