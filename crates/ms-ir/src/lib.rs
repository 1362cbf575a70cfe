//! Core data types for midisong.
//!
//! This crate defines the values shared by the note-stream codec, the
//! envelope compiler and the chunked scheduler: songs, decoded note
//! records, tone descriptions and instrument patches.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod error;
mod instrument;
mod note;
mod pitch;
pub mod song;
mod tone;

pub use error::RangeError;
pub use instrument::{
    db_to_amp, FormulaVoice, Instrument, SineStack, VoicePitch, WavePartial, WaveStep, WavetablePatch,
};
pub use note::{NoteEvent, NoteRecord};
pub use pitch::{note_to_frequency, NOTE_COUNT, NOTE_FREQUENCIES};
pub use song::{Song, VolumeOverride, MAX_CHANNELS};
pub use tone::{Adsr, Articulation, ToneLength, ToneSpec, Waveform};
