//! Playback engine for midisong.
//!
//! Compiles notes into instruction buffers, walks a song's note stream
//! chunk by chunk, and renders instruction buffers in software.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod bank;
pub mod compiler;
mod error;
mod event_queue;
mod frame;
mod host;
mod mixer;
pub mod scheduler;
mod voice;

pub use bank::{partial_buffer, partial_is_audible, play_note, OVERFLOW_STEPS};
pub use compiler::{compile_tone, play_tone, scale_volume, FalloffCurve};
pub use error::PlaybackError;
pub use event_queue::EventQueue;
pub use frame::Frame;
pub use host::{AudioHost, RecordingHost};
pub use mixer::{Mixer, MixerHost, MAX_VOICES};
pub use scheduler::{DesyncPolicy, PlaybackState, PlayerConfig, Session, SessionStats};
pub use voice::Voice;
