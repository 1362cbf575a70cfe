//! Boundary between the player and the sound engine that consumes
//! instruction buffers.

use alloc::vec::Vec;
use ms_formats::InstructionBuffer;

/// A sound engine that plays compiled instruction buffers.
///
/// Start offsets are relative to the host's current time: a buffer
/// queued with `start_ms = 250.0` begins a quarter second from now.
/// Offsets in the past mean "as soon as possible".
pub trait AudioHost {
    /// Queue a finished buffer for playback `start_ms` from now.
    fn play_instructions(&mut self, start_ms: f32, buffer: InstructionBuffer);

    /// Silence everything playing or queued.
    fn stop_all(&mut self);

    /// Ambient output volume, 0-255.
    fn master_volume(&self) -> u8;
}

/// Host that records every call instead of producing sound.
#[derive(Clone, Debug)]
pub struct RecordingHost {
    pub master_volume: u8,
    pub dispatched: Vec<(f32, InstructionBuffer)>,
    pub stop_calls: usize,
}

impl RecordingHost {
    pub fn new(master_volume: u8) -> Self {
        Self { master_volume, dispatched: Vec::new(), stop_calls: 0 }
    }

    pub fn clear(&mut self) {
        self.dispatched.clear();
        self.stop_calls = 0;
    }
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self::new(255)
    }
}

impl AudioHost for RecordingHost {
    fn play_instructions(&mut self, start_ms: f32, buffer: InstructionBuffer) {
        self.dispatched.push((start_ms, buffer));
    }

    fn stop_all(&mut self) {
        self.stop_calls += 1;
    }

    fn master_volume(&self) -> u8 {
        self.master_volume
    }
}
