//! Voice: plays one instruction buffer sample by sample.

use core::f32::consts::TAU;
use fastrand::Rng;
use ms_formats::{InstructionBuffer, InstructionRecord};
use ms_ir::Waveform;

/// Record amplitude that maps to full scale.
pub const FULL_SCALE: f32 = 1024.0;

/// Fixed pseudo-random bit pattern stepped through by the cycle waveforms.
const CYCLE_PATTERN: u64 = 0x9C3B_5A1E_D247_86F1;

/// A single voice rendering the records of one buffer in order.
#[derive(Clone, Debug)]
pub struct Voice {
    buffer: InstructionBuffer,
    /// Index of the record being played.
    record: usize,
    /// Samples played of the current record.
    elapsed: u32,
    /// Length of the current record in samples; 0 until entered.
    length: u32,
    /// Oscillator phase, 0.0..1.0.
    phase: f32,
    /// Held value for tunable noise.
    held: f32,
    finished: bool,
}

impl Voice {
    pub fn new(buffer: InstructionBuffer) -> Self {
        let finished = buffer.is_empty();
        Self { buffer, record: 0, elapsed: 0, length: 0, phase: 0.0, held: 0.0, finished }
    }

    /// Start playing `buffer`, returning the previous one.
    pub fn restart(&mut self, buffer: InstructionBuffer) -> InstructionBuffer {
        let old = core::mem::replace(self, Voice::new(buffer));
        old.buffer
    }

    pub fn into_buffer(self) -> InstructionBuffer {
        self.buffer
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The record currently playing, entering the next one as needed.
    fn current(&mut self, sample_rate: u32) -> Option<InstructionRecord> {
        loop {
            let record = *self.buffer.records().get(self.record)?;
            if self.length == 0 {
                self.length = (record.duration_ms as u64 * sample_rate as u64 / 1000).max(1) as u32;
            }
            if self.elapsed < self.length {
                return Some(record);
            }
            self.record += 1;
            self.elapsed = 0;
            self.length = 0;
        }
    }

    /// Render one mono sample.
    pub fn render(&mut self, sample_rate: u32, rng: &mut Rng) -> f32 {
        if self.finished {
            return 0.0;
        }
        let Some(record) = self.current(sample_rate) else {
            self.finished = true;
            return 0.0;
        };

        let t = self.elapsed as f32 / self.length as f32;
        let hz = lerp(record.start_hz as f32, record.end_hz as f32, t);
        let amp = lerp(record.start_amp as f32, record.end_amp as f32, t) / FULL_SCALE;

        self.phase += hz / sample_rate as f32;
        let wrapped = self.phase >= 1.0;
        self.phase -= libm::floorf(self.phase);
        self.elapsed += 1;

        let value = match Waveform::from_id(record.waveform) {
            Some(Waveform::Triangle) => 1.0 - 4.0 * libm::fabsf(self.phase - 0.5),
            Some(Waveform::Sawtooth) => 2.0 * self.phase - 1.0,
            Some(Waveform::Sine) => libm::sinf(TAU * self.phase),
            Some(Waveform::TunableNoise) => {
                if wrapped {
                    self.held = rng.f32() * 2.0 - 1.0;
                }
                self.held
            }
            Some(Waveform::Noise) => rng.f32() * 2.0 - 1.0,
            Some(
                w @ (Waveform::Square10
                | Waveform::Square20
                | Waveform::Square30
                | Waveform::Square40
                | Waveform::Square50),
            ) => {
                let duty = (w.id() - 10) as f32 / 10.0;
                if self.phase < duty { 1.0 } else { -1.0 }
            }
            Some(w @ (Waveform::Cycle16 | Waveform::Cycle32 | Waveform::Cycle64)) => {
                let steps = 1u32 << (w.id() - 12);
                let step = (self.phase * steps as f32) as u32;
                if CYCLE_PATTERN >> (step % 64) & 1 == 1 { 1.0 } else { -1.0 }
            }
            None => 0.0,
        };
        value * amp
    }
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}
