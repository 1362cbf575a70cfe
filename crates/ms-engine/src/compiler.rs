//! Envelope compiler: turns one tone request into a terminated
//! instruction buffer.
//!
//! A tone is emitted as four envelope segments (attack, decay, sustain,
//! release). Each segment becomes one instruction record, except falloff
//! segments with `non_linear_falloff` set, which are split into 100 ms
//! steps following an exponential curve.

use log::{debug, trace};
use ms_formats::{InstructionBuffer, InstructionRecord};
use ms_ir::{Adsr, Articulation, ToneSpec};

use crate::host::AudioHost;

/// Length of one step of a non-linear segment.
pub const FALLOFF_STEP_MS: f32 = 100.0;

/// Default curve steepness for non-linear segments.
pub const FALLOFF_STEEPNESS: f32 = 8.0;

/// Scale a requested volume by the host's master volume.
pub fn scale_volume(volume: f32, master: u8) -> u8 {
    (((volume * master as f32) as i32) >> 8).clamp(0, 255) as u8
}

/// Exponential approximation between two levels.
///
/// `v(t) = (begin - q) * 0.5^(p * t / duration) + q`, with `q` chosen so
/// that `v(0) = begin` and `v(duration) = end`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FalloffCurve {
    begin: f32,
    q: f32,
    steepness: f32,
    duration: f32,
}

impl FalloffCurve {
    pub fn new(begin: f32, end: f32, duration: f32, steepness: f32) -> Self {
        let e = libm::powf(0.5, steepness);
        let q = if end > 0.0 {
            end * (1.0 - (begin / end) * e) / (1.0 - e)
        } else {
            -(begin * e) / (1.0 - e)
        };
        Self { begin, q, steepness, duration }
    }

    /// Level at `t` ms into the segment.
    pub fn at(&self, t: f32) -> f32 {
        if self.duration <= 0.0 {
            return self.begin;
        }
        (self.begin - self.q) * libm::powf(0.5, self.steepness * t / self.duration) + self.q
    }
}

/// Number of whole steps before the final remainder step.
///
/// At least one step's worth of time is always left for the remainder.
fn whole_steps(duration: f32) -> u32 {
    let steps = libm::floorf(duration / FALLOFF_STEP_MS) as u32;
    if duration % FALLOFF_STEP_MS == 0.0 {
        steps.saturating_sub(1)
    } else {
        steps
    }
}

/// Compile a tone into a buffer.
///
/// `duration_ms` is the note length; `volume` is already scaled by the
/// master volume (see [`scale_volume`]).
pub fn compile_tone(
    tone: &ToneSpec,
    adsr: &Adsr,
    articulation: Articulation,
    duration_ms: f32,
    volume: u8,
) -> InstructionBuffer {
    let curr_ms = tone.explicit_ms().unwrap_or(duration_ms);
    let release = adsr.release_ms as f32;
    let mut out = ToneBuilder {
        tone,
        volume,
        envelope_width: tone.explicit_ms().unwrap_or(duration_ms * 125.0 + release),
        buffer: InstructionBuffer::with_capacity(8),
    };

    let attack = adsr.attack_ms as f32;
    let decay = adsr.decay_ms as f32;
    let sustain = adsr.sustain as f32;
    let falloff = articulation.non_linear_falloff;

    out.linear(attack, 0.0, 255.0, 0.0);
    out.falloff(falloff, decay, 255.0, sustain, attack);

    if articulation.release_overlap {
        out.linear(curr_ms - (attack + decay), sustain, sustain, attack + decay);
        out.falloff(falloff, release, sustain, 0.0, curr_ms);
    } else {
        out.linear(curr_ms - (attack + decay + release), sustain, sustain, attack + decay);
        out.falloff(falloff, release, sustain, 0.0, curr_ms - release);
    }

    out.buffer
}

/// Compile a tone at the host's master volume and queue it.
pub fn play_tone(
    host: &mut dyn AudioHost,
    tone: &ToneSpec,
    adsr: &Adsr,
    articulation: Articulation,
    start_ms: f32,
    duration_ms: f32,
    volume: f32,
) {
    let volume = scale_volume(volume, host.master_volume());
    let buffer = compile_tone(tone, adsr, articulation, duration_ms, volume);
    if buffer.is_empty() {
        trace!("tone at {:.0} Hz compiled to nothing", tone.start_hz);
        return;
    }
    trace!(
        "tone {:?} {:.1} Hz, {} records at +{:.1} ms",
        tone.waveform,
        tone.start_hz,
        buffer.len(),
        start_ms
    );
    host.play_instructions(start_ms, buffer);
}

struct ToneBuilder<'a> {
    tone: &'a ToneSpec,
    volume: u8,
    envelope_width: f32,
    buffer: InstructionBuffer,
}

impl ToneBuilder<'_> {
    /// Frequencies at both ends of a span starting `offset` ms into the tone.
    fn glide(&self, offset: f32, duration: f32) -> (f32, f32) {
        let (start, end) = (self.tone.start_hz, self.tone.end_hz);
        if start == end || self.envelope_width == 0.0 {
            return (start, end);
        }
        let slope = (end - start) / self.envelope_width;
        (start + slope * offset, start + slope * (offset + duration))
    }

    fn amplitude(&self, level: f32) -> u16 {
        (((level * self.volume as f32) as i32) >> 6).clamp(0, u16::MAX as i32) as u16
    }

    /// Append one record; spans that round to zero ms are skipped.
    fn push(&mut self, duration: f32, begin: f32, end: f32, offset: f32) {
        let (start_hz, end_hz) = self.glide(offset, duration);
        let record = InstructionRecord::new(
            self.tone.waveform.id(),
            hz(start_hz),
            duration.min(u16::MAX as f32) as u16,
            self.amplitude(begin),
            self.amplitude(end),
            hz(end_hz),
        );
        self.buffer.push(record);
    }

    fn linear(&mut self, duration: f32, begin: f32, end: f32, offset: f32) {
        if duration < 0.0 {
            debug!("dropping envelope segment of {:.1} ms", duration);
            return;
        }
        self.push(duration, begin, end, offset);
    }

    fn falloff(&mut self, non_linear: bool, duration: f32, begin: f32, end: f32, offset: f32) {
        if !non_linear {
            self.linear(duration, begin, end, offset);
            return;
        }
        if duration <= 0.0 {
            return;
        }

        let curve = FalloffCurve::new(begin, end, duration, FALLOFF_STEEPNESS);
        let steps = whole_steps(duration);
        let mut level = begin;
        for step in 0..steps {
            let t = step as f32 * FALLOFF_STEP_MS;
            let next = curve.at(t + FALLOFF_STEP_MS);
            self.push(FALLOFF_STEP_MS, level, next, offset + t);
            level = next;
        }

        let done = steps as f32 * FALLOFF_STEP_MS;
        self.push(duration - done, level, end, offset + done);
    }
}

fn hz(value: f32) -> u16 {
    value.clamp(0.0, u16::MAX as f32) as u16
}
