//! Instrument bank: plays a note on an instrument patch.
//!
//! Formula and sine-stack instruments go through the envelope compiler;
//! wavetable instruments build one buffer per partial directly from the
//! patch's sampled tracks.

use log::debug;
use ms_formats::{InstructionBuffer, InstructionRecord};
use ms_ir::{Instrument, SineStack, ToneSpec, VolumeOverride, WavePartial, Waveform, WavetablePatch};

use crate::compiler::play_tone;
use crate::host::AudioHost;

/// Steps given to a partial to fade out once it passes the patch's
/// maximum wave time.
pub const OVERFLOW_STEPS: f32 = 16.0;

/// Play one note.
///
/// `start_ms` is relative to the host's current time; `volume` falls
/// back to the instrument's default level.
pub fn play_note(
    host: &mut dyn AudioHost,
    instrument: &Instrument,
    frequency: f32,
    start_ms: f32,
    duration_ms: f32,
    volume: VolumeOverride,
) {
    let level = volume.resolve(instrument.default_volume()) as f32;
    match instrument {
        Instrument::NoSound => {}
        Instrument::Formula { voices, .. } => {
            for voice in voices {
                let hz = voice.frequency(frequency);
                let tone = match voice.glide_to {
                    Some(end_hz) => ToneSpec::glide(voice.waveform, hz, end_hz),
                    None => ToneSpec::steady(voice.waveform, hz),
                }
                .with_length(voice.length);
                let duration = duration_ms + voice.duration_offset_ms as f32;
                play_tone(host, &tone, &voice.adsr, voice.articulation, start_ms, duration, level);
            }
        }
        Instrument::SineStack(stack) => play_sine_stack(host, stack, frequency, start_ms, duration_ms, level),
        Instrument::Wavetable(patch) => play_wavetable(host, patch, frequency, start_ms, level),
    }
}

fn play_sine_stack(
    host: &mut dyn AudioHost,
    stack: &SineStack,
    frequency: f32,
    start_ms: f32,
    duration_ms: f32,
    level: f32,
) {
    let duration = duration_ms + stack.duration_offset_ms as f32;
    for (ratio, amp) in stack.harmonics() {
        let tone = ToneSpec::steady(Waveform::Sine, frequency * ratio);
        play_tone(host, &tone, &SineStack::ADSR, stack.articulation, start_ms, duration, level * amp);
    }
}

/// Whether a partial is worth playing under the patch's culling limits.
pub fn partial_is_audible(patch: &WavetablePatch, partial: &WavePartial) -> bool {
    let Some(first) = partial.steps.first() else {
        return false;
    };
    partial.steps.len() >= patch.min_length
        && first.frequency <= patch.high_pass
        && first.amplitude >= patch.min_volume
}

fn play_wavetable(host: &mut dyn AudioHost, patch: &WavetablePatch, frequency: f32, start_ms: f32, level: f32) {
    let freq_mult = if patch.base_frequency > 0.0 { frequency / patch.base_frequency } else { 1.0 };
    let volume_scale = level / 255.0;

    let mut played = 0;
    for partial in &patch.partials {
        if !partial_is_audible(patch, partial) {
            continue;
        }
        played += 1;
        let buffer = partial_buffer(patch, partial, freq_mult, volume_scale);
        if !buffer.is_empty() {
            host.play_instructions(start_ms + partial.start * 1000.0, buffer);
        }
    }
    debug!("wavetable played {}/{} partials", played, patch.partials.len());
}

/// Build the sine sweep for one partial, pitched by `freq_mult`.
///
/// Each step of the partial's track becomes one record; past the patch's
/// maximum wave time the amplitude ramps to zero over [`OVERFLOW_STEPS`].
pub fn partial_buffer(
    patch: &WavetablePatch,
    partial: &WavePartial,
    freq_mult: f32,
    volume_scale: f32,
) -> InstructionBuffer {
    let span = partial.step_span();
    let steps = (span + 1).min(partial.steps.len());
    if steps < 2 {
        return InstructionBuffer::new();
    }
    let step_ms = ((span * 10) / (steps - 1)) as u16;
    let max_wave_steps = patch.max_wave_time_ms / 10.0;
    let level = |i: usize| {
        let amp = if patch.base_volume > 0.0 { 255.0 * partial.steps[i].amplitude / patch.base_volume } else { 0.0 };
        amp.min(255.0) * volume_scale
    };

    let mut buffer = InstructionBuffer::with_capacity(steps - 1);
    let mut i = 0;
    while i < steps - 1 && (i as f32) < max_wave_steps + OVERFLOW_STEPS + 1.0 {
        let overtime = 1.0 - (i as f32 - max_wave_steps).max(0.0) / OVERFLOW_STEPS;
        let (from, to) = (&partial.steps[i], &partial.steps[i + 1]);
        buffer.push(InstructionRecord::new(
            Waveform::Sine.id(),
            to_u16(from.frequency * freq_mult),
            step_ms,
            to_u16(level(i) * overtime),
            to_u16(level(i + 1) * overtime),
            to_u16(to.frequency * freq_mult),
        ));
        i += 1;
    }
    buffer
}

fn to_u16(value: f32) -> u16 {
    value.clamp(0.0, u16::MAX as f32) as u16
}
