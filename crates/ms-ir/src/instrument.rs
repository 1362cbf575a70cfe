//! Instrument patches.
//!
//! An instrument is data: the engine's instrument bank turns a patch plus
//! a note (frequency, start, duration, volume) into compiled tones.

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use crate::tone::{Adsr, Articulation, ToneLength, Waveform};

/// Convert a decibel offset to a linear amplitude factor.
pub fn db_to_amp(db: f32) -> f32 {
    libm::powf(10.0, db / 20.0)
}

/// A channel's instrument.
#[derive(Clone, Debug, PartialEq)]
pub enum Instrument {
    /// Plays nothing; used to mute a channel.
    NoSound,
    /// One compiled tone per voice, each at a fixed ratio or pitch.
    Formula { voices: Vec<FormulaVoice>, default_volume: u8 },
    /// Stacked sine harmonics from a ratio/dB table.
    SineStack(SineStack),
    /// Additive synthesis from per-partial frequency/amplitude tracks.
    Wavetable(Arc<WavetablePatch>),
}

impl Instrument {
    /// Volume used when the channel has no override.
    pub fn default_volume(&self) -> u8 {
        match self {
            Instrument::NoSound => 0,
            Instrument::Formula { default_volume, .. } => *default_volume,
            Instrument::SineStack(stack) => stack.default_volume,
            Instrument::Wavetable(patch) => patch.default_volume,
        }
    }

    /// Two sawtooth voices, the second an octave down.
    pub fn saw_bass() -> Self {
        let adsr = Adsr::new(10, 1, 255, 40);
        Instrument::Formula {
            voices: vec![
                FormulaVoice::new(Waveform::Sawtooth, VoicePitch::Ratio(1.0), adsr),
                FormulaVoice::new(Waveform::Sawtooth, VoicePitch::Ratio(0.5), adsr),
            ],
            default_volume: 80,
        }
    }

    /// Square-wave kick sweeping 200 Hz down to 1 Hz over 90 ms.
    pub fn bass_drum() -> Self {
        let mut voice = FormulaVoice::new(Waveform::Square50, VoicePitch::Fixed(200.0), Adsr::new(1, 1, 90, 1));
        voice.glide_to = Some(1.0);
        voice.length = ToneLength::Fixed(90);
        voice.duration_offset_ms = -25;
        Instrument::Formula { voices: vec![voice], default_volume: 100 }
    }

    /// Short noise burst.
    pub fn hi_hat() -> Self {
        Instrument::Formula {
            voices: vec![FormulaVoice::new(Waveform::Noise, VoicePitch::Fixed(37.0), Adsr::new(0, 50, 0, 0))],
            default_volume: 100,
        }
    }

    /// Four-harmonic sine piano; release overlaps the next note.
    pub fn acoustic_grand_piano() -> Self {
        Instrument::SineStack(SineStack {
            partials: vec![(1.0, 0.0), (2.0, 0.0), (3.0, -1.01), (4.0, -1.01)],
            base_index: 0,
            loudest_index: 0,
            articulation: Articulation::new(true, false),
            duration_offset_ms: 0,
            default_volume: 100,
        })
    }

    /// Six-harmonic sine piano, shortened slightly and non-overlapping.
    pub fn bright_acoustic_piano() -> Self {
        Instrument::SineStack(SineStack {
            partials: vec![
                (1.0, 0.0),
                (2.0, 0.0),
                (3.0, -1.01),
                (4.0, -1.01),
                (5.0, -1.89),
                (6.0, -1.89),
            ],
            base_index: 0,
            loudest_index: 0,
            articulation: Articulation::new(false, false),
            duration_offset_ms: -6,
            default_volume: 80,
        })
    }
}

/// Pitch source for a formula voice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VoicePitch {
    /// Multiple of the note's frequency
    Ratio(f32),
    /// Fixed frequency in Hz regardless of the note (percussion)
    Fixed(f32),
}

/// One tone of a formula instrument.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FormulaVoice {
    pub waveform: Waveform,
    pub pitch: VoicePitch,
    /// Glide target in Hz
    pub glide_to: Option<f32>,
    pub length: ToneLength,
    pub adsr: Adsr,
    pub articulation: Articulation,
    /// Added to the note duration before compiling
    pub duration_offset_ms: i16,
}

impl FormulaVoice {
    pub const fn new(waveform: Waveform, pitch: VoicePitch, adsr: Adsr) -> Self {
        Self {
            waveform,
            pitch,
            glide_to: None,
            length: ToneLength::Note,
            adsr,
            articulation: Articulation::new(false, false),
            duration_offset_ms: 0,
        }
    }

    /// Frequency this voice sounds for a note at `note_hz`.
    pub fn frequency(&self, note_hz: f32) -> f32 {
        match self.pitch {
            VoicePitch::Ratio(ratio) => note_hz * ratio,
            VoicePitch::Fixed(hz) => hz,
        }
    }
}

/// Harmonic table instrument: each `(ratio, dB)` pair is one sine voice.
#[derive(Clone, Debug, PartialEq)]
pub struct SineStack {
    pub partials: Vec<(f32, f32)>,
    /// Partial whose ratio corresponds to the played note
    pub base_index: usize,
    /// Partial whose level maps to full volume
    pub loudest_index: usize,
    pub articulation: Articulation,
    pub duration_offset_ms: i16,
    pub default_volume: u8,
}

impl SineStack {
    /// Envelope used for every harmonic.
    pub const ADSR: Adsr = Adsr::new(1, 1, 255, 1);

    /// Frequency ratio and amplitude factor of each harmonic.
    pub fn harmonics(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        let base_ratio = self.partials.get(self.base_index).map_or(1.0, |p| p.0);
        let loudest_db = self.partials.get(self.loudest_index).map_or(0.0, |p| p.1);
        self.partials
            .iter()
            .map(move |&(ratio, db)| (ratio / base_ratio, db_to_amp(db - loudest_db)))
    }
}

/// One frequency/amplitude sample of a partial's track.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaveStep {
    pub frequency: f32,
    pub amplitude: f32,
}

/// One partial of an additive patch, sampled every 10 ms.
#[derive(Clone, Debug, PartialEq)]
pub struct WavePartial {
    /// Start time within the sampled note, in seconds
    pub start: f32,
    /// End time within the sampled note, in seconds
    pub end: f32,
    pub steps: Vec<WaveStep>,
}

impl WavePartial {
    /// Number of 10 ms steps between start and end.
    pub fn step_span(&self) -> usize {
        libm::roundf((self.end - self.start) * 100.0).max(0.0) as usize
    }
}

/// Additive-synthesis patch, usually produced from a spectral analysis.
#[derive(Clone, Debug, PartialEq)]
pub struct WavetablePatch {
    pub partials: Vec<WavePartial>,
    /// Pitch of the analysed recording (Hz)
    pub base_frequency: f32,
    /// Amplitude of the loudest partial, mapped to 255
    pub base_volume: f32,
    /// Partials starting above this frequency are skipped
    pub high_pass: f32,
    /// Partials with fewer steps than this are skipped
    pub min_length: usize,
    /// Partials starting quieter than this are skipped
    pub min_volume: f32,
    pub default_volume: u8,
    /// Partials are faded out after this long (ms)
    pub max_wave_time_ms: f32,
}
