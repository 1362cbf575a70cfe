//! Tone descriptions fed to the envelope compiler.

/// Waveform ids understood by the host sound engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Waveform {
    Triangle = 1,
    Sawtooth = 2,
    Sine = 3,
    TunableNoise = 4,
    Noise = 5,
    Square10 = 11,
    Square20 = 12,
    Square30 = 13,
    Square40 = 14,
    Square50 = 15,
    Cycle16 = 16,
    Cycle32 = 17,
    Cycle64 = 18,
}

impl Waveform {
    /// The id written into instruction records.
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Map a record id back to a waveform. Id 0 is the terminator.
    pub fn from_id(id: u8) -> Option<Self> {
        Some(match id {
            1 => Waveform::Triangle,
            2 => Waveform::Sawtooth,
            3 => Waveform::Sine,
            4 => Waveform::TunableNoise,
            5 => Waveform::Noise,
            11 => Waveform::Square10,
            12 => Waveform::Square20,
            13 => Waveform::Square30,
            14 => Waveform::Square40,
            15 => Waveform::Square50,
            16 => Waveform::Cycle16,
            17 => Waveform::Cycle32,
            18 => Waveform::Cycle64,
            _ => return None,
        })
    }
}

/// How long the tone's envelope runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ToneLength {
    /// Use the requested note duration.
    #[default]
    Note,
    /// Fixed tone length in ms, independent of the note duration.
    Fixed(u16),
}

/// Waveform and pitch glide of a single compiled tone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToneSpec {
    pub waveform: Waveform,
    /// Frequency at envelope start (Hz)
    pub start_hz: f32,
    /// Frequency at envelope end (Hz); equal to `start_hz` for no glide
    pub end_hz: f32,
    /// Explicit tone length, if any
    pub length: ToneLength,
}

impl ToneSpec {
    /// A steady tone with no glide.
    pub const fn steady(waveform: Waveform, hz: f32) -> Self {
        Self { waveform, start_hz: hz, end_hz: hz, length: ToneLength::Note }
    }

    /// Glide linearly from `start_hz` to `end_hz` across the envelope.
    pub const fn glide(waveform: Waveform, start_hz: f32, end_hz: f32) -> Self {
        Self { waveform, start_hz, end_hz, length: ToneLength::Note }
    }

    pub const fn with_length(mut self, length: ToneLength) -> Self {
        self.length = length;
        self
    }

    /// Explicit tone length in ms, if one was given and is positive.
    pub fn explicit_ms(&self) -> Option<f32> {
        match self.length {
            ToneLength::Fixed(ms) if ms > 0 => Some(ms as f32),
            _ => None,
        }
    }
}

/// Attack/decay/release timings (ms) and sustain level (0-255).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adsr {
    pub attack_ms: u16,
    pub decay_ms: u16,
    pub sustain: u8,
    pub release_ms: u16,
}

impl Adsr {
    pub const fn new(attack_ms: u16, decay_ms: u16, sustain: u8, release_ms: u16) -> Self {
        Self { attack_ms, decay_ms, sustain, release_ms }
    }
}

impl Default for Adsr {
    fn default() -> Self {
        Self { attack_ms: 0, decay_ms: 0, sustain: 255, release_ms: 0 }
    }
}

/// Envelope shaping flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Articulation {
    /// Release rings past the note end instead of being carved out of it.
    pub release_overlap: bool,
    /// Decay and release follow an exponential curve instead of a line.
    pub non_linear_falloff: bool,
}

impl Articulation {
    pub const fn new(release_overlap: bool, non_linear_falloff: bool) -> Self {
        Self { release_overlap, non_linear_falloff }
    }
}
