//! Output frame type.

/// A stereo 16-bit PCM frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    pub left: i16,
    pub right: i16,
}

impl Frame {
    pub const fn silence() -> Self {
        Self { left: 0, right: 0 }
    }

    /// Same value on both channels.
    pub const fn mono(value: i16) -> Self {
        Self { left: value, right: value }
    }

    /// Quantize a mono sample in -1.0..=1.0, clipping anything outside.
    pub fn from_f32(sample: f32) -> Self {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        Self::mono(value)
    }

    /// Both channels as floats in -1.0..=1.0.
    pub fn to_f32(self) -> (f32, f32) {
        (self.left as f32 / 32768.0, self.right as f32 / 32768.0)
    }

    pub fn is_silent(self) -> bool {
        self.left == 0 && self.right == 0
    }
}
