//! Note index to frequency lookup.
//!
//! Covers MIDI notes 0 (C-1, 8.18 Hz) through 108 (C8, 4186 Hz), the range
//! a song's 7-bit pitch field is allowed to reference.

use crate::error::RangeError;

/// Number of entries in the frequency table.
pub const NOTE_COUNT: usize = 109;

/// Fundamental frequency in Hz for each note index, 12-TET with A4 (69) = 440 Hz.
pub const NOTE_FREQUENCIES: [f32; NOTE_COUNT] = [
    8.1758, 8.66196, 9.17702, 9.72272, 10.3009, 10.9134,
    11.5623, 12.25, 12.9783, 13.75, 14.5676, 15.4339,
    16.3516, 17.3239, 18.354, 19.4454, 20.6017, 21.8268,
    23.1247, 24.4997, 25.9565, 27.5, 29.1352, 30.8677,
    32.7032, 34.6478, 36.7081, 38.8909, 41.2034, 43.6535,
    46.2493, 48.9994, 51.9131, 55.0, 58.2705, 61.7354,
    65.4064, 69.2957, 73.4162, 77.7817, 82.4069, 87.3071,
    92.4986, 97.9989, 103.826, 110.0, 116.541, 123.471,
    130.813, 138.591, 146.832, 155.563, 164.814, 174.614,
    184.997, 195.998, 207.652, 220.0, 233.082, 246.942,
    261.626, 277.183, 293.665, 311.127, 329.628, 349.228,
    369.994, 391.995, 415.305, 440.0, 466.164, 493.883,
    523.251, 554.365, 587.33, 622.254, 659.255, 698.456,
    739.989, 783.991, 830.609, 880.0, 932.328, 987.767,
    1046.5, 1108.73, 1174.66, 1244.51, 1318.51, 1396.91,
    1479.98, 1567.98, 1661.22, 1760.0, 1864.66, 1975.53,
    2093.0, 2217.46, 2349.32, 2489.02, 2637.02, 2793.83,
    2959.96, 3135.96, 3322.44, 3520.0, 3729.31, 3951.07,
    4186.01,
];

/// Look up the fundamental frequency of a note index.
///
/// Indices above 108 are encodable in the stream but have no pitch;
/// they are reported rather than clamped.
pub fn note_to_frequency(index: u8) -> Result<f32, RangeError> {
    NOTE_FREQUENCIES
        .get(index as usize)
        .copied()
        .ok_or(RangeError::PitchOutOfRange { index, max: (NOTE_COUNT - 1) as u8 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn a4_is_440() {
        assert_eq!(note_to_frequency(69).unwrap(), 440.0);
    }

    #[test]
    fn table_bounds() {
        assert_relative_eq!(note_to_frequency(0).unwrap(), 8.1758, epsilon = 1e-4);
        assert_relative_eq!(note_to_frequency(108).unwrap(), 4186.01, epsilon = 1e-2);
    }

    #[test]
    fn octave_doubles_frequency() {
        for i in 0..(NOTE_COUNT - 12) {
            let low = NOTE_FREQUENCIES[i];
            let high = NOTE_FREQUENCIES[i + 12];
            assert_relative_eq!(high / low, 2.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn table_is_strictly_increasing() {
        assert!(NOTE_FREQUENCIES.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn index_past_table_is_an_error() {
        assert_eq!(
            note_to_frequency(109),
            Err(RangeError::PitchOutOfRange { index: 109, max: 108 })
        );
        assert!(note_to_frequency(127).is_err());
    }
}
