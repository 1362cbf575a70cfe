//! Lookup errors for IR tables.

use thiserror::Error;

/// A table index outside its defined range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RangeError {
    /// Note index outside the 0-108 frequency table.
    #[error("note index {index} outside frequency table (0..={max})")]
    PitchOutOfRange { index: u8, max: u8 },
}
