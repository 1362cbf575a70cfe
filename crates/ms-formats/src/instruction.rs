//! Host instruction records.
//!
//! One record describes a single linear segment of sound: a waveform
//! playing from `start_hz`/`start_amp` to `end_hz`/`end_amp` over
//! `duration_ms`. Records are 12 bytes, little-endian. A buffer handed to
//! the host ends with a terminator record (waveform id 0), written as all
//! zeros.

use alloc::vec::Vec;
use binrw::io::Cursor;
use binrw::{binrw, BinRead, BinWrite};

use crate::FormatError;

/// Bytes per instruction record.
pub const INSTRUCTION_SIZE: usize = 12;

#[binrw]
#[brw(little)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InstructionRecord {
    pub waveform: u8,
    #[br(temp)]
    #[bw(calc = 0)]
    _reserved: u8,
    pub start_hz: u16,
    pub duration_ms: u16,
    pub start_amp: u16,
    pub end_amp: u16,
    pub end_hz: u16,
}

impl InstructionRecord {
    pub const fn new(
        waveform: u8,
        start_hz: u16,
        duration_ms: u16,
        start_amp: u16,
        end_amp: u16,
        end_hz: u16,
    ) -> Self {
        Self { waveform, start_hz, duration_ms, start_amp, end_amp, end_hz }
    }

    /// Waveform id 0 ends a buffer, whatever the other fields hold.
    pub fn is_terminator(&self) -> bool {
        self.waveform == 0
    }

    /// Pack into the 12-byte wire form.
    pub fn to_bytes(&self) -> Result<[u8; INSTRUCTION_SIZE], FormatError> {
        let mut out = [0u8; INSTRUCTION_SIZE];
        self.write(&mut Cursor::new(&mut out[..]))?;
        Ok(out)
    }
}

/// Instructions compiled for one tone, in play order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstructionBuffer {
    records: Vec<InstructionRecord>,
}

impl InstructionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { records: Vec::with_capacity(capacity) }
    }

    /// Append a record. Zero-length segments are dropped; returns whether
    /// the record was kept.
    pub fn push(&mut self, record: InstructionRecord) -> bool {
        if record.duration_ms == 0 {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Byte offset of the next record, i.e. where the terminator goes.
    pub fn pointer(&self) -> usize {
        self.records.len() * INSTRUCTION_SIZE
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[InstructionRecord] {
        &self.records
    }

    /// Sum of all segment durations.
    pub fn total_duration_ms(&self) -> u32 {
        self.records.iter().map(|r| r.duration_ms as u32).sum()
    }

    /// Serialize, always ending with a zero terminator record.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FormatError> {
        let mut out = Vec::with_capacity(self.pointer() + INSTRUCTION_SIZE);
        for record in &self.records {
            out.extend_from_slice(&record.to_bytes()?);
        }
        out.extend_from_slice(&[0u8; INSTRUCTION_SIZE]);
        Ok(out)
    }

    /// Parse a serialized buffer, stopping at the first terminator.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() % INSTRUCTION_SIZE != 0 {
            return Err(FormatError::Truncated { len: bytes.len() });
        }
        let mut records = Vec::with_capacity(bytes.len() / INSTRUCTION_SIZE);
        for chunk in bytes.chunks_exact(INSTRUCTION_SIZE) {
            let record = InstructionRecord::read(&mut Cursor::new(chunk))?;
            if record.is_terminator() {
                break;
            }
            records.push(record);
        }
        Ok(Self { records })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_layout_is_little_endian() {
        let rec = InstructionRecord::new(3, 0x01B8, 0x0102, 0x00FF, 0x0010, 0x0370);
        let bytes = rec.to_bytes().unwrap();
        assert_eq!(
            bytes,
            [3, 0, 0xB8, 0x01, 0x02, 0x01, 0xFF, 0x00, 0x10, 0x00, 0x70, 0x03]
        );
    }

    #[test]
    fn reserved_byte_is_ignored_on_read() {
        let bytes = [2u8, 0xEE, 10, 0, 20, 0, 30, 0, 40, 0, 50, 0];
        let buf = InstructionBuffer::from_bytes(&bytes).unwrap();
        assert_eq!(buf.records(), &[InstructionRecord::new(2, 10, 20, 30, 40, 50)]);
    }

    #[test]
    fn serialized_buffer_ends_with_terminator() {
        let mut buf = InstructionBuffer::new();
        assert!(buf.push(InstructionRecord::new(1, 440, 10, 0, 255, 440)));
        assert!(buf.push(InstructionRecord::new(1, 440, 20, 255, 0, 440)));
        assert_eq!(buf.pointer(), 24);

        let bytes = buf.to_bytes().unwrap();
        assert_eq!(bytes.len(), 36);
        assert!(bytes[24..].iter().all(|&b| b == 0));
        assert_eq!(InstructionBuffer::from_bytes(&bytes).unwrap(), buf);
    }

    #[test]
    fn empty_buffer_is_just_a_terminator() {
        let bytes = InstructionBuffer::new().to_bytes().unwrap();
        assert_eq!(bytes, [0u8; INSTRUCTION_SIZE]);
    }

    #[test]
    fn waveform_zero_ends_buffer_regardless_of_payload() {
        let mut bytes = InstructionRecord::new(3, 440, 10, 0, 255, 440).to_bytes().unwrap().to_vec();
        bytes.extend_from_slice(&[0, 0, 0xB8, 0x01, 10, 0, 20, 0, 30, 0, 40, 0]);
        bytes.extend_from_slice(&InstructionRecord::new(2, 220, 10, 0, 255, 220).to_bytes().unwrap());

        let buf = InstructionBuffer::from_bytes(&bytes).unwrap();
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.records()[0].waveform, 3);
        assert!(InstructionRecord::new(0, 440, 10, 1, 2, 440).is_terminator());
    }

    #[test]
    fn zero_length_segments_are_dropped() {
        let mut buf = InstructionBuffer::new();
        assert!(!buf.push(InstructionRecord::new(3, 440, 0, 0, 255, 440)));
        assert!(buf.is_empty());
        assert_eq!(buf.pointer(), 0);
    }

    #[test]
    fn total_duration_sums_segments() {
        let mut buf = InstructionBuffer::new();
        buf.push(InstructionRecord::new(3, 440, 15, 0, 255, 440));
        buf.push(InstructionRecord::new(3, 440, 40, 255, 0, 440));
        assert_eq!(buf.total_duration_ms(), 55);
    }

    #[test]
    fn partial_record_is_rejected() {
        assert_eq!(
            InstructionBuffer::from_bytes(&[0u8; 13]),
            Err(FormatError::Truncated { len: 13 })
        );
    }
}
