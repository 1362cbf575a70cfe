//! WAV encoding for 16-bit stereo PCM.

use hound::{SampleFormat, WavSpec, WavWriter};
use ms_engine::Frame;
use std::fs::File;
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::Path;

fn spec(sample_rate: u32) -> WavSpec {
    WavSpec { channels: 2, sample_rate, bits_per_sample: 16, sample_format: SampleFormat::Int }
}

pub fn write_wav<W: Write + Seek>(w: W, frames: &[Frame], sample_rate: u32) -> Result<(), hound::Error> {
    let mut writer = WavWriter::new(w, spec(sample_rate))?;
    for frame in frames {
        writer.write_sample(frame.left)?;
        writer.write_sample(frame.right)?;
    }
    writer.finalize()
}

pub fn write_wav_file(path: &Path, frames: &[Frame], sample_rate: u32) -> Result<(), hound::Error> {
    write_wav(BufWriter::new(File::create(path)?), frames, sample_rate)
}

/// Encode frames as an in-memory WAV file.
pub fn frames_to_wav(frames: &[Frame], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let mut buf = Cursor::new(Vec::new());
    write_wav(&mut buf, frames, sample_rate)?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_round_trips_through_hound() {
        let frames = [Frame::mono(100), Frame { left: -5, right: 7 }];
        let bytes = frames_to_wav(&frames, 22050).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");

        let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().sample_rate, 22050);
        assert_eq!(reader.spec().channels, 2);
        let samples: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
        assert_eq!(samples, vec![100, 100, -5, 7]);
    }

    #[test]
    fn file_output_matches_in_memory_encoding() {
        let frames = [Frame::mono(-300), Frame { left: 1, right: 2 }, Frame::silence()];
        let path = std::env::temp_dir().join(format!("ms-master-wav-{}.wav", std::process::id()));
        write_wav_file(&path, &frames, 8000).unwrap();

        let on_disk = std::fs::read(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(on_disk, frames_to_wav(&frames, 8000).unwrap());
    }
}
