//! Built-in demo songs, written through the note-stream encoder.

use ms_engine::PlayerConfig;
use ms_formats::NoteStreamWriter;
use ms_ir::{Instrument, Song, VolumeOverride};

use crate::ControllerError;

/// Names accepted by [`demo_song`].
pub const DEMO_SONGS: &[&str] = &["scale", "groove", "chords"];

const MAJOR_SCALE: [u8; 8] = [60, 62, 64, 65, 67, 69, 71, 72];

pub fn demo_song(name: &str) -> Result<Song, ControllerError> {
    match name {
        "scale" => scale(),
        "groove" => groove(),
        "chords" => chords(),
        _ => Err(ControllerError::UnknownSong(name.to_string())),
    }
}

fn writer() -> NoteStreamWriter {
    NoteStreamWriter::new(PlayerConfig::default().chunk_ticks)
}

/// One octave of C major on the grand piano, 250 ms a note.
fn scale() -> Result<Song, ControllerError> {
    let mut w = writer();
    for (i, &pitch) in MAJOR_SCALE.iter().enumerate() {
        w.push_note(i as u32 * 25, 20, pitch, 0)?;
    }
    Ok(Song::new("C Major Scale", "midisong", 10, w.finish())
        .with_channel(Instrument::acoustic_grand_piano(), VolumeOverride::UseDefault))
}

/// Four bars of drums and saw bass at 120 bpm; spans several chunks.
fn groove() -> Result<Song, ControllerError> {
    const EIGHTH: u32 = 250;
    const BASS_LINE: [u8; 4] = [36, 36, 43, 41];

    let mut w = writer();
    for step in 0..32u32 {
        let tick = step * EIGHTH;
        if step % 4 == 0 {
            w.push_note(tick, 100, 36, 0)?;
        }
        w.push_note(tick, 50, 80, 1)?;
        if step % 2 == 0 {
            let pitch = BASS_LINE[(step / 8) as usize % BASS_LINE.len()];
            w.push_note(tick, 200, pitch, 2)?;
        }
    }
    Ok(Song::new("Groove", "midisong", 1, w.finish())
        .with_channel(Instrument::bass_drum(), VolumeOverride::UseDefault)
        .with_channel(Instrument::hi_hat(), VolumeOverride::Level(120))
        .with_channel(Instrument::saw_bass(), VolumeOverride::UseDefault))
}

/// I-vi-IV-V twice on the bright piano.
fn chords() -> Result<Song, ControllerError> {
    const PROGRESSION: [[u8; 3]; 4] = [[60, 64, 67], [57, 60, 64], [53, 57, 60], [55, 59, 62]];

    let mut w = writer();
    for (i, chord) in PROGRESSION.iter().cycle().take(8).enumerate() {
        for &pitch in chord {
            w.push_note(i as u32 * 100, 90, pitch, 0)?;
        }
    }
    Ok(Song::new("Chords", "midisong", 5, w.finish())
        .with_channel(Instrument::bright_acoustic_piano(), VolumeOverride::Level(160)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ms_formats::{decode_note, record_count};
    use ms_ir::NoteRecord;

    fn records(song: &Song) -> Vec<NoteRecord> {
        (0..record_count(&song.data)).map(|i| decode_note(&song.data, i).unwrap()).collect()
    }

    #[test]
    fn every_demo_builds() {
        for name in DEMO_SONGS {
            let song = demo_song(name).unwrap();
            assert!(song.record_count() > 0, "{}", name);
        }
    }

    #[test]
    fn unknown_name_is_an_error() {
        assert!(matches!(demo_song("nope"), Err(ControllerError::UnknownSong(n)) if n == "nope"));
    }

    #[test]
    fn groove_is_split_into_chunks() {
        let song = demo_song("groove").unwrap();
        let recs = records(&song);
        let boundaries = recs.iter().filter(|r| **r == NoteRecord::ChunkBoundary).count();
        // 8000 ticks of music at 2048 ticks per chunk
        assert_eq!(boundaries, 3);
        assert_eq!(recs.len() - boundaries, 8 + 32 + 16);
    }

    #[test]
    fn every_note_has_an_instrument() {
        for name in DEMO_SONGS {
            let song = demo_song(name).unwrap();
            for rec in records(&song) {
                if let NoteRecord::Note(note) = rec {
                    assert!(song.instrument(note.channel).is_some(), "{} channel {}", name, note.channel);
                }
            }
        }
    }
}
