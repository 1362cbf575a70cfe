//! Chunked playback scheduler.
//!
//! A song's note stream is walked one chunk at a time, a fixed distance
//! ahead of the clock. Each chunk starts with a boundary record; the notes
//! up to the next boundary are compiled and handed to the host with their
//! start offsets. The driver calls [`Session::advance`] every
//! [`PlayerConfig::tick_interval_ms`] and queues the next chunk once the
//! current one's end falls inside the lookahead window.
//!
//! All times are in ms on the driver's clock, measured from when the song
//! was started.

use alloc::sync::Arc;
use log::{debug, info, trace, warn};
use ms_formats::{decode_note, record_count};
use ms_ir::{note_to_frequency, NoteEvent, NoteRecord, Song};

use crate::bank::play_note;
use crate::error::PlaybackError;
use crate::host::AudioHost;

/// What to do when a note is found where a chunk boundary should be.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DesyncPolicy {
    /// Stop playback and report the error.
    #[default]
    Halt,
    /// Skip forward to the next boundary and keep playing.
    Resync,
}

/// Scheduler timing configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerConfig {
    /// How far ahead of the clock chunks are queued (ms).
    pub time_buffer_ms: f64,
    /// Ticks per chunk.
    pub chunk_ticks: u32,
    pub desync: DesyncPolicy,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self { time_buffer_ms: 2000.0, chunk_ticks: 2048, desync: DesyncPolicy::Halt }
    }
}

impl PlayerConfig {
    /// Cadence at which the driver should call [`Session::advance`].
    pub fn tick_interval_ms(&self) -> f64 {
        self.time_buffer_ms / 2.0
    }

    /// Wall-clock length of one chunk.
    pub fn time_per_chunk(&self, resolution: u16, speed: f32) -> f64 {
        self.chunk_ticks as f64 * resolution as f64 / speed as f64
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
}

/// Counters for one session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub chunks: u32,
    pub notes_queued: u32,
    /// Notes with a bad pitch or an unmapped channel.
    pub notes_skipped: u32,
    /// Notes passed over while resynchronizing.
    pub notes_resynced: u32,
}

/// Playback session for one song.
#[derive(Clone, Debug)]
pub struct Session {
    config: PlayerConfig,
    song: Option<Arc<Song>>,
    state: PlaybackState,
    speed: f32,
    /// Clock time of the current chunk's origin.
    chunk_time: f64,
    /// Record index of `next`.
    cursor: usize,
    /// Lookahead cache: the record at `cursor`, if in bounds.
    next: Option<NoteRecord>,
    last: Option<NoteRecord>,
    stats: SessionStats,
}

impl Session {
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            config,
            song: None,
            state: PlaybackState::Idle,
            speed: 1.0,
            chunk_time: 0.0,
            cursor: 0,
            next: None,
            last: None,
            stats: SessionStats::default(),
        }
    }

    /// Start playing `song`, queueing its first chunk immediately.
    ///
    /// `speed` of `None` keeps the speed of the previous start.
    pub fn start(
        &mut self,
        song: Arc<Song>,
        speed: Option<f32>,
        now_ms: f64,
        host: &mut dyn AudioHost,
    ) -> Result<(), PlaybackError> {
        if let Some(speed) = speed {
            if !speed.is_finite() || speed <= 0.0 {
                return Err(PlaybackError::InvalidSpeed(speed));
            }
            self.speed = speed;
        }

        info!(
            "starting \"{}\" by {} ({} records, {} ms/tick, speed {})",
            song.name,
            song.artist,
            song.record_count(),
            song.resolution,
            self.speed
        );
        self.song = Some(song);
        self.chunk_time = 0.0;
        self.cursor = 0;
        self.last = None;
        self.stats = SessionStats::default();
        self.next = self.fetch(0);

        self.queue_until_next_chunk(now_ms, host)?;
        self.state = PlaybackState::Playing;
        Ok(())
    }

    /// Periodic step: queue the next chunk once the current chunk ends
    /// within the lookahead window.
    ///
    /// Returns whether a chunk was processed.
    pub fn advance(&mut self, now_ms: f64, host: &mut dyn AudioHost) -> Result<bool, PlaybackError> {
        if self.state != PlaybackState::Playing {
            return Ok(false);
        }
        if self.next.is_none() {
            info!("song finished after {} chunks", self.stats.chunks);
            self.state = PlaybackState::Idle;
            return Ok(false);
        }
        if self.chunk_time + self.time_per_chunk() - now_ms >= self.config.time_buffer_ms {
            return Ok(false);
        }

        self.process_chunk_indicator()?;
        self.queue_until_next_chunk(now_ms, host)?;
        Ok(true)
    }

    /// Step over the chunk boundary at the cursor and move the chunk
    /// origin forward by one chunk.
    pub fn process_chunk_indicator(&mut self) -> Result<(), PlaybackError> {
        match self.next {
            Some(NoteRecord::ChunkBoundary) => {}
            Some(NoteRecord::Note(_)) => match self.config.desync {
                DesyncPolicy::Halt => {
                    warn!("chunk desync at record {}, halting", self.cursor);
                    self.state = PlaybackState::Idle;
                    return Err(PlaybackError::Desync { cursor: self.cursor });
                }
                DesyncPolicy::Resync => {
                    let from = self.cursor;
                    while let Some(NoteRecord::Note(_)) = self.next {
                        self.stats.notes_resynced += 1;
                        self.step();
                    }
                    warn!("chunk desync at record {}, resynced at {}", from, self.cursor);
                    if self.next.is_none() {
                        return Ok(());
                    }
                }
            },
            None => {
                self.state = PlaybackState::Idle;
                return Ok(());
            }
        }

        self.chunk_time += self.time_per_chunk();
        self.stats.chunks += 1;
        self.step();
        Ok(())
    }

    /// Queue every note up to the next chunk boundary or the end of the
    /// stream. Returns the number of notes handed to instruments.
    pub fn queue_until_next_chunk(&mut self, now_ms: f64, host: &mut dyn AudioHost) -> Result<u32, PlaybackError> {
        let song = self.song.clone().ok_or(PlaybackError::NoSong)?;

        let mut queued = 0;
        while let Some(NoteRecord::Note(note)) = self.next {
            match self.dispatch(&song, &note, now_ms, host) {
                Ok(()) => queued += 1,
                Err(err) => {
                    warn!("skipping note at record {}: {}", self.cursor, err);
                    self.stats.notes_skipped += 1;
                }
            }
            self.step();
        }

        self.stats.notes_queued += queued;
        debug!("queued {} notes (chunk {}, record {})", queued, self.stats.chunks, self.cursor);
        Ok(queued)
    }

    /// Stop playback and silence the host.
    pub fn stop(&mut self, host: &mut dyn AudioHost) {
        if self.state == PlaybackState::Playing {
            info!("stopping at record {}", self.cursor);
        }
        self.state = PlaybackState::Idle;
        host.stop_all();
    }

    fn dispatch(&self, song: &Song, note: &NoteEvent, now_ms: f64, host: &mut dyn AudioHost) -> Result<(), PlaybackError> {
        let frequency = note_to_frequency(note.pitch)?;
        let instrument = song
            .instrument(note.channel)
            .ok_or(PlaybackError::UnmappedChannel { channel: note.channel })?;

        let resolution = song.resolution as f64;
        let speed = self.speed as f64;
        let start_ms = note.relative_start as f64 * resolution / speed + self.chunk_time - now_ms;
        let duration_ms = note.duration as f64 * resolution / speed;

        trace!(
            "ch {} pitch {} at +{:.1} ms for {:.1} ms",
            note.channel,
            note.pitch,
            start_ms,
            duration_ms
        );
        play_note(host, instrument, frequency, start_ms as f32, duration_ms as f32, song.volume(note.channel));
        Ok(())
    }

    /// Move the cursor forward one record and refill the cache.
    fn step(&mut self) {
        self.cursor += 1;
        self.last = self.next.take();
        self.next = self.fetch(self.cursor);
    }

    fn fetch(&self, index: usize) -> Option<NoteRecord> {
        let song = self.song.as_ref()?;
        if index >= record_count(&song.data) {
            return None;
        }
        decode_note(&song.data, index).ok()
    }

    fn time_per_chunk(&self) -> f64 {
        let resolution = self.song.as_ref().map_or(0, |s| s.resolution);
        self.config.time_per_chunk(resolution, self.speed)
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn song(&self) -> Option<&Arc<Song>> {
        self.song.as_ref()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn chunk_time(&self) -> f64 {
        self.chunk_time
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The record most recently stepped over.
    pub fn last_record(&self) -> Option<NoteRecord> {
        self.last
    }

    /// The cached record at the cursor.
    pub fn next_record(&self) -> Option<NoteRecord> {
        self.next
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(PlayerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RecordingHost;
    use approx::assert_relative_eq;
    use ms_formats::{encode_raw, RawRecord};
    use ms_ir::{Instrument, VolumeOverride};

    fn stream(records: &[NoteRecord]) -> Vec<u8> {
        let mut data = Vec::new();
        for record in records {
            let raw = match record {
                NoteRecord::ChunkBoundary => RawRecord::boundary(),
                NoteRecord::Note(note) => RawRecord::from_note(note),
            };
            data.extend_from_slice(&encode_raw(&raw).unwrap());
        }
        data
    }

    fn note(start: u16, duration: u16, pitch: u8, channel: u8) -> NoteRecord {
        NoteRecord::Note(NoteEvent::new(start, duration, pitch, channel))
    }

    fn song(records: &[NoteRecord], instrument: Instrument) -> Arc<Song> {
        Arc::new(Song::new("test", "tester", 10, stream(records)).with_channel(instrument, VolumeOverride::UseDefault))
    }

    /// Single-voice sine instrument, one dispatch per note.
    fn beep() -> Instrument {
        Instrument::Formula {
            voices: vec![ms_ir::FormulaVoice::new(
                ms_ir::Waveform::Sine,
                ms_ir::VoicePitch::Ratio(1.0),
                ms_ir::Adsr::new(0, 0, 255, 0),
            )],
            default_volume: 100,
        }
    }

    fn wide_buffer() -> PlayerConfig {
        PlayerConfig { time_buffer_ms: 20_000.0, ..PlayerConfig::default() }
    }

    #[test]
    fn tick_interval_is_half_the_buffer() {
        let config = PlayerConfig::default();
        assert_eq!(config.tick_interval_ms(), 1000.0);
        assert_eq!(config.time_per_chunk(10, 1.0), 20_480.0);
        assert_eq!(config.time_per_chunk(10, 2.0), 10_240.0);
    }

    #[test]
    fn no_sound_chunk_advances_cursor_and_clock() {
        let song = song(&[NoteRecord::ChunkBoundary, note(5, 20, 60, 0), NoteRecord::ChunkBoundary], Instrument::NoSound);
        let mut host = RecordingHost::default();
        let mut session = Session::new(wide_buffer());

        session.start(song, None, 0.0, &mut host).unwrap();
        assert!(session.is_playing());
        assert_eq!(session.cursor(), 0);

        let tick = session.config().tick_interval_ms();
        assert!(session.advance(tick, &mut host).unwrap());

        assert!(host.dispatched.is_empty());
        assert_eq!(session.cursor(), 2);
        assert_relative_eq!(session.chunk_time(), 20_480.0);
        assert_eq!(session.stats().notes_queued, 1);
        assert_eq!(session.last_record(), Some(note(5, 20, 60, 0)));
        assert_eq!(session.next_record(), Some(NoteRecord::ChunkBoundary));
    }

    #[test]
    fn boundary_only_stream_queues_nothing() {
        let song = song(&[NoteRecord::ChunkBoundary; 3], beep());
        let mut host = RecordingHost::default();
        let mut session = Session::default();

        session.start(song, None, 0.0, &mut host).unwrap();
        assert_eq!(session.queue_until_next_chunk(0.0, &mut host).unwrap(), 0);
        assert!(host.dispatched.is_empty());
    }

    #[test]
    fn single_note_starts_at_offset() {
        let song = song(&[note(5, 20, 69, 0), NoteRecord::ChunkBoundary], beep());
        let mut host = RecordingHost::default();
        let mut session = Session::default();

        session.start(song, None, 30.0, &mut host).unwrap();

        assert_eq!(host.dispatched.len(), 1);
        let (start, buffer) = &host.dispatched[0];
        // 5 ticks * 10 ms + chunk 0 - now
        assert_relative_eq!(*start, 20.0);
        assert_eq!(buffer.total_duration_ms(), 200);
        assert_eq!(buffer.records()[0].start_hz, 440);
    }

    #[test]
    fn speed_scales_offsets_and_persists() {
        let records = [note(10, 20, 69, 0), NoteRecord::ChunkBoundary];
        let mut host = RecordingHost::default();
        let mut session = Session::default();

        session.start(song(&records, beep()), Some(2.0), 0.0, &mut host).unwrap();
        assert_relative_eq!(host.dispatched[0].0, 50.0);
        assert_eq!(host.dispatched[0].1.total_duration_ms(), 100);

        host.clear();
        session.start(song(&records, beep()), None, 0.0, &mut host).unwrap();
        assert_eq!(session.speed(), 2.0);
        assert_relative_eq!(host.dispatched[0].0, 50.0);
    }

    #[test]
    fn invalid_speed_is_rejected() {
        let mut host = RecordingHost::default();
        let mut session = Session::default();
        let song = song(&[NoteRecord::ChunkBoundary], beep());
        assert_eq!(session.start(song.clone(), Some(0.0), 0.0, &mut host), Err(PlaybackError::InvalidSpeed(0.0)));
        assert!(session.start(song, Some(f32::NAN), 0.0, &mut host).is_err());
        assert!(!session.is_playing());
    }

    #[test]
    fn advance_waits_for_lookahead_window() {
        let song = song(
            &[NoteRecord::ChunkBoundary, note(0, 1, 60, 0), NoteRecord::ChunkBoundary, note(0, 1, 62, 0)],
            beep(),
        );
        let mut host = RecordingHost::default();
        let mut session = Session::default();
        session.start(song, None, 0.0, &mut host).unwrap();

        // first chunk ends at 20480 ms; lookahead is 2000 ms
        assert!(!session.advance(1000.0, &mut host).unwrap());
        assert!(!session.advance(18_480.0, &mut host).unwrap());
        assert!(session.advance(18_481.0, &mut host).unwrap());
        assert_eq!(host.dispatched.len(), 1);
        assert_relative_eq!(host.dispatched[0].0, 20_480.0 - 18_481.0);
    }

    #[test]
    fn notes_from_later_chunks_are_offset_by_chunk_time() {
        let song = song(
            &[NoteRecord::ChunkBoundary, NoteRecord::ChunkBoundary, note(3, 1, 60, 0)],
            beep(),
        );
        let mut host = RecordingHost::default();
        let mut session = Session::new(PlayerConfig { chunk_ticks: 100, ..PlayerConfig::default() });
        session.start(song, None, 0.0, &mut host).unwrap();

        session.advance(0.0, &mut host).unwrap();
        session.advance(500.0, &mut host).unwrap();
        assert_eq!(host.dispatched.len(), 1);
        assert_relative_eq!(host.dispatched[0].0, 2000.0 + 30.0 - 500.0);
    }

    #[test]
    fn stream_end_finishes_session() {
        let song = song(&[note(0, 1, 60, 0)], beep());
        let mut host = RecordingHost::default();
        let mut session = Session::default();
        session.start(song, None, 0.0, &mut host).unwrap();

        assert!(session.next_record().is_none());
        assert!(!session.advance(1000.0, &mut host).unwrap());
        assert_eq!(session.state(), PlaybackState::Idle);
        assert_eq!(host.stop_calls, 0);
    }

    #[test]
    fn bad_pitch_and_unmapped_channel_are_skipped() {
        let song = song(&[note(0, 1, 120, 0), note(0, 1, 60, 5), note(0, 1, 60, 0)], beep());
        let mut host = RecordingHost::default();
        let mut session = Session::default();
        session.start(song, None, 0.0, &mut host).unwrap();

        assert_eq!(host.dispatched.len(), 1);
        assert_eq!(session.stats().notes_skipped, 2);
        assert_eq!(session.stats().notes_queued, 1);
        assert!(session.is_playing());
    }

    #[test]
    fn desync_halts_by_default() {
        let song = song(&[note(0, 1, 60, 0), NoteRecord::ChunkBoundary], beep());
        let mut session = Session::default();
        session.song = Some(song);
        session.state = PlaybackState::Playing;
        session.next = session.fetch(0);

        assert_eq!(session.process_chunk_indicator(), Err(PlaybackError::Desync { cursor: 0 }));
        assert!(!session.is_playing());
    }

    #[test]
    fn desync_can_resync_at_next_boundary() {
        let song = song(&[note(0, 1, 60, 0), note(1, 1, 60, 0), NoteRecord::ChunkBoundary, note(0, 1, 60, 0)], beep());
        let mut session = Session::new(PlayerConfig { desync: DesyncPolicy::Resync, ..PlayerConfig::default() });
        session.song = Some(song);
        session.state = PlaybackState::Playing;
        session.next = session.fetch(0);

        session.process_chunk_indicator().unwrap();
        assert_eq!(session.cursor(), 3);
        assert_eq!(session.stats().notes_resynced, 2);
        assert_relative_eq!(session.chunk_time(), 20_480.0);
        assert!(session.is_playing());
    }

    #[test]
    fn stop_silences_host() {
        let song = song(&[note(0, 1, 60, 0), NoteRecord::ChunkBoundary], beep());
        let mut host = RecordingHost::default();
        let mut session = Session::default();
        session.start(song, None, 0.0, &mut host).unwrap();

        session.stop(&mut host);
        assert!(!session.is_playing());
        assert_eq!(host.stop_calls, 1);
        assert!(!session.advance(100_000.0, &mut host).unwrap());
    }

    #[test]
    fn queue_without_song_is_an_error() {
        let mut host = RecordingHost::default();
        let mut session = Session::default();
        assert_eq!(session.queue_until_next_chunk(0.0, &mut host), Err(PlaybackError::NoSong));
    }
}
