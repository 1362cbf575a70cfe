//! Software instruction player.
//!
//! The mixer stands in for a host sound engine: buffers are queued at a
//! future sample position and rendered by a fixed pool of voices.
//! [`Mixer::render_frame`] neither allocates nor frees; spent buffers are
//! released by [`Mixer::reap`].

use fastrand::Rng;
use heapless::Vec as VoiceVec;
use log::{trace, warn};
use ms_formats::InstructionBuffer;

use crate::event_queue::EventQueue;
use crate::frame::Frame;
use crate::host::AudioHost;
use crate::voice::Voice;

/// Maximum number of simultaneous voices.
pub const MAX_VOICES: usize = 64;

/// Headroom applied to the voice sum.
const MIX_GAIN: f32 = 0.25;

pub struct Mixer {
    sample_rate: u32,
    /// Frames rendered so far.
    clock: u64,
    queue: EventQueue,
    voices: VoiceVec<Voice, MAX_VOICES>,
    rng: Rng,
    /// Buffers dropped because every voice was busy.
    dropped: u32,
    dropped_reported: u32,
}

impl Mixer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            clock: 0,
            queue: EventQueue::new(),
            voices: VoiceVec::new(),
            rng: Rng::with_seed(0x5EED),
            dropped: 0,
            dropped_reported: 0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames rendered since creation.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Mixer time in ms.
    pub fn now_ms(&self) -> f64 {
        self.clock as f64 * 1000.0 / self.sample_rate as f64
    }

    /// Queue a buffer to start `delay_ms` from now; past offsets start
    /// on the next frame.
    pub fn schedule(&mut self, delay_ms: f32, buffer: InstructionBuffer) {
        let delay = (delay_ms.max(0.0) as f64 * self.sample_rate as f64 / 1000.0) as u64;
        self.queue.push(self.clock + delay, buffer);
    }

    /// Render one frame.
    pub fn render_frame(&mut self) -> Frame {
        while let Some(slot) = self.queue.next_due(self.clock) {
            let Some(buffer) = slot.take() else {
                continue;
            };
            if let Some(voice) = self.voices.iter_mut().find(|v| v.is_finished()) {
                *slot = Some(voice.restart(buffer));
            } else if let Err(voice) = self.voices.push(Voice::new(buffer)) {
                *slot = Some(voice.into_buffer());
                self.dropped += 1;
            }
        }

        let mut sum = 0.0;
        for voice in self.voices.iter_mut() {
            sum += voice.render(self.sample_rate, &mut self.rng);
        }
        self.clock += 1;
        Frame::from_f32(sum * MIX_GAIN)
    }

    /// Free spent buffers and finished voices. Call outside the render path.
    pub fn reap(&mut self) {
        self.queue.compact();
        self.voices.retain(|v| !v.is_finished());
        if self.dropped > self.dropped_reported {
            warn!(
                "voice pool full: dropped {} buffers ({} total)",
                self.dropped - self.dropped_reported,
                self.dropped
            );
            self.dropped_reported = self.dropped;
        }
    }

    /// Silence everything playing or queued.
    pub fn stop_all(&mut self) {
        self.queue.clear();
        self.voices.clear();
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| !v.is_finished()).count()
    }

    /// Buffers queued but not yet started.
    pub fn pending(&self) -> usize {
        self.queue.pending()
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Nothing playing and nothing queued.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.active_voices() == 0
    }
}

/// [`AudioHost`] backed by a [`Mixer`].
pub struct MixerHost<'a> {
    mixer: &'a mut Mixer,
    master_volume: u8,
}

impl<'a> MixerHost<'a> {
    pub fn new(mixer: &'a mut Mixer, master_volume: u8) -> Self {
        Self { mixer, master_volume }
    }
}

impl AudioHost for MixerHost<'_> {
    fn play_instructions(&mut self, start_ms: f32, buffer: InstructionBuffer) {
        if start_ms < 0.0 {
            trace!("buffer queued {:.1} ms late", -start_ms);
        }
        self.mixer.schedule(start_ms, buffer);
    }

    fn stop_all(&mut self) {
        self.mixer.stop_all();
    }

    fn master_volume(&self) -> u8 {
        self.master_volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ms_formats::InstructionRecord;

    fn beep(ms: u16) -> InstructionBuffer {
        let mut buf = InstructionBuffer::new();
        buf.push(InstructionRecord::new(15, 1000, ms, 1000, 1000, 1000));
        buf
    }

    #[test]
    fn silent_until_first_buffer_starts() {
        let mut mixer = Mixer::new(1000);
        mixer.schedule(5.0, beep(10));

        for _ in 0..5 {
            assert!(mixer.render_frame().is_silent());
        }
        let audible = (0..10).filter(|_| !mixer.render_frame().is_silent()).count();
        assert!(audible > 0);
        assert_eq!(mixer.active_voices(), 1);
    }

    #[test]
    fn finished_voices_are_reaped() {
        let mut mixer = Mixer::new(1000);
        mixer.schedule(0.0, beep(3));
        for _ in 0..10 {
            mixer.render_frame();
        }
        assert!(mixer.is_idle());
        mixer.reap();
        assert_eq!(mixer.voices.len(), 0);
    }

    #[test]
    fn finished_voice_slots_are_reused() {
        let mut mixer = Mixer::new(1000);
        mixer.schedule(0.0, beep(2));
        mixer.schedule(5.0, beep(2));
        for _ in 0..10 {
            mixer.render_frame();
        }
        assert_eq!(mixer.voices.len(), 1);
        assert_eq!(mixer.dropped(), 0);
    }

    #[test]
    fn overflow_buffers_are_dropped() {
        let mut mixer = Mixer::new(1000);
        for _ in 0..MAX_VOICES + 3 {
            mixer.schedule(0.0, beep(100));
        }
        mixer.render_frame();
        assert_eq!(mixer.active_voices(), MAX_VOICES);
        assert_eq!(mixer.dropped(), 3);
        mixer.reap();
        assert_eq!(mixer.pending(), 0);
    }

    #[test]
    fn stop_all_clears_queue_and_voices() {
        let mut mixer = Mixer::new(1000);
        mixer.schedule(0.0, beep(100));
        mixer.schedule(50.0, beep(100));
        mixer.render_frame();

        let mut host = MixerHost::new(&mut mixer, 200);
        assert_eq!(host.master_volume(), 200);
        host.stop_all();
        assert!(mixer.is_idle());
        assert!(mixer.render_frame().is_silent());
    }

    #[test]
    fn clock_tracks_rendered_frames() {
        let mut mixer = Mixer::new(44100);
        for _ in 0..441 {
            mixer.render_frame();
        }
        assert_eq!(mixer.clock(), 441);
        assert!((mixer.now_ms() - 10.0).abs() < 1e-9);
    }
}
