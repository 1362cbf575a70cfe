//! Drives a session against a mixer on the mixer's own sample clock.

use log::error;
use ms_engine::{Frame, Mixer, MixerHost, PlaybackError, PlayerConfig, Session, SessionStats};
use ms_ir::Song;
use std::sync::Arc;

/// A session and the mixer it plays into.
///
/// Every `tick_frames` rendered frames the session is advanced and spent
/// mixer buffers are freed, so the scheduler runs at exactly its
/// configured cadence in rendered time.
pub struct Renderer {
    mixer: Mixer,
    session: Session,
    master_volume: u8,
    tick_frames: u64,
    until_tick: u64,
    /// Mixer time of the last start; the session clock counts from here.
    origin_ms: f64,
}

impl Renderer {
    pub fn new(config: PlayerConfig, sample_rate: u32, master_volume: u8) -> Self {
        let tick_frames = (config.tick_interval_ms() * sample_rate as f64 / 1000.0).max(1.0) as u64;
        Self {
            mixer: Mixer::new(sample_rate),
            session: Session::new(config),
            master_volume,
            tick_frames,
            until_tick: tick_frames,
            origin_ms: 0.0,
        }
    }

    pub fn start(&mut self, song: Arc<Song>, speed: Option<f32>) -> Result<(), PlaybackError> {
        self.origin_ms = self.mixer.now_ms();
        self.until_tick = self.tick_frames;
        let mut host = MixerHost::new(&mut self.mixer, self.master_volume);
        self.session.start(song, speed, 0.0, &mut host)
    }

    /// Session time: ms since the last start.
    fn session_ms(&self) -> f64 {
        self.mixer.now_ms() - self.origin_ms
    }

    /// Render the next frame, ticking the session when due.
    pub fn next_frame(&mut self) -> Frame {
        let frame = self.render();
        self.until_tick -= 1;
        if self.until_tick == 0 {
            self.until_tick = self.tick_frames;
            self.tick();
        }
        frame
    }

    #[cfg(not(feature = "alloc_check"))]
    fn render(&mut self) -> Frame {
        self.mixer.render_frame()
    }

    #[cfg(feature = "alloc_check")]
    fn render(&mut self) -> Frame {
        let mixer = &mut self.mixer;
        assert_no_alloc::assert_no_alloc(|| mixer.render_frame())
    }

    fn tick(&mut self) {
        let now = self.session_ms();
        let mut host = MixerHost::new(&mut self.mixer, self.master_volume);
        if let Err(err) = self.session.advance(now, &mut host) {
            error!("playback halted: {}", err);
        }
        self.mixer.reap();
    }

    pub fn stop(&mut self) {
        let mut host = MixerHost::new(&mut self.mixer, self.master_volume);
        self.session.stop(&mut host);
        self.mixer.reap();
    }

    /// The song has been fully queued and everything queued has played.
    pub fn is_finished(&self) -> bool {
        !self.session.is_playing() && self.mixer.is_idle()
    }

    pub fn stats(&self) -> SessionStats {
        self.session.stats()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    /// Render until finished or `max_frames` frames have been produced.
    pub fn render_frames(&mut self, max_frames: usize) -> Vec<Frame> {
        let mut frames = Vec::with_capacity(max_frames.min(1 << 22));
        while !self.is_finished() && frames.len() < max_frames {
            frames.push(self.next_frame());
        }
        frames
    }
}
