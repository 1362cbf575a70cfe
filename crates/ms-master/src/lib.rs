//! Headless controller for midisong.
//!
//! Owns the player configuration and manages realtime playback on a
//! dedicated audio thread, plus offline rendering to frames or WAV.
//! Both the CLI and the integration tests drive songs through here.

mod demo;
mod render;
mod wav;

use log::{error, info, warn};
use ms_audio::{AudioError, AudioOutput, CpalOutput};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;

// Re-export common types so callers don't need ms-ir/ms-engine directly.
pub use ms_engine::{DesyncPolicy, Frame, PlaybackError, PlayerConfig, SessionStats};
pub use ms_formats::FormatError;
pub use ms_ir::{Instrument, Song, VolumeOverride};

pub use demo::{demo_song, DEMO_SONGS};
pub use render::Renderer;
pub use wav::{frames_to_wav, write_wav, write_wav_file};

/// Controller configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControllerConfig {
    pub player: PlayerConfig,
    /// Sample rate for offline rendering; realtime uses the device rate.
    pub sample_rate: u32,
    pub master_volume: u8,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self { player: PlayerConfig::default(), sample_rate: 44100, master_volume: 255 }
    }
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("audio output: {0}")]
    Audio(#[from] AudioError),
    #[error("wav: {0}")]
    Wav(#[from] hound::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("unknown song \"{0}\"")]
    UnknownSong(String),
    #[error("playback thread exited before starting")]
    ThreadGone,
}

/// Counters published by the audio thread.
#[derive(Default)]
struct Progress {
    chunks: AtomicU32,
    notes_queued: AtomicU32,
    notes_skipped: AtomicU32,
    notes_resynced: AtomicU32,
}

impl Progress {
    fn publish(&self, stats: SessionStats) {
        self.chunks.store(stats.chunks, Ordering::Relaxed);
        self.notes_queued.store(stats.notes_queued, Ordering::Relaxed);
        self.notes_skipped.store(stats.notes_skipped, Ordering::Relaxed);
        self.notes_resynced.store(stats.notes_resynced, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SessionStats {
        SessionStats {
            chunks: self.chunks.load(Ordering::Relaxed),
            notes_queued: self.notes_queued.load(Ordering::Relaxed),
            notes_skipped: self.notes_skipped.load(Ordering::Relaxed),
            notes_resynced: self.notes_resynced.load(Ordering::Relaxed),
        }
    }
}

/// Headless player: one song at a time on the default output device.
pub struct Controller {
    config: ControllerConfig,
    /// Speed of the last start, reused when a start gives none.
    speed: f32,
    playback: Option<PlaybackHandle>,
}

struct PlaybackHandle {
    stop_signal: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    progress: Arc<Progress>,
    thread: Option<JoinHandle<()>>,
}

impl Controller {
    pub fn new(config: ControllerConfig) -> Self {
        Self { config, speed: 1.0, playback: None }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    fn resolve_speed(&mut self, speed: Option<f32>) -> Result<f32, ControllerError> {
        if let Some(speed) = speed {
            if !speed.is_finite() || speed <= 0.0 {
                return Err(PlaybackError::InvalidSpeed(speed).into());
            }
            self.speed = speed;
        }
        Ok(self.speed)
    }

    // --- Real-time playback ---

    /// Start playing `song`, replacing whatever is playing.
    ///
    /// Returns once the first chunk has been queued on the audio thread.
    pub fn play(&mut self, song: Arc<Song>, speed: Option<f32>) -> Result<(), ControllerError> {
        self.stop();
        let speed = self.resolve_speed(speed)?;

        let stop_signal = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let progress = Arc::new(Progress::default());
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let stop = stop_signal.clone();
        let done = finished.clone();
        let counters = progress.clone();
        let config = self.config;

        let thread = std::thread::spawn(move || {
            audio_thread(config, song, speed, stop, done, counters, ready_tx);
        });

        let started = ready_rx.recv().unwrap_or(Err(ControllerError::ThreadGone));
        self.playback = Some(PlaybackHandle { stop_signal, finished, progress, thread: Some(thread) });
        if started.is_err() {
            self.stop();
        }
        started
    }

    /// Stop playback, silencing everything queued.
    pub fn stop(&mut self) {
        if let Some(mut pb) = self.playback.take() {
            pb.stop_signal.store(true, Ordering::Relaxed);
            if let Some(handle) = pb.thread.take() {
                if handle.join().is_err() {
                    error!("audio thread panicked");
                }
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback.as_ref().is_some_and(|p| !p.finished.load(Ordering::Relaxed))
    }

    pub fn is_finished(&self) -> bool {
        self.playback.as_ref().is_some_and(|p| p.finished.load(Ordering::Relaxed))
    }

    /// Counters of the current or last realtime session.
    pub fn stats(&self) -> Option<SessionStats> {
        self.playback.as_ref().map(|p| p.progress.snapshot())
    }

    // --- Offline rendering ---

    /// Render `song` offline until it finishes or `max_frames` are produced.
    pub fn render_frames(
        &mut self,
        song: Arc<Song>,
        speed: Option<f32>,
        max_frames: usize,
    ) -> Result<Vec<Frame>, ControllerError> {
        let speed = self.resolve_speed(speed)?;
        let mut renderer = Renderer::new(self.config.player, self.config.sample_rate, self.config.master_volume);
        renderer.start(song, Some(speed))?;
        let frames = renderer.render_frames(max_frames);
        if !renderer.is_finished() {
            warn!("render stopped at {} frames before the song ended", frames.len());
        }
        Ok(frames)
    }

    /// Render `song` into a WAV file at `path`, at most `max_seconds` long.
    pub fn render_to_wav(
        &mut self,
        song: Arc<Song>,
        speed: Option<f32>,
        path: &Path,
        max_seconds: u32,
    ) -> Result<usize, ControllerError> {
        let sample_rate = self.config.sample_rate;
        let max_frames = sample_rate as usize * max_seconds as usize;
        let frames = self.render_frames(song, speed, max_frames)?;
        write_wav_file(path, &frames, sample_rate)?;
        info!("wrote {} frames to {}", frames.len(), path.display());
        Ok(frames.len())
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(ControllerConfig::default())
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn audio_thread(
    config: ControllerConfig,
    song: Arc<Song>,
    speed: f32,
    stop_signal: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    progress: Arc<Progress>,
    ready: mpsc::SyncSender<Result<(), ControllerError>>,
) {
    let started = CpalOutput::new().map_err(ControllerError::from).and_then(|(mut output, consumer)| -> Result<_, ControllerError> {
        output.build_stream(consumer)?;
        output.start()?;
        let mut renderer = Renderer::new(config.player, output.sample_rate(), config.master_volume);
        renderer.start(song, Some(speed))?;
        Ok((output, renderer))
    });
    let (mut output, mut renderer) = match started {
        Ok(parts) => {
            let _ = ready.send(Ok(()));
            parts
        }
        Err(err) => {
            finished.store(true, Ordering::Relaxed);
            let _ = ready.send(Err(err));
            return;
        }
    };
    progress.publish(renderer.stats());

    let sample_rate = output.sample_rate();
    let publish_every = (sample_rate / 10).max(1) as u64;
    let mut frame_count: u64 = 0;

    while !renderer.is_finished() {
        if stop_signal.load(Ordering::Relaxed) {
            renderer.stop();
            break;
        }
        output.write_spin(renderer.next_frame());
        frame_count += 1;
        if frame_count % publish_every == 0 {
            progress.publish(renderer.stats());
        }
    }
    progress.publish(renderer.stats());

    // let the ring buffer drain before the stream goes away
    for _ in 0..sample_rate / 10 {
        output.write_spin(Frame::silence());
    }
    if let Err(err) = output.stop() {
        warn!("stopping output: {}", err);
    }

    finished.store(true, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_speed_is_rejected_before_rendering() {
        let mut ctl = Controller::default();
        let song = Arc::new(demo_song("scale").unwrap());
        assert!(matches!(
            ctl.render_frames(song.clone(), Some(0.0), 10),
            Err(ControllerError::Playback(PlaybackError::InvalidSpeed(_)))
        ));
        assert!(matches!(ctl.render_frames(song, Some(f32::NAN), 10), Err(ControllerError::Playback(_))));
        assert_eq!(ctl.speed(), 1.0);
    }

    #[test]
    fn speed_persists_across_renders() {
        let mut ctl = Controller::new(ControllerConfig { sample_rate: 8000, ..Default::default() });
        let song = Arc::new(demo_song("scale").unwrap());

        let normal = ctl.render_frames(song.clone(), None, usize::MAX).unwrap().len();
        let fast = ctl.render_frames(song.clone(), Some(2.0), usize::MAX).unwrap().len();
        let again = ctl.render_frames(song, None, usize::MAX).unwrap().len();

        assert_eq!(ctl.speed(), 2.0);
        assert!(fast < normal);
        assert_eq!(fast, again);
    }

    #[test]
    fn render_respects_frame_cap() {
        let mut ctl = Controller::new(ControllerConfig { sample_rate: 8000, ..Default::default() });
        let frames = ctl.render_frames(Arc::new(demo_song("groove").unwrap()), None, 1000).unwrap();
        assert_eq!(frames.len(), 1000);
    }

    #[test]
    fn idle_controller_reports_nothing() {
        let ctl = Controller::default();
        assert!(!ctl.is_playing());
        assert!(!ctl.is_finished());
        assert!(ctl.stats().is_none());
    }
}
