//! midisong CLI: headless playback and WAV export of the demo songs.
//!
//! Usage:
//!   ms-cli --song groove
//!   ms-cli --song chords --speed 1.5 --wav chords.wav

use clap::Parser;
use log::LevelFilter;
use ms_master::{demo_song, Controller, ControllerConfig, PlayerConfig, Song, DEMO_SONGS};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(feature = "alloc_check")]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

/// Play a chunked note-stream song
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Demo song to play
    #[arg(short, long, default_value = "scale")]
    song: String,
    /// Playback speed multiplier
    #[arg(long)]
    speed: Option<f32>,
    /// Render to this WAV file instead of playing
    #[arg(short, long)]
    wav: Option<PathBuf>,
    /// Longest render, in seconds
    #[arg(long, default_value_t = 300)]
    seconds: u32,
    /// Scheduler lookahead in ms
    #[arg(long, default_value_t = 2000.0)]
    time_buffer: f64,
    /// Master volume, 0-255
    #[arg(long, default_value_t = 255)]
    volume: u8,
    /// List the demo songs and exit
    #[arg(long)]
    list: bool,
}

fn main() {
    env_logger::builder().filter_level(LevelFilter::Info).parse_default_env().init();
    let args = Args::parse();

    if args.list {
        for name in DEMO_SONGS {
            println!("{}", name);
        }
        return;
    }

    let song = demo_song(&args.song).unwrap_or_else(|e| {
        eprintln!("{} (try --list)", e);
        std::process::exit(1);
    });

    println!("Title:    {}", song.name);
    println!("Artist:   {}", song.artist);
    println!("Records:  {}", song.record_count());
    println!("Tick:     {} ms", song.resolution);
    println!();

    let config = ControllerConfig {
        player: PlayerConfig { time_buffer_ms: args.time_buffer, ..PlayerConfig::default() },
        master_volume: args.volume,
        ..ControllerConfig::default()
    };
    let mut ctrl = Controller::new(config);
    let song = Arc::new(song);

    match &args.wav {
        Some(path) => render_to_wav(&mut ctrl, song, args.speed, path, args.seconds),
        None => play_audio(&mut ctrl, song, args.speed),
    }
}

fn play_audio(ctrl: &mut Controller, song: Arc<Song>, speed: Option<f32>) {
    ctrl.play(song, speed).unwrap_or_else(|e| {
        eprintln!("Failed to start playback: {}", e);
        std::process::exit(1);
    });
    println!("Playing...");

    while ctrl.is_playing() {
        if let Some(stats) = ctrl.stats() {
            print!("\rChunk: {:3} | Notes: {:5}", stats.chunks, stats.notes_queued);
            let _ = std::io::stdout().flush();
        }
        std::thread::sleep(std::time::Duration::from_millis(50));
    }

    println!("\rDone.                              ");
}

fn render_to_wav(ctrl: &mut Controller, song: Arc<Song>, speed: Option<f32>, path: &Path, seconds: u32) {
    println!("Rendering to {} at {} Hz...", path.display(), ctrl.config().sample_rate);

    match ctrl.render_to_wav(song, speed, path, seconds) {
        Ok(frames) => println!("Rendered {} frames", frames),
        Err(e) => {
            eprintln!("Failed to render {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}
