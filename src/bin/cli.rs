//! chiptune CLI: real-time playback and WAV export of JSON songs.
//!
//! Usage:
//!   chip-cli path/to/song.json
//!   chip-cli path/to/song.json --loop
//!   chip-cli path/to/song.json --wav output.wav

use anyhow::{Context, Result};
use chip_master::{Controller, EndOfSong, PlaybackConfig, Song};
use clap::Parser;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "chip-cli", version, about = "Play a four-channel chiptune song")]
struct Args {
    /// Song file (JSON)
    song: PathBuf,

    /// Render offline to this WAV file instead of playing
    #[arg(long, value_name = "FILE")]
    wav: Option<PathBuf>,

    /// Start over at the first event instead of stopping at the end
    #[arg(long = "loop")]
    looping: bool,

    /// Capacity of each channel buffer, in seconds
    #[arg(long, default_value_t = 2.0)]
    buffer_seconds: f32,

    /// How far ahead of playback the channels render, in milliseconds
    #[arg(long, default_value_t = 250)]
    lookahead_ms: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    let song = chip_master::load_file(&args.song)
        .with_context(|| format!("failed to load {}", args.song.display()))?;

    println!("Now playing: {}", song.name);
    println!("Tempo: {} BPM", song.tempo_bpm);
    println!("Events: {} ({:.1} s)", song.notes.len(), song.total_seconds());
    println!();

    match args.wav {
        Some(ref wav) => export_wav(&song, wav),
        None => {
            let config = PlaybackConfig::default()
                .with_buffer_seconds(args.buffer_seconds)
                .with_lookahead(Duration::from_millis(args.lookahead_ms))
                .with_end_of_song(if args.looping { EndOfSong::Loop } else { EndOfSong::Stop });
            play(song, config)
        }
    }
}

fn play(song: Song, config: PlaybackConfig) -> Result<()> {
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = interrupted.clone();
        ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst))
            .context("failed to install Ctrl+C handler")?;
    }

    let sample_rate = u64::from(config.sample_rate.max(1));
    let mut ctrl = Controller::with_config(config);
    ctrl.start(song).context("failed to start playback")?;
    println!("Press Ctrl+C to stop playback");

    while ctrl.is_playing() && !interrupted.load(Ordering::SeqCst) {
        ctrl.update();
        if let Some(pos) = ctrl.position() {
            let buffered_ms = ctrl.buffered_samples() * 1000 / sample_rate;
            print!(
                "\rEvent: {:04} | Loop: {} | Buffered: {:4} ms",
                pos.event_index, pos.loop_count, buffered_ms
            );
            let _ = std::io::stdout().flush();
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    ctrl.stop();
    if interrupted.load(Ordering::SeqCst) {
        println!("\rPlayback stopped.                          ");
    } else {
        println!("\rDone.                                     ");
    }
    Ok(())
}

fn export_wav(song: &Song, path: &Path) -> Result<()> {
    let sample_rate = PlaybackConfig::default().sample_rate;
    println!("Rendering to {} at {} Hz...", path.display(), sample_rate);

    let wav = chip_master::render_to_wav(song, sample_rate, &mut rand::thread_rng())
        .context("failed to encode WAV")?;
    println!("Rendered {} bytes", wav.len());

    fs::write(path, &wav).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Done.");
    Ok(())
}
