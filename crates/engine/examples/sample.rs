//! Plays a music file and fires a strike cue on every beat.
//!
//! `cargo run -p kbm_engine --example sample -- music.wav strike.wav 120`

use std::path::Path;
use std::time::{Duration, Instant};

use kbm_transport::AudioOutput;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let music_path = args.get(1).map(String::as_str).unwrap_or("samples/music.wav");
    let strike_path = args.get(2).map(String::as_str).unwrap_or("samples/strike.wav");
    let bpm: f64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(120.0);

    let music = kbm_decode::decode_file(Path::new(music_path))?;
    let strike = kbm_decode::decode_file(Path::new(strike_path))?;
    println!("loaded {music:?}");

    let mut engine = kbm_engine::start(Some(strike))?;
    engine.load_stream(music);
    engine.play();

    let beat = Duration::from_secs_f64(60.0 / bpm);
    let started = Instant::now();
    let mut beats = 0u32;

    loop {
        if started.elapsed() >= beat * beats {
            engine.play_batch(1 + (beats % 4 == 0) as usize);
            beats += 1;
        }
        if let Some(position) = engine.poll_position() {
            print!("\rposition: {position:.2}s");
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}
