//! Transcribe a raw 16-bit PCM file with the fake engine backend.
//!
//! ```sh
//! cargo run --example transcribe --features fake-engine -- model.bin audio.raw
//! ```
//!
//! The audio file is read as little-endian signed 16-bit mono samples at the
//! model's sample rate.

use std::env;
use std::fs;
use std::process;

use scribe_core::engine::fake::FakeEngine;
use scribe_core::{Engine, ModelSession};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("usage: {} <model> <audio.raw>", args[0]);
        process::exit(2);
    }

    let engine = FakeEngine::new();
    println!("engine: {}", engine.version());

    if let Err(e) = run(&engine, &args[1], &args[2]) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(engine: &dyn Engine, model_path: &str, audio_path: &str) -> scribe_core::ScribeResult<()> {
    let mut model = ModelSession::open(engine, model_path)?;
    println!(
        "model loaded: beam width {}, sample rate {} Hz",
        model.beam_width()?,
        model.sample_rate()?
    );

    let bytes = fs::read(audio_path)
        .map_err(|e| scribe_core::ScribeError::load(format!("cannot read {audio_path}: {e}")))?;
    let samples: Vec<i16> = bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect();

    // Stream in half-second chunks, showing intermediate results.
    let chunk = model.sample_rate()? as usize / 2;
    let mut stream = model.new_stream()?;
    for piece in samples.chunks(chunk) {
        stream.feed(piece)?;
        println!("partial: {}", stream.intermediate()?);
    }
    println!("final:   {}", stream.finish()?);

    model.close()
}
