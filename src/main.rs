//! sccsynth - render JSON MIDI sequences through the SCC wavetable engine.
//!
//! Usage:
//!   sccsynth song.json --map instruments.json --out song.wav
//!   sccsynth song.json --map instruments.json --speed 1.5 --transpose -2 -v

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use scc_master::{ExportOptions, RenderOptions, Synth, SynthConfig};

/// Render a MIDI sequence (JSON) with an instrument map to a 16-bit WAV file.
#[derive(Parser, Debug)]
#[command(name = "sccsynth")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// MIDI sequence as JSON ({ division, events })
    input: PathBuf,

    /// Instrument map JSON; the built-in instruments are used when omitted
    #[arg(short, long)]
    map: Option<PathBuf>,

    /// Output WAV path (default: input with a .wav extension)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Engine configuration JSON
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Transpose melodic voices by semitones
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    transpose: i8,

    /// Fine detune of melodic voices in cents
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    detune: f32,

    /// Playback speed multiplier
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Dither seed for bit-exact output
    #[arg(long)]
    seed: Option<u64>,

    /// Round to 16-bit without dither
    #[arg(long)]
    no_dither: bool,

    /// Override the configured sample rate
    #[arg(long)]
    sample_rate: Option<u32>,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut engine_config = match &cli.config {
        Some(path) => SynthConfig::from_file(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => SynthConfig::default(),
    };
    if cli.sample_rate.is_some() {
        engine_config.sample_rate = cli.sample_rate;
    }
    let engine_config = engine_config.engine_config().context("invalid engine configuration")?;
    let mut synth = Synth::with_config(engine_config)?;

    match &cli.map {
        Some(path) => synth
            .load_instrument_map_file(path)
            .with_context(|| format!("failed to load instrument map {}", path.display()))?,
        None => synth.load(scc_master::InstrumentMap::with_builtins())?,
    }

    let text = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let sequence = scc_formats::parse_midi_json(&text)
        .with_context(|| format!("failed to parse {}", cli.input.display()))?;

    let options = RenderOptions { transpose: cli.transpose, fine_detune: cli.detune, speed: cli.speed };
    println!(
        "Rendering {} ({} events) at {} Hz...",
        cli.input.display(),
        sequence.events.len(),
        synth.config().sample_rate
    );
    let result = synth.render(&sequence, &options).context("render failed")?;

    let export = ExportOptions { dither: !cli.no_dither, seed: cli.seed };
    let wav = Synth::export_wav_with(&result, &export).context("WAV encoding failed")?;
    let out = cli.out.clone().unwrap_or_else(|| cli.input.with_extension("wav"));
    fs::write(&out, &wav).with_context(|| format!("failed to write {}", out.display()))?;

    println!("Duration: {:.2}s ({} frames)", result.duration, result.frames());
    println!("Peak:     {:.3}", result.peak());
    println!("Wrote {} bytes to {}", wav.len(), out.display());
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}
