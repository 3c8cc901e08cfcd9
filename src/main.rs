use anyhow::{Context, Result};
use clap::Parser;

use synes::audio::playback::{AudioClock, AudioSink, MonotonicClock, RecordingSink};
use synes::audio::synth::Synthesizer;
use synes::encode::{png, wav};
use synes::{config, GlitchEngine, GlitchParams};

mod cli;

use cli::Cli;

const METER_LEVELS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const METER_COLUMNS: usize = 64;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    let mut params = GlitchParams::neutral();
    if let Some(ref path) = config::discover(cli.config.clone()) {
        if let Some(cfg) = config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            // Merge: config values apply only when CLI is at its default
            if cli.sample_rate == 44100 { cli.sample_rate = cfg.audio.sample_rate; }
            if cli.smoothing == 0.5 { cli.smoothing = cfg.audio.smoothing; }
            if cli.max_dimension == 2000 { cli.max_dimension = cfg.session.max_dimension; }
            params = cfg.params;
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    if let Some(ref path) = cli.params {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read params: {}", path.display()))?;
        params = GlitchParams::from_json(&json)
            .with_context(|| format!("Failed to parse params: {}", path.display()))?;
    }
    if cli.randomize {
        params = GlitchParams::randomized(&mut fastrand::Rng::new());
        log::info!("Randomized parameters (seed {:?})", params.seed);
    }
    let params = apply_overrides(params, &cli);

    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }

    log::info!("synes - pixel glitch sonifier");
    log::info!("Input: {}", cli.input.display());
    log::info!("Output: {}", cli.output.display());

    let source = png::load_source(&cli.input, cli.max_dimension)?;

    match cli.play {
        Some(seconds) => play(&cli, source, &params, seconds),
        None => {
            let synth = Synthesizer::new(cli.sample_rate, cli.smoothing);
            let sink = RecordingSink::default();
            let mut engine = GlitchEngine::new(MonotonicClock::default(), sink, synth);
            engine.load_source(source);
            render(&mut engine, &cli, &params)
        }
    }
}

fn apply_overrides(mut params: GlitchParams, cli: &Cli) -> GlitchParams {
    if let Some(v) = cli.displacement { params.displacement = v; }
    if let Some(v) = cli.noise { params.noise = v; }
    if let Some(ref v) = cli.seed { params.seed = v.clone(); }
    if let Some(v) = cli.bloom_threshold { params.bloom_threshold = v; }
    if let Some(v) = cli.bloom_intensity { params.bloom_intensity = v; }
    if let Some(v) = cli.bloom_radius { params.bloom_radius = v; }
    params.sanitized()
}

fn render<C: AudioClock, S: AudioSink>(
    engine: &mut GlitchEngine<C, S>,
    cli: &Cli,
    params: &GlitchParams,
) -> Result<()> {
    if params.seed.is_empty() && params.noise > 0.0 {
        log::warn!("No seed given: grain will differ between runs");
    }

    let frame = engine.reprocess(params)?.clone();
    png::save_png(&frame, &cli.output)?;

    if let Some(ref path) = cli.wav {
        wav::write_wav(path, &engine.signal()?)?;
    }

    if cli.meter {
        println!("{}", meter_line(engine.spectrogram()));
    }

    log::info!("Done! Duration: {:.2}s", engine.duration());
    Ok(())
}

/// Collapse the level buffer into a single row of block glyphs.
fn meter_line(levels: &[u8]) -> String {
    levels
        .chunks(levels.len().div_ceil(METER_COLUMNS).max(1))
        .map(|chunk| {
            let avg = chunk.iter().map(|&v| v as usize).sum::<usize>() / chunk.len();
            METER_LEVELS[avg * (METER_LEVELS.len() - 1) / 255]
        })
        .collect()
}

#[cfg(feature = "playback")]
fn play(cli: &Cli, source: synes::SourceFrame, params: &GlitchParams, seconds: f64) -> Result<()> {
    use synes::audio::device::CpalSink;

    let sink = CpalSink::open()?;
    let synth = Synthesizer::new(sink.sample_rate(), cli.smoothing);
    let mut engine = GlitchEngine::new(MonotonicClock::default(), sink, synth);
    engine.load_source(source);
    render(&mut engine, cli, params)?;

    engine.seek(cli.seek)?;
    engine.toggle_playback()?;
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs_f64(seconds.max(0.0));
    while std::time::Instant::now() < deadline {
        std::thread::sleep(std::time::Duration::from_millis(250));
        log::debug!("{:.2}s / {:.2}s", engine.current_time(), engine.duration());
    }
    engine.toggle_playback()?;
    Ok(())
}

#[cfg(not(feature = "playback"))]
fn play(_: &Cli, _: synes::SourceFrame, _: &GlitchParams, _: f64) -> Result<()> {
    anyhow::bail!(
        "Live playback requires the 'playback' feature. \
         Rebuild with: cargo build --features playback"
    );
}
