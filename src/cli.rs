use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "synes", about = "Glitch an image and sonify the result")]
pub struct Cli {
    /// Input image (PNG, JPEG)
    pub input: PathBuf,

    /// Output image
    #[arg(short, long, default_value = "glitched.png")]
    pub output: PathBuf,

    /// Also write the sonified pixels as 16-bit mono WAV
    #[arg(long)]
    pub wav: Option<PathBuf>,

    /// Block displacement amount (0.0-1.0)
    #[arg(long)]
    pub displacement: Option<f32>,

    /// Monochrome grain amount (0.0-1.0)
    #[arg(long)]
    pub noise: Option<f32>,

    /// Seed string; empty means non-reproducible grain
    #[arg(long)]
    pub seed: Option<String>,

    /// Bloom luma threshold (0.0-1.0)
    #[arg(long)]
    pub bloom_threshold: Option<f32>,

    /// Bloom mix (0.0-2.0, 0 disables bloom)
    #[arg(long)]
    pub bloom_intensity: Option<f32>,

    /// Bloom blur radius (0.0-1.0, scaled to 40px at half resolution)
    #[arg(long)]
    pub bloom_radius: Option<f32>,

    /// Start from random parameters and a random seed; the parameter flags still override
    #[arg(long)]
    pub randomize: bool,

    /// Parameter snapshot as JSON (camelCase keys); flags above override it
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Config file (defaults to ./synes.toml or the user config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Audio sample rate in Hz
    #[arg(long, default_value_t = 44100)]
    pub sample_rate: u32,

    /// One-pole smoothing coefficient (0.0-1.0)
    #[arg(long, default_value_t = 0.5)]
    pub smoothing: f32,

    /// Longest image side after loading
    #[arg(long, default_value_t = 2000)]
    pub max_dimension: u32,

    /// Print the red-channel level meter
    #[arg(long)]
    pub meter: bool,

    /// Play the looped signal for this many seconds (requires the `playback` feature)
    #[arg(long)]
    pub play: Option<f64>,

    /// Start offset for --play, in seconds (wraps at the signal duration); needs --play
    #[arg(long, default_value_t = 0.0, requires = "play")]
    pub seek: f64,
}
