use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::audio::synth::{sanitize_smoothing, DEFAULT_SAMPLE_RATE, DEFAULT_SMOOTHING};
use crate::params::GlitchParams;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub params: GlitchParams,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
}

#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            smoothing: default_smoothing(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            max_dimension: default_max_dimension(),
        }
    }
}

fn default_sample_rate() -> u32 { DEFAULT_SAMPLE_RATE }
fn default_smoothing() -> f32 { DEFAULT_SMOOTHING }
fn default_debounce_ms() -> u64 { 100 }
fn default_max_dimension() -> u32 { 2000 }

pub fn parse_config(content: &str) -> Option<Config> {
    match toml::from_str::<Config>(content) {
        Ok(mut cfg) => {
            cfg.params = cfg.params.sanitized();
            cfg.audio.smoothing = sanitize_smoothing(cfg.audio.smoothing);
            Some(cfg)
        }
        Err(err) => {
            log::warn!("Invalid config: {}", err);
            None
        }
    }
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    parse_config(&content)
}

/// Explicit path, else `./synes.toml`, else the user config directories.
pub fn discover(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| {
        let local = PathBuf::from("synes.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("synes").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("synes").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.audio.sample_rate, 44_100);
        assert_eq!(cfg.audio.smoothing, 0.5);
        assert_eq!(cfg.session.debounce_ms, 100);
        assert_eq!(cfg.session.max_dimension, 2000);
        assert_eq!(cfg.params, GlitchParams::default());
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let cfg = parse_config(
            r#"
            [audio]
            sample_rate = 48000

            [params]
            displacement = 0.4
            seed = "tape"
            bloomIntensity = 5.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.audio.sample_rate, 48_000);
        assert_eq!(cfg.audio.smoothing, 0.5);
        assert_eq!(cfg.params.displacement, 0.4);
        assert_eq!(cfg.params.seed, "tape");
        assert_eq!(cfg.params.bloom_intensity, 2.0);
    }

    #[test]
    fn malformed_config_is_rejected() {
        assert!(parse_config("[audio]\nsample_rate = \"fast\"").is_none());
    }

    #[test]
    fn smoothing_is_sanitized() {
        let cfg = parse_config("[audio]\nsmoothing = nan").unwrap();
        assert_eq!(cfg.audio.smoothing, DEFAULT_SMOOTHING);
        let cfg = parse_config("[audio]\nsmoothing = 3.0").unwrap();
        assert_eq!(cfg.audio.smoothing, 0.999);
    }

    #[test]
    fn explicit_path_wins() {
        let p = PathBuf::from("/tmp/custom.toml");
        assert_eq!(discover(Some(p.clone())), Some(p));
    }
}
