use serde::{Deserialize, Serialize};

/// User-adjustable glitch parameters.
///
/// Ranges: displacement, noise, bloom threshold and radius in `[0, 1]`,
/// bloom intensity in `[0, 2]`. Out-of-range input is clamped, not rejected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlitchParams {
    pub displacement: f32,
    pub noise: f32,
    pub seed: String,
    pub bloom_threshold: f32,
    pub bloom_intensity: f32,
    pub bloom_radius: f32,
}

impl Default for GlitchParams {
    fn default() -> Self {
        Self {
            displacement: 0.0,
            noise: 0.0,
            seed: String::new(),
            bloom_threshold: 0.7,
            bloom_intensity: 0.0,
            bloom_radius: 0.3,
        }
    }
}

const SEED_LEN: usize = 8;

fn clamp_or(value: f32, lo: f32, hi: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(lo, hi)
    }
}

impl GlitchParams {
    /// Parameters that leave the source untouched (apart from forced-opaque alpha).
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Copy with every field clamped into its documented range.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        Self {
            displacement: clamp_or(self.displacement, 0.0, 1.0, 0.0),
            noise: clamp_or(self.noise, 0.0, 1.0, 0.0),
            seed: self.seed.clone(),
            bloom_threshold: clamp_or(self.bloom_threshold, 0.0, 1.0, defaults.bloom_threshold),
            bloom_intensity: clamp_or(self.bloom_intensity, 0.0, 2.0, 0.0),
            bloom_radius: clamp_or(self.bloom_radius, 0.0, 1.0, defaults.bloom_radius),
        }
    }

    /// Fresh look: light displacement and grain, bloom on about half the time,
    /// and a random seed string so the result can be reproduced afterwards.
    pub fn randomized(rng: &mut fastrand::Rng) -> Self {
        let bloom_intensity = if rng.bool() { 0.0 } else { rng.f32() };
        Self {
            displacement: rng.f32() * 0.4,
            noise: rng.f32() * 0.4,
            seed: (0..SEED_LEN).map(|_| rng.alphanumeric()).collect(),
            bloom_threshold: 0.5 + rng.f32() * 0.5,
            bloom_intensity,
            bloom_radius: rng.f32() * 0.5,
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<Self>(json).map(|p| p.sanitized())
    }
}
