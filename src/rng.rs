const SEED_BASE: i32 = 123_456_789;
const MULBERRY_INCREMENT: u32 = 0x6D2B_79F5;
const TWO_POW_32: f64 = 4_294_967_296.0;

/// Fold a seed string into a signed 32-bit integer.
///
/// Characters are consumed as UTF-16 code units.
pub fn seed_hash(seed: &str) -> i32 {
    seed.encode_utf16().fold(SEED_BASE, |s, unit| {
        s.wrapping_mul(31).wrapping_add(unit as i32)
    })
}

#[inline]
fn mix(mut t: u32) -> f64 {
    t = (t ^ (t >> 15)).wrapping_mul(t | 1);
    t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
    (t ^ (t >> 14)) as f64 / TWO_POW_32
}

/// Stateless per-index hash in `[0, 1)`.
///
/// Same index and seed always give the same value, which keeps displacement
/// coherent across a whole scanline.
pub fn hash_block(index: u32, seed: i32) -> f64 {
    let t = index
        .wrapping_add(seed as u32)
        .wrapping_mul(MULBERRY_INCREMENT);
    mix(t)
}

/// Mulberry32 stream generator. All arithmetic wraps at 32 bits.
#[derive(Clone, Debug)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    pub fn new(seed: i32) -> Self {
        Self { state: seed as u32 }
    }

    pub fn from_seed_str(seed: &str) -> Self {
        Self::new(seed_hash(seed))
    }

    /// Next value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.state = self.state.wrapping_add(MULBERRY_INCREMENT);
        mix(self.state)
    }
}

/// Uniform source used by the noise stage.
///
/// An empty seed selects `Entropy`, so the output is only reproducible when a
/// seed is supplied.
pub enum RandomSource {
    Seeded(Mulberry32),
    Entropy(fastrand::Rng),
}

impl RandomSource {
    pub fn for_seed(seed: &str) -> Self {
        if seed.is_empty() {
            RandomSource::Entropy(fastrand::Rng::new())
        } else {
            RandomSource::Seeded(Mulberry32::from_seed_str(seed))
        }
    }

    pub fn is_deterministic(&self) -> bool {
        matches!(self, RandomSource::Seeded(_))
    }

    pub fn next_f64(&mut self) -> f64 {
        match self {
            RandomSource::Seeded(m) => m.next_f64(),
            RandomSource::Entropy(rng) => rng.f64(),
        }
    }
}
