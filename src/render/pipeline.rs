use rayon::prelude::*;
use std::time::Instant;

use super::frame::{clamp_channel, ProcessedFrame, SourceFrame, BYTES_PER_PIXEL};
use super::postprocess::Bloom;
use crate::params::GlitchParams;
use crate::rng::{hash_block, seed_hash, RandomSource};

const MAX_SHIFT_X: f64 = 0.4;
const MAX_SHIFT_Y: f64 = 0.2;
const SEED_OFFSET_X: i32 = 111;
const SEED_OFFSET_Y: i32 = 999;

/// Per-scanline block displacement.
///
/// The control is shaped with a quartic curve so it stays inert at low values.
#[derive(Clone, Copy, Debug)]
pub struct Displacement {
    width: u32,
    height: u32,
    max_offset_x: i64,
    max_offset_y: i64,
    seed: i32,
}

impl Displacement {
    pub fn new(amount: f32, seed: &str, width: u32, height: u32) -> Self {
        let force = (amount as f64).powi(4);
        Self {
            width,
            height,
            max_offset_x: (force * width as f64 * MAX_SHIFT_X).floor() as i64,
            max_offset_y: (force * height as f64 * MAX_SHIFT_Y).floor() as i64,
            seed: seed_hash(seed),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.max_offset_x == 0 && self.max_offset_y == 0
    }

    /// Signed shift applied to every pixel of row `y`.
    pub fn row_shift(&self, y: u32) -> (i64, i64) {
        if self.is_identity() {
            return (0, 0);
        }
        let rnd_x = hash_block(y, self.seed.wrapping_add(SEED_OFFSET_X));
        let rnd_y = hash_block(y, self.seed.wrapping_add(SEED_OFFSET_Y));
        let shift_x = ((2.0 * rnd_x - 1.0) * self.max_offset_x as f64).floor() as i64;
        let shift_y = ((2.0 * rnd_y - 1.0) * self.max_offset_y as f64).floor() as i64;
        (shift_x, shift_y)
    }

    /// Source coordinate for destination `(x, y)`, wrapped onto the torus.
    pub fn source_coord(&self, x: u32, y: u32) -> (u32, u32) {
        let (shift_x, shift_y) = self.row_shift(y);
        (
            wrap(x as i64 + shift_x, self.width),
            wrap(y as i64 + shift_y, self.height),
        )
    }
}

#[inline]
fn wrap(v: i64, size: u32) -> u32 {
    if size == 0 {
        return 0;
    }
    v.rem_euclid(size as i64) as u32
}

/// Displace rows of `source` into a fresh, opaque buffer.
pub fn displace(source: &SourceFrame, displacement: &Displacement) -> ProcessedFrame {
    let width = source.width();
    let height = source.height();
    let mut out = ProcessedFrame::blank(width, height);
    if out.pixel_count() == 0 {
        return out;
    }

    let row_bytes = width as usize * BYTES_PER_PIXEL;
    let src = source.pixels();

    out.pixels
        .par_chunks_mut(row_bytes)
        .enumerate()
        .for_each(|(y, row)| {
            let (shift_x, shift_y) = displacement.row_shift(y as u32);
            let sy = wrap(y as i64 + shift_y, height) as usize;
            let src_row = &src[sy * row_bytes..(sy + 1) * row_bytes];
            for (x, dst) in row.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
                let sx = wrap(x as i64 + shift_x, width) as usize;
                let idx = sx * BYTES_PER_PIXEL;
                dst[..3].copy_from_slice(&src_row[idx..idx + 3]);
                dst[..3].copy_from_slice(&src[idx..idx + 3]);
                dst[3] = 255;
            }
        });

    out
}

/// Monochromatic grain: one draw per pixel, added equally to R, G and B.
///
/// Draws happen in pixel order so a seeded stream gives the same frame every run.
pub fn add_noise(frame: &mut ProcessedFrame, amount: f32, random: &mut RandomSource) {
    if amount <= 0.0 {
        return;
    }
    let scale = 255.0 * amount as f64;
    for px in frame.pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
        let grain = (random.next_f64() - 0.5) * scale;
        for c in &mut px[..3] {
            *c = clamp_channel((*c as f64 + grain) as f32);
        }
        px[3] = 255;
    }
}

/// Run the full effect chain: displacement, noise, then bloom in place.
///
/// Pure in its inputs when `params.seed` is non-empty.
pub fn run(source: &SourceFrame, params: &GlitchParams) -> ProcessedFrame {
    let started = Instant::now();
    let params = params.sanitized();

    let displacement = Displacement::new(
        params.displacement,
        &params.seed,
        source.width(),
        source.height(),
    );
    let mut frame = displace(source, &displacement);

    let mut random = RandomSource::for_seed(&params.seed);
    add_noise(&mut frame, params.noise, &mut random);

    Bloom::from_params(&params).apply(&mut frame);

    log::debug!(
        "Pipeline {}x{}: displacement={:.3} noise={:.3} seed={:?} \
         bloom=({:.2}, {:.2}, {:.2}) in {:.1}ms",
        source.width(),
        source.height(),
        params.displacement,
        params.noise,
        params.seed,
        params.bloom_threshold,
        params.bloom_intensity,
        params.bloom_radius,
        started.elapsed().as_secs_f64() * 1000.0
    );

    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> SourceFrame {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[
                    (x * 37 % 256) as u8,
                    (y * 53 % 256) as u8,
                    ((x + y) * 11 % 256) as u8,
                    (x * y % 256) as u8,
                ]);
            }
        }
        SourceFrame::new(width, height, pixels).unwrap()
    }

    fn seeded(displacement: f32, noise: f32, seed: &str) -> GlitchParams {
        GlitchParams {
            displacement,
            noise,
            seed: seed.into(),
            ..Default::default()
        }
    }

    #[test]
    fn identity_params_copy_source_with_opaque_alpha() {
        for (w, h) in [(1, 1), (5, 3), (16, 9)] {
            let source = gradient(w, h);
            let out = run(&source, &GlitchParams::neutral());
            assert_eq!((out.width, out.height), (w, h));
            for (s, o) in source.pixels().chunks(4).zip(out.pixels.chunks(4)) {
                assert_eq!(&s[..3], &o[..3]);
                assert_eq!(o[3], 255);
            }
        }
    }

    #[test]
    fn empty_frame_does_not_panic() {
        let source = SourceFrame::new(0, 0, Vec::new()).unwrap();
        let out = run(&source, &seeded(1.0, 1.0, "X"));
        assert!(out.pixels.is_empty());

        let source = SourceFrame::new(7, 0, Vec::new()).unwrap();
        let out = run(&source, &seeded(1.0, 1.0, "X"));
        assert!(out.pixels.is_empty());
    }

    #[test]
    fn seeded_runs_are_byte_identical() {
        let source = gradient(32, 24);
        let params = GlitchParams {
            bloom_intensity: 1.0,
            bloom_threshold: 0.3,
            ..seeded(0.8, 0.6, "repeatable")
        };
        let a = run(&source, &params);
        let b = run(&source, &params);
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_diverge() {
        let source = gradient(32, 24);
        let a = run(&source, &seeded(0.9, 0.5, "one"));
        let b = run(&source, &seeded(0.9, 0.5, "two"));
        assert_ne!(a, b);
    }

    #[test]
    fn displacement_wraps_inside_frame() {
        let d = Displacement::new(1.0, "X", 4, 4);
        for i in 0..10_000u32 {
            let (sx, sy) = d.source_coord(i % 4, i % 4 + (i / 4) * 4);
            assert!(sx < 4 && sy < 4, "({sx}, {sy}) out of bounds at {i}");
        }
    }

    #[test]
    fn displacement_wraps_with_large_offsets() {
        let d = Displacement::new(1.0, "wide", 1000, 1000);
        assert!(!d.is_identity());
        for y in 0..1000 {
            let (sx, sy) = d.source_coord(999, y);
            assert!(sx < 1000 && sy < 1000);
        }
    }

    #[test]
    fn displacement_is_row_coherent() {
        let d = Displacement::new(1.0, "rows", 64, 64);
        for y in 0..64 {
            let (x0, y0) = d.source_coord(0, y);
            let (x1, y1) = d.source_coord(1, y);
            assert_eq!(y0, y1);
            assert_eq!((x0 + 1) % 64, x1);
        }
    }

    #[test]
    fn displaced_pixels_follow_source_coord() {
        for (w, h, seed) in [(13, 7, "a"), (3, 50, "tall"), (64, 2, "wide"), (1, 9, "X")] {
            let source = gradient(w, h);
            let d = Displacement::new(1.0, seed, w, h);
            let out = displace(&source, &d);
            for y in 0..h {
                for x in 0..w {
                    let (sx, sy) = d.source_coord(x, y);
                    let dst = ((y * w + x) * 4) as usize;
                    let src = ((sy * w + sx) * 4) as usize;
                    assert_eq!(
                        &out.pixels[dst..dst + 3],
                        &source.pixels()[src..src + 3],
                        "{w}x{h} at ({x}, {y})"
                    );
                }
            }
        }
    }

    #[test]
    fn low_displacement_is_inert() {
        // 0.2^4 * 10 * 0.4 < 1, so no row moves
        let d = Displacement::new(0.2, "X", 10, 10);
        assert!(d.is_identity());
        assert_eq!(d.source_coord(3, 7), (3, 7));
    }

    #[test]
    fn one_by_one_frame_with_full_displacement() {
        let source = gradient(1, 1);
        let out = run(&source, &seeded(1.0, 0.0, "X"));
        assert_eq!(&out.pixels[..3], &source.pixels()[..3]);
    }

    #[test]
    fn full_noise_stays_in_range_and_is_monochrome() {
        let white = SourceFrame::new(8, 8, vec![255; 256]).unwrap();
        let mut frame = displace(&white, &Displacement::new(0.0, "", 8, 8));
        let mut random = RandomSource::for_seed("grain");
        add_noise(&mut frame, 1.0, &mut random);
        for px in frame.pixels.chunks(4) {
            assert_eq!(px[0], px[1]);
            assert_eq!(px[1], px[2]);
            assert_eq!(px[3], 255);
        }

        let mid = SourceFrame::new(8, 8, vec![128; 256]).unwrap();
        let out = run(&mid, &seeded(0.0, 1.0, "grain"));
        assert!(out.pixels.chunks(4).any(|px| px[0] != 128));
    }

    #[test]
    fn unseeded_noise_still_clamps() {
        let black = SourceFrame::new(16, 16, vec![0; 1024]).unwrap();
        let out = run(&black, &seeded(0.0, 1.0, ""));
        assert_eq!(out.pixels.len(), 1024);
        assert!(out.pixels.chunks(4).all(|px| px[3] == 255));
    }
}
