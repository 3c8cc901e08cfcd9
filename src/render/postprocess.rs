use rayon::prelude::*;

use super::frame::{clamp_channel, ProcessedFrame, BYTES_PER_PIXEL};
use crate::params::GlitchParams;

const DOWNSAMPLE: f32 = 0.5;
const MAX_BLUR_PX: f32 = 40.0;
const BOX_PASSES: usize = 3;
const TINT: [f32; 3] = [1.2, 0.9, 0.8];

/// Three-channel float image used between bloom stages.
#[derive(Clone, Debug)]
struct Plane {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Plane {
    fn zeros(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height * 3],
        }
    }

    #[inline]
    fn get(&self, x: usize, y: usize) -> [f32; 3] {
        let i = (y * self.width + x) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }
}

/// Half-resolution bright pass, warm tint, box-approximated Gaussian blur,
/// screen-blended back over the frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bloom {
    pub threshold: f32,
    pub intensity: f32,
    pub radius: f32,
}

impl Bloom {
    pub fn from_params(params: &GlitchParams) -> Self {
        Self {
            threshold: params.bloom_threshold,
            intensity: params.bloom_intensity,
            radius: params.bloom_radius,
        }
    }

    /// Blur standard deviation in downsampled pixels.
    pub fn blur_sigma(&self) -> f32 {
        self.radius.max(0.0) * MAX_BLUR_PX
    }

    /// Composite bloom into `frame`. No-op when intensity is zero or negative.
    pub fn apply(&self, frame: &mut ProcessedFrame) {
        if self.intensity <= 0.0 || frame.pixel_count() == 0 {
            return;
        }

        let mut plane = downsample(frame);
        threshold(&mut plane, self.threshold);

        let sigma = self.blur_sigma();
        if sigma > 0.0 {
            for size in box_sizes(sigma, BOX_PASSES) {
                let r = size / 2;
                blur_horizontal(&mut plane, r);
                blur_vertical(&mut plane, r);
            }
        }

        composite(frame, &plane, self.intensity);
    }
}

fn downsample(frame: &ProcessedFrame) -> Plane {
    let w = frame.width as usize;
    let h = frame.height as usize;
    let dw = ((w as f32 * DOWNSAMPLE).round() as usize).max(1);
    let dh = ((h as f32 * DOWNSAMPLE).round() as usize).max(1);
    let mut plane = Plane::zeros(dw, dh);

    for dy in 0..dh {
        let y0 = dy * h / dh;
        let y1 = ((dy + 1) * h / dh).max(y0 + 1);
        for dx in 0..dw {
            let x0 = dx * w / dw;
            let x1 = ((dx + 1) * w / dw).max(x0 + 1);
            let mut acc = [0.0f32; 3];
            for y in y0..y1 {
                for x in x0..x1 {
                    let i = (y * w + x) * BYTES_PER_PIXEL;
                    for c in 0..3 {
                        acc[c] += frame.pixels[i + c] as f32;
                    }
                }
            }
            let n = ((y1 - y0) * (x1 - x0)) as f32;
            let o = (dy * dw + dx) * 3;
            for c in 0..3 {
                plane.data[o + c] = acc[c] / n;
            }
        }
    }
    plane
}

#[inline]
fn luma(rgb: &[f32]) -> f32 {
    0.299 * rgb[0] + 0.587 * rgb[1] + 0.114 * rgb[2]
}

fn threshold(plane: &mut Plane, threshold: f32) {
    let cutoff = threshold * 255.0;
    for px in plane.data.chunks_exact_mut(3) {
        if luma(px) < cutoff {
            px.fill(0.0);
        } else {
            for (c, tint) in px.iter_mut().zip(TINT) {
                *c = (*c * tint).min(255.0);
            }
        }
    }
}

/// Box widths whose repeated application approximates a Gaussian of `sigma`.
fn box_sizes(sigma: f32, passes: usize) -> Vec<usize> {
    let n = passes as f32;
    let ideal = (12.0 * sigma * sigma / n + 1.0).sqrt();
    let mut lower = ideal.floor() as usize;
    if lower % 2 == 0 {
        lower = lower.saturating_sub(1);
    }
    let lower = lower.max(1);
    let upper = lower + 2;
    let lf = lower as f32;
    let m = ((12.0 * sigma * sigma - n * lf * lf - 4.0 * n * lf - 3.0 * n) / (-4.0 * lf - 4.0))
        .round()
        .max(0.0) as usize;
    (0..passes)
        .map(|i| if i < m { lower } else { upper })
        .collect()
}

/// Running-sum box blur over one line. Samples outside the line count as zero.
fn blur_line(src: &[f32], dst: &mut [f32], len: usize, stride: usize, r: usize) {
    let norm = 1.0 / (2 * r + 1) as f32;
    for c in 0..3 {
        let at = |i: usize| src[i * stride + c];
        let mut sum: f32 = (0..=r.min(len - 1)).map(at).sum();
        for i in 0..len {
            dst[i * stride + c] = sum * norm;
            let add = i + r + 1;
            if add < len {
                sum += at(add);
            }
            if i >= r {
                sum -= at(i - r);
            }
        }
    }
}

fn blur_horizontal(plane: &mut Plane, r: usize) {
    if r == 0 {
        return;
    }
    let width = plane.width;
    let src = plane.data.clone();
    plane
        .data
        .par_chunks_mut(width * 3)
        .zip(src.par_chunks(width * 3))
        .for_each(|(dst, row)| blur_line(row, dst, width, 3, r));
}

fn blur_vertical(plane: &mut Plane, r: usize) {
    if r == 0 {
        return;
    }
    let (width, height) = (plane.width, plane.height);
    let mut column = vec![0.0f32; height * 3];
    let mut blurred = vec![0.0f32; height * 3];
    for x in 0..width {
        for y in 0..height {
            let i = (y * width + x) * 3;
            column[y * 3..y * 3 + 3].copy_from_slice(&plane.data[i..i + 3]);
        }
        blur_line(&column, &mut blurred, height, 3, r);
        for y in 0..height {
            let i = (y * width + x) * 3;
            plane.data[i..i + 3].copy_from_slice(&blurred[y * 3..y * 3 + 3]);
        }
    }
}

/// Bilinear lookup of the half-resolution plane at full-resolution `(x, y)`.
fn sample_upscaled(plane: &Plane, x: usize, y: usize, width: usize, height: usize) -> [f32; 3] {
    let fx = ((x as f32 + 0.5) * plane.width as f32 / width as f32 - 0.5)
        .clamp(0.0, (plane.width - 1) as f32);
    let fy = ((y as f32 + 0.5) * plane.height as f32 / height as f32 - 0.5)
        .clamp(0.0, (plane.height - 1) as f32);
    let (x0, y0) = (fx.floor() as usize, fy.floor() as usize);
    let (x1, y1) = ((x0 + 1).min(plane.width - 1), (y0 + 1).min(plane.height - 1));
    let (tx, ty) = (fx - x0 as f32, fy - y0 as f32);

    let (a, b) = (plane.get(x0, y0), plane.get(x1, y0));
    let (c, d) = (plane.get(x0, y1), plane.get(x1, y1));
    let mut out = [0.0f32; 3];
    for i in 0..3 {
        let top = a[i] + (b[i] - a[i]) * tx;
        let bottom = c[i] + (d[i] - c[i]) * tx;
        out[i] = top + (bottom - top) * ty;
    }
    out
}

/// `255 - (255 - a) * (255 - b) / 255`
#[inline]
pub fn screen(a: f32, b: f32) -> f32 {
    255.0 - (255.0 - a) * (255.0 - b) / 255.0
}

fn composite(frame: &mut ProcessedFrame, plane: &Plane, intensity: f32) {
    let width = frame.width as usize;
    let height = frame.height as usize;
    frame
        .pixels
        .par_chunks_mut(width * BYTES_PER_PIXEL)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
                let glow = sample_upscaled(plane, x, y, width, height);
                for c in 0..3 {
                    let base = px[c] as f32;
                    let blended = screen(base, glow[c].clamp(0.0, 255.0));
                    px[c] = clamp_channel(base + (blended - base) * intensity);
                }
                px[3] = 255;
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> ProcessedFrame {
        let mut frame = ProcessedFrame::blank(width, height);
        for px in frame.pixels.chunks_exact_mut(4) {
            px[..3].copy_from_slice(&rgb);
        }
        frame
    }

    fn bloom(threshold: f32, intensity: f32, radius: f32) -> Bloom {
        Bloom {
            threshold,
            intensity,
            radius,
        }
    }

    #[test]
    fn zero_intensity_is_noop() {
        let mut frame = solid(8, 8, [200, 100, 50]);
        let before = frame.clone();
        bloom(0.0, 0.0, 1.0).apply(&mut frame);
        assert_eq!(frame, before);
    }

    #[test]
    fn dark_frame_below_threshold_is_unchanged() {
        let mut frame = solid(16, 16, [20, 20, 20]);
        let before = frame.clone();
        bloom(0.5, 2.0, 0.5).apply(&mut frame);
        assert_eq!(frame, before);
    }

    #[test]
    fn bright_region_bleeds_into_neighbours() {
        let mut frame = ProcessedFrame::blank(32, 32);
        for y in 12..20 {
            for x in 12..20 {
                let i = (y * 32 + x) * 4;
                frame.pixels[i..i + 3].copy_from_slice(&[255, 255, 255]);
            }
        }
        bloom(0.5, 1.0, 0.1).apply(&mut frame);
        // a pixel just outside the bright square picks up glow
        let i = (16 * 32 + 22) * 4;
        assert!(frame.pixels[i] > 0, "no bleed: {:?}", &frame.pixels[i..i + 4]);
        // warm tint: red glow exceeds blue glow
        assert!(frame.pixels[i] >= frame.pixels[i + 2]);
        // glow falls off with distance
        assert!(frame.pixels[0] < frame.pixels[i]);
    }

    #[test]
    fn screen_blend_never_darkens() {
        for a in (0..=255).step_by(17) {
            for b in (0..=255).step_by(17) {
                let s = screen(a as f32, b as f32);
                assert!(s >= a as f32 - 1e-3 && s <= 255.0);
            }
        }
        assert_eq!(screen(0.0, 0.0), 0.0);
        assert_eq!(screen(255.0, 10.0), 255.0);
    }

    #[test]
    fn extreme_settings_stay_in_range() {
        let mut frame = solid(5, 3, [250, 250, 250]);
        bloom(0.0, 2.0, 1.0).apply(&mut frame);
        assert!(frame.pixels.chunks(4).all(|px| px[3] == 255));

        let mut tiny = solid(1, 1, [255, 0, 0]);
        bloom(0.0, 2.0, 1.0).apply(&mut tiny);
        assert_eq!(tiny.pixels.len(), 4);
    }

    #[test]
    fn box_sizes_are_odd_and_grow_with_sigma() {
        let small = box_sizes(2.0, 3);
        let large = box_sizes(20.0, 3);
        assert_eq!(small.len(), 3);
        assert!(small.iter().chain(&large).all(|s| s % 2 == 1));
        assert!(large.iter().sum::<usize>() > small.iter().sum::<usize>());
    }

    #[test]
    fn blur_preserves_flat_interior() {
        let mut plane = Plane::zeros(9, 1);
        plane.data.iter_mut().for_each(|v| *v = 90.0);
        blur_horizontal(&mut plane, 1);
        assert!((plane.get(4, 0)[0] - 90.0).abs() < 1e-3);
        // edges lose energy to the zero padding
        assert!(plane.get(0, 0)[0] < 90.0);
    }
}
