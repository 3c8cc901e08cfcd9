use crate::error::EngineError;

pub const BYTES_PER_PIXEL: usize = 4;

/// Length of the level-meter snapshot taken from the processed frame.
pub const SPECTROGRAM_SIZE: usize = 1024;

/// Decoded source image. Read-only once constructed.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceFrame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl SourceFrame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, EngineError> {
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if pixels.len() != expected {
            return Err(EngineError::InvalidFrame {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Pipeline output: same dimensions as the source, alpha forced to 255.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessedFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ProcessedFrame {
    /// Opaque black frame of the given size.
    pub fn blank(width: u32, height: u32) -> Self {
        let mut pixels = vec![0u8; width as usize * height as usize * BYTES_PER_PIXEL];
        for px in pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
            px[3] = 255;
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Red channel of the first 1024 pixels, zero-padded.
    ///
    /// Raw samples for the level meter; there is no frequency analysis here.
    pub fn spectrogram(&self) -> [u8; SPECTROGRAM_SIZE] {
        let mut out = [0u8; SPECTROGRAM_SIZE];
        for (slot, px) in out
            .iter_mut()
            .zip(self.pixels.chunks_exact(BYTES_PER_PIXEL))
        {
            *slot = px[0];
        }
        out
    }

    pub fn into_rgba_image(self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.pixels)
    }
}

/// Round and clamp a channel value into `[0, 255]`.
#[inline]
pub fn clamp_channel(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 255.0) as u8
}
