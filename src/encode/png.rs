use anyhow::{Context, Result};
use image::imageops::FilterType;
use std::path::Path;

use crate::render::frame::{ProcessedFrame, SourceFrame};

/// Fit `(width, height)` inside a `max x max` box, keeping the aspect ratio.
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if max == 0 || (width <= max && height <= max) {
        return (width, height);
    }
    if width > height {
        let h = (height as f64 / width as f64 * max as f64).round() as u32;
        (max, h.max(1))
    } else {
        let w = (width as f64 / height as f64 * max as f64).round() as u32;
        (w.max(1), max)
    }
}

pub fn source_from_image(img: image::DynamicImage, max_dimension: u32) -> Result<SourceFrame> {
    let (w, h) = fit_within(img.width(), img.height(), max_dimension);
    let img = if (w, h) != (img.width(), img.height()) {
        log::info!(
            "Downscaling {}x{} to {}x{}",
            img.width(),
            img.height(),
            w,
            h
        );
        img.resize_exact(w, h, FilterType::Triangle)
    } else {
        img
    };
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(SourceFrame::new(width, height, rgba.into_raw())?)
}

pub fn load_source(path: &Path, max_dimension: u32) -> Result<SourceFrame> {
    let img = image::open(path)
        .with_context(|| format!("Failed to decode image: {}", path.display()))?;
    source_from_image(img, max_dimension)
}

pub fn save_png(frame: &ProcessedFrame, path: &Path) -> Result<()> {
    let img = frame
        .clone()
        .into_rgba_image()
        .context("Processed frame buffer does not match its dimensions")?;
    img.save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("Failed to write PNG: {}", path.display()))?;
    log::info!("Wrote {} ({}x{})", path.display(), frame.width, frame.height);
    Ok(())
}
