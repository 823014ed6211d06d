use anyhow::Context;
use image::RgbaImage;
use std::path::Path;

use crate::foundation::error::StoryreelResult;

/// Decode encoded image bytes into straight-alpha RGBA8.
pub fn decode_image(bytes: &[u8]) -> StoryreelResult<RgbaImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    Ok(dyn_img.to_rgba8())
}

/// Read and decode an image file, guessing the format from its contents.
pub fn decode_image_file(path: &Path) -> StoryreelResult<RgbaImage> {
    let reader = image::ImageReader::open(path)
        .with_context(|| format!("open image '{}'", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("sniff image format '{}'", path.display()))?;
    let dyn_img = reader
        .decode()
        .with_context(|| format!("decode image '{}'", path.display()))?;
    Ok(dyn_img.to_rgba8())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
