use crate::assets::decode::decode_image_file;
use crate::foundation::core::{Canvas, Rgb8};
use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::foundation::math::over_opaque;
use image::RgbaImage;
use image::imageops::FilterType;
use std::path::Path;

/// A rendered frame as tightly packed, row-major RGB8 pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRgb {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGB8 bytes, `width * height * 3` long.
    pub data: Vec<u8>,
}

impl FrameRgb {
    /// Frame of the canvas size filled with one color.
    pub fn filled(canvas: Canvas, color: Rgb8) -> Self {
        let px = color.to_array();
        let mut data = Vec::with_capacity(canvas.rgb8_len());
        for _ in 0..(canvas.width as usize * canvas.height as usize) {
            data.extend_from_slice(&px);
        }
        Self {
            width: canvas.width,
            height: canvas.height,
            data,
        }
    }

    /// Frame dimensions.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        Some(Rgb8::new(self.data[i], self.data[i + 1], self.data[i + 2]))
    }

    /// Return `true` when every pixel equals `color`.
    pub fn is_solid(&self, color: Rgb8) -> bool {
        let px = color.to_array();
        self.data.chunks_exact(3).all(|c| c == px)
    }

    /// Write the frame as a PNG file.
    pub fn save_png(&self, path: &Path) -> StoryreelResult<()> {
        use anyhow::Context as _;
        image::save_buffer_with_format(
            path,
            &self.data,
            self.width,
            self.height,
            image::ColorType::Rgb8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}

/// Where a scaled source image lands on the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    /// Scaled width.
    pub width: u32,
    /// Scaled height.
    pub height: u32,
    /// Left offset.
    pub x: u32,
    /// Top offset.
    pub y: u32,
}

/// Largest aspect-preserving size of `src_w × src_h` that fits the canvas, centred.
///
/// Equivalent to `scale = min(W / w, H / h)` with the scaled size truncated, computed in
/// integers so an exact fit never loses a pixel to float error.
pub fn fit_letterbox(src_w: u32, src_h: u32, canvas: Canvas) -> StoryreelResult<Placement> {
    if src_w == 0 || src_h == 0 {
        return Err(StoryreelError::validation("source image has zero size"));
    }
    if canvas.width == 0 || canvas.height == 0 {
        return Err(StoryreelError::validation("canvas width/height must be non-zero"));
    }

    let (sw, sh) = (u64::from(src_w), u64::from(src_h));
    let (cw, ch) = (u64::from(canvas.width), u64::from(canvas.height));

    // Width-limited when W/w <= H/h.
    let (w, h) = if cw * sh <= ch * sw {
        (cw, (sh * cw / sw).clamp(1, ch))
    } else {
        ((sw * ch / sh).clamp(1, cw), ch)
    };

    let (w, h) = (w as u32, h as u32);
    Ok(Placement {
        width: w,
        height: h,
        x: (canvas.width - w) / 2,
        y: (canvas.height - h) / 2,
    })
}

/// Scale `img` into the canvas and composite it over the fill color.
///
/// Source alpha is blended over the fill so transparent regions show the letterbox color.
pub fn letterbox(img: &RgbaImage, canvas: Canvas, fill: Rgb8) -> StoryreelResult<FrameRgb> {
    let (src_w, src_h) = img.dimensions();
    let place = fit_letterbox(src_w, src_h, canvas)?;

    let resized;
    let scaled = if (place.width, place.height) == (src_w, src_h) {
        img
    } else {
        resized = image::imageops::resize(img, place.width, place.height, FilterType::Lanczos3);
        &resized
    };

    let mut frame = FrameRgb::filled(canvas, fill);
    let bg = fill.to_array();
    let stride = canvas.width as usize * 3;
    for (row, src_row) in scaled.rows().enumerate() {
        let y = place.y as usize + row;
        let start = y * stride + place.x as usize * 3;
        let dst_row = &mut frame.data[start..start + place.width as usize * 3];
        for (d, s) in dst_row.chunks_exact_mut(3).zip(src_row) {
            let [r, g, b, a] = s.0;
            if a == 255 {
                d.copy_from_slice(&[r, g, b]);
            } else {
                d[0] = over_opaque(r, a, bg[0]);
                d[1] = over_opaque(g, a, bg[1]);
                d[2] = over_opaque(b, a, bg[2]);
            }
        }
    }
    Ok(frame)
}

/// How a composed frame was produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComposeOutcome {
    /// The asset decoded and was letterboxed.
    Image,
    /// No asset was bound; solid fill.
    GapFill,
    /// The asset could not be decoded; solid fill.
    DecodeFailed,
}

/// Produces canonical frames for one render: fixed canvas, fixed fill color.
///
/// Stateless and deterministic.
#[derive(Clone, Copy, Debug)]
pub struct Compositor {
    canvas: Canvas,
    fill: Rgb8,
}

impl Compositor {
    /// Compositor for `canvas` with letterbox `fill`.
    pub fn new(canvas: Canvas, fill: Rgb8) -> StoryreelResult<Self> {
        if canvas.width == 0 || canvas.height == 0 {
            return Err(StoryreelError::validation("canvas width/height must be non-zero"));
        }
        Ok(Self { canvas, fill })
    }

    /// Output canvas.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Letterbox fill color.
    pub fn fill(&self) -> Rgb8 {
        self.fill
    }

    /// Solid fill frame.
    pub fn gap_fill(&self) -> FrameRgb {
        FrameRgb::filled(self.canvas, self.fill)
    }

    /// Compose the frame for `asset`.
    ///
    /// A missing asset or one that fails to decode yields a solid fill frame instead of an
    /// error.
    pub fn compose(&self, asset: Option<&Path>) -> (FrameRgb, ComposeOutcome) {
        let Some(path) = asset else {
            return (self.gap_fill(), ComposeOutcome::GapFill);
        };

        match decode_image_file(path).and_then(|img| letterbox(&img, self.canvas, self.fill)) {
            Ok(frame) => (frame, ComposeOutcome::Image),
            Err(e) => {
                tracing::warn!(asset = %path.display(), error = %e, "asset decode failed, using gap-fill");
                (self.gap_fill(), ComposeOutcome::DecodeFailed)
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/compose.rs"]
mod tests;
