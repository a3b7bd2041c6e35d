// ============================================================================
// TRANSFORM OPERATIONS: flip, rotate, resize, display scaling
// ============================================================================

use std::fmt;
use std::str::FromStr;

use image::imageops;

use crate::canvas::PixelBuffer;
use crate::error::{EngineError, Result};

/// Interpolation method for resize operations.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
    Bicubic,
    Lanczos3,
}

impl Interpolation {
    pub fn label(&self) -> &'static str {
        match self {
            Interpolation::Nearest  => "nearest",
            Interpolation::Bilinear => "bilinear",
            Interpolation::Bicubic  => "bicubic",
            Interpolation::Lanczos3 => "lanczos3",
        }
    }

    pub fn all() -> &'static [Interpolation] {
        &[
            Interpolation::Nearest,
            Interpolation::Bilinear,
            Interpolation::Bicubic,
            Interpolation::Lanczos3,
        ]
    }

    pub fn to_filter(&self) -> imageops::FilterType {
        match self {
            Interpolation::Nearest  => imageops::FilterType::Nearest,
            Interpolation::Bilinear => imageops::FilterType::Triangle,
            Interpolation::Bicubic  => imageops::FilterType::CatmullRom,
            Interpolation::Lanczos3 => imageops::FilterType::Lanczos3,
        }
    }
}

impl FromStr for Interpolation {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_lowercase();
        Interpolation::all()
            .iter()
            .copied()
            .find(|i| i.label() == key)
            .ok_or_else(|| EngineError::InvalidCommand(format!("unknown interpolation '{}'", s)))
    }
}

/// Mirror axis for [`flip`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    /// Mirror left↔right.
    Horizontal,
    /// Mirror top↔bottom.
    Vertical,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Horizontal => f.write_str("horizontal"),
            Axis::Vertical   => f.write_str("vertical"),
        }
    }
}

// ---------------------------------------------------------------------------
//  Whole-buffer transforms
// ---------------------------------------------------------------------------

pub fn flip(buffer: &PixelBuffer, axis: Axis) -> PixelBuffer {
    match axis {
        Axis::Horizontal => flip_horizontal(buffer),
        Axis::Vertical   => flip_vertical(buffer),
    }
}

/// Flip horizontally (mirror left↔right).
pub fn flip_horizontal(buffer: &PixelBuffer) -> PixelBuffer {
    PixelBuffer::from_rgb_image(imageops::flip_horizontal(buffer.as_rgb_image()))
}

/// Flip vertically (mirror top↔bottom).
pub fn flip_vertical(buffer: &PixelBuffer) -> PixelBuffer {
    PixelBuffer::from_rgb_image(imageops::flip_vertical(buffer.as_rgb_image()))
}

/// Rotate 90° clockwise (swaps W↔H).
pub fn rotate_90(buffer: &PixelBuffer) -> PixelBuffer {
    PixelBuffer::from_rgb_image(imageops::rotate90(buffer.as_rgb_image()))
}

pub fn rotate_180(buffer: &PixelBuffer) -> PixelBuffer {
    PixelBuffer::from_rgb_image(imageops::rotate180(buffer.as_rgb_image()))
}

/// Rotate 90° counter-clockwise (swaps W↔H).
pub fn rotate_270(buffer: &PixelBuffer) -> PixelBuffer {
    PixelBuffer::from_rgb_image(imageops::rotate270(buffer.as_rgb_image()))
}

/// Resample to exactly `new_w`×`new_h`.
pub fn resize(buffer: &PixelBuffer, new_w: u32, new_h: u32, interp: Interpolation) -> Result<PixelBuffer> {
    if new_w == 0 || new_h == 0 {
        return Err(EngineError::InvalidDimensions {
            width: new_w,
            height: new_h,
            reason: "resize target must be non-zero".to_string(),
        });
    }
    if buffer.is_empty() {
        return Err(EngineError::InvalidDimensions {
            width: buffer.width(),
            height: buffer.height(),
            reason: "cannot resample an empty image".to_string(),
        });
    }
    let resized = imageops::resize(buffer.as_rgb_image(), new_w, new_h, interp.to_filter());
    Ok(PixelBuffer::from_rgb_image(resized))
}

// ---------------------------------------------------------------------------
//  Display scaling (presentation only, never recorded in history)
// ---------------------------------------------------------------------------

/// Target size for fitting `w`×`h` into a `box_w`×`box_h` box, preserving the
/// aspect ratio: whichever edge overflows more is pinned to the box.
pub fn fit_dimensions(w: u32, h: u32, box_w: u32, box_h: u32) -> (u32, u32) {
    let (wf, hf) = (w as f32, h as f32);
    let (new_w, new_h) = if wf / box_w as f32 > hf / box_h as f32 {
        let new_w = box_w;
        (new_w, (hf / wf * new_w as f32) as u32)
    } else {
        let new_h = box_h;
        ((wf / hf * new_h as f32) as u32, new_h)
    };
    (new_w.max(1), new_h.max(1))
}

/// Scale `buffer` to fit a display box using bicubic resampling.
pub fn fit_to_box(buffer: &PixelBuffer, box_w: u32, box_h: u32) -> Result<PixelBuffer> {
    if box_w == 0 || box_h == 0 {
        return Err(EngineError::InvalidDimensions {
            width: box_w,
            height: box_h,
            reason: "display box must be non-zero".to_string(),
        });
    }
    let (new_w, new_h) = fit_dimensions(buffer.width(), buffer.height(), box_w, box_h);
    resize(buffer, new_w, new_h, Interpolation::Bicubic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// 3×2 buffer with a unique value per pixel.
    fn numbered() -> PixelBuffer {
        let mut buf = PixelBuffer::new(3, 2);
        for y in 0..2 {
            for x in 0..3 {
                let v = (y * 3 + x) as u8;
                buf.set(x, y, Rgb([v, v, v])).unwrap();
            }
        }
        buf
    }

    fn value(buf: &PixelBuffer, x: u32, y: u32) -> u8 {
        buf.get(x, y).unwrap().0[0]
    }

    #[test]
    fn flips_mirror_the_right_axis() {
        let src = numbered();
        let h = flip(&src, Axis::Horizontal);
        assert_eq!(value(&h, 0, 0), 2);
        assert_eq!(value(&h, 2, 1), 3);

        let v = flip(&src, Axis::Vertical);
        assert_eq!(value(&v, 0, 0), 3);
        assert_eq!(value(&v, 2, 1), 2);
    }

    #[test]
    fn rotate_90_is_clockwise() {
        let r = rotate_90(&numbered());
        assert_eq!(r.dimensions(), (2, 3));
        // Bottom-left of the source lands top-left.
        assert_eq!(value(&r, 0, 0), 3);
        assert_eq!(value(&r, 1, 0), 0);
    }

    #[test]
    fn four_quarter_turns_are_identity() {
        let src = numbered();
        let back = rotate_90(&rotate_90(&rotate_90(&rotate_90(&src))));
        assert_eq!(back, src);
        assert_eq!(rotate_270(&rotate_90(&src)), src);
        assert_eq!(rotate_180(&rotate_180(&src)), src);
    }

    #[test]
    fn resize_changes_dimensions() {
        let out = resize(&numbered(), 6, 4, Interpolation::Nearest).unwrap();
        assert_eq!(out.dimensions(), (6, 4));
        assert!(matches!(
            resize(&numbered(), 0, 4, Interpolation::Bilinear),
            Err(EngineError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn fit_pins_the_overflowing_edge() {
        assert_eq!(fit_dimensions(400, 200, 100, 100), (100, 50));
        assert_eq!(fit_dimensions(200, 400, 100, 100), (50, 100));
        assert_eq!(fit_dimensions(1000, 1, 10, 10), (10, 1));
        let shown = fit_to_box(&numbered(), 30, 30).unwrap();
        assert_eq!(shown.dimensions(), (30, 20));
    }

    #[test]
    fn interpolation_parses_labels() {
        assert_eq!("Bicubic".parse::<Interpolation>().unwrap(), Interpolation::Bicubic);
        assert!("smooth".parse::<Interpolation>().is_err());
    }
}
