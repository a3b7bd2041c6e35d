// ============================================================================
// PIXEL BUFFER: fixed-size RGB raster the whole engine operates on
// ============================================================================

use image::{Rgb, RgbImage};

use crate::error::{EngineError, Result};

/// One RGB pixel. Channels are `u8`, so `[0, 255]` holds by construction.
pub type Color = Rgb<u8>;

/// Bytes per pixel in the packed row-major layout.
pub const CHANNELS: usize = 3;

/// A width×height grid of RGB pixels stored row-major in one contiguous
/// allocation.
///
/// Dimensions never change after construction. Operations that produce a
/// different image always return a new buffer, so a snapshot held elsewhere
/// (e.g. by the history stack) can never be mutated behind its owner's back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    image: RgbImage,
}

impl PixelBuffer {
    // ---- construction -------------------------------------------------------

    /// Create a zero-initialised (black) buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self { image: RgbImage::new(width, height) }
    }

    /// Create a buffer with every pixel set to `color`.
    pub fn new_filled(width: u32, height: u32, color: Color) -> Self {
        Self { image: RgbImage::from_pixel(width, height, color) }
    }

    /// Wrap packed RGB bytes. The length must be exactly `width * height * 3`.
    pub fn from_raw(width: u32, height: u32, raw: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if raw.len() != expected {
            return Err(EngineError::InvalidDimensions {
                width,
                height,
                reason: format!("expected {} bytes, got {}", expected, raw.len()),
            });
        }
        RgbImage::from_raw(width, height, raw)
            .map(|image| Self { image })
            .ok_or_else(|| EngineError::InvalidDimensions {
                width,
                height,
                reason: "buffer rejected by image container".to_string(),
            })
    }

    /// Build from a row-major list of pixels.
    pub fn from_pixels(width: u32, height: u32, pixels: &[Color]) -> Result<Self> {
        let raw: Vec<u8> = pixels.iter().flat_map(|p| p.0).collect();
        Self::from_raw(width, height, raw)
    }

    /// Import a decoded `image` crate raster.
    pub fn from_rgb_image(image: RgbImage) -> Self {
        Self { image }
    }

    // ---- access -------------------------------------------------------------

    pub fn width(&self) -> u32 { self.image.width() }

    pub fn height(&self) -> u32 { self.image.height() }

    pub fn dimensions(&self) -> (u32, u32) { self.image.dimensions() }

    /// True when either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// Bytes in one packed row.
    pub fn stride(&self) -> usize {
        self.width() as usize * CHANNELS
    }

    /// Read one pixel.
    pub fn get(&self, x: u32, y: u32) -> Result<Color> {
        self.check_bounds(x, y)?;
        Ok(*self.image.get_pixel(x, y))
    }

    /// Overwrite one pixel.
    pub fn set(&mut self, x: u32, y: u32, color: Color) -> Result<()> {
        self.check_bounds(x, y)?;
        self.image.put_pixel(x, y, color);
        Ok(())
    }

    #[inline]
    fn check_bounds(&self, x: u32, y: u32) -> Result<()> {
        if x >= self.width() || y >= self.height() {
            return Err(EngineError::OutOfBounds {
                x,
                y,
                width: self.width(),
                height: self.height(),
            });
        }
        Ok(())
    }

    /// Packed row-major RGB bytes.
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Borrow the underlying raster (for `imageops` and encoders).
    pub fn as_rgb_image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_rgb_image(self) -> RgbImage {
        self.image
    }

    /// Iterate over packed rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        let stride = self.stride().max(1);
        self.image.as_raw().chunks_exact(stride)
    }

    /// Iterate over all pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = Color> + '_ {
        self.image.pixels().copied()
    }

    /// Approximate heap size of the pixel data.
    pub fn memory_bytes(&self) -> usize {
        self.image.as_raw().len()
    }

    // ---- statistics ---------------------------------------------------------

    /// Mean over all pixels of `(R + G + B) / 3`.
    ///
    /// Channel sums are accumulated exactly as integers, so the result does not
    /// depend on summation order. A zero-area buffer has mean 0.
    pub fn average_intensity(&self) -> f64 {
        let count = self.pixel_count();
        if count == 0 {
            return 0.0;
        }
        let total: u64 = self.as_raw().iter().map(|&c| c as u64).sum();
        total as f64 / 3.0 / count as f64
    }
}
