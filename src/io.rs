// ============================================================================
// IMAGE I/O: decode/encode PNG, JPEG and BMP
// ============================================================================

use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, ImageFormat};

use crate::canvas::PixelBuffer;
use crate::error::{EngineError, Result};
use crate::log_info;

/// Default JPEG quality when none is configured.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Raster formats the engine reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SaveFormat {
    #[default]
    Png,
    Jpeg,
    Bmp,
}

impl SaveFormat {
    pub fn all() -> &'static [SaveFormat] {
        &[SaveFormat::Png, SaveFormat::Jpeg, SaveFormat::Bmp]
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Png  => "png",
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Bmp  => "bmp",
        }
    }

    /// Map a file extension or format hint (`jpg|jpeg|png|bmp`, any case,
    /// optional leading dot) to a format.
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.trim().trim_start_matches('.').to_lowercase().as_str() {
            "png"          => Ok(SaveFormat::Png),
            "jpg" | "jpeg" => Ok(SaveFormat::Jpeg),
            "bmp"          => Ok(SaveFormat::Bmp),
            other          => Err(EngineError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Format implied by a path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| EngineError::UnsupportedFormat(path.display().to_string()))?;
        Self::from_extension(ext)
    }

    pub fn is_lossless(&self) -> bool {
        !matches!(self, SaveFormat::Jpeg)
    }

    fn image_format(&self) -> ImageFormat {
        match self {
            SaveFormat::Png  => ImageFormat::Png,
            SaveFormat::Jpeg => ImageFormat::Jpeg,
            SaveFormat::Bmp  => ImageFormat::Bmp,
        }
    }
}

// ============================================================================
// DECODE
// ============================================================================

/// Decode raw file bytes using a format hint. Alpha, if present, is dropped.
pub fn decode(bytes: &[u8], hint: &str) -> Result<PixelBuffer> {
    let format = SaveFormat::from_extension(hint)?;
    let img = image::load_from_memory_with_format(bytes, format.image_format())?;
    Ok(PixelBuffer::from_rgb_image(img.to_rgb8()))
}

/// Load an image file, picking the decoder from its extension.
pub fn load_image(path: &Path) -> Result<PixelBuffer> {
    let format = SaveFormat::from_path(path)?;
    let bytes = std::fs::read(path)?;
    let buffer = decode(&bytes, format.extension())?;
    log_info!(
        "Loaded {} ({}x{}, {:?})",
        path.display(),
        buffer.width(),
        buffer.height(),
        format
    );
    Ok(buffer)
}

// ============================================================================
// ENCODE
// ============================================================================

/// Encode into an arbitrary writer.
pub fn encode_to<W: Write>(
    buffer: &PixelBuffer,
    writer: W,
    format: SaveFormat,
    quality: u8,
) -> Result<()> {
    let (w, h) = buffer.dimensions();
    if buffer.is_empty() {
        return Err(EngineError::InvalidDimensions {
            width: w,
            height: h,
            reason: "cannot encode an empty image".to_string(),
        });
    }

    match format {
        SaveFormat::Png => {
            PngEncoder::new(writer).write_image(buffer.as_raw(), w, h, ColorType::Rgb8)?;
        }
        SaveFormat::Jpeg => {
            let quality = quality.clamp(1, 100);
            JpegEncoder::new_with_quality(writer, quality)
                .write_image(buffer.as_raw(), w, h, ColorType::Rgb8)?;
        }
        SaveFormat::Bmp => {
            let mut writer = writer;
            BmpEncoder::new(&mut writer).write_image(buffer.as_raw(), w, h, ColorType::Rgb8)?;
        }
    }
    Ok(())
}

/// Encode into an in-memory byte vector.
pub fn encode(buffer: &PixelBuffer, format: SaveFormat, quality: u8) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    encode_to(buffer, &mut out, format, quality)?;
    Ok(out.into_inner())
}

/// Encode using an extension string; unknown extensions are rejected.
pub fn encode_as(buffer: &PixelBuffer, extension: &str, quality: u8) -> Result<Vec<u8>> {
    encode(buffer, SaveFormat::from_extension(extension)?, quality)
}

/// Encode and write to `path`, choosing the format from its extension.
pub fn save_image(buffer: &PixelBuffer, path: &Path, quality: u8) -> Result<()> {
    let format = SaveFormat::from_path(path)?;
    save_image_as(buffer, path, format, quality)
}

/// Encode and write to `path` in an explicit format.
pub fn save_image_as(buffer: &PixelBuffer, path: &Path, format: SaveFormat, quality: u8) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    encode_to(buffer, &mut writer, format, quality)?;
    writer.flush()?;
    log_info!("Saved {} as {:?}", path.display(), format);
    Ok(())
}
