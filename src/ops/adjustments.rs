// ============================================================================
// ADJUSTMENT CATALOG: the fixed set of per-pixel color mappings
// ============================================================================
//
// Every mapping is a plain function pointer with no captured state, so the
// executor can call it from any number of workers without synchronisation.
// The numeric constants are literal and intentionally not configurable.
// Float → int conversions truncate toward zero (`as i32`) before clamping.
// ============================================================================

use std::fmt;
use std::str::FromStr;

use image::Rgb;

use crate::canvas::{Color, PixelBuffer};
use crate::error::EngineError;

/// Fixed brightness step for the high/low brightness filters.
pub const BRIGHTNESS_DELTA: i32 = 5;
/// Multiplier used by the "high" contrast and grayscale variants.
pub const HIGH_FACTOR: f64 = 1.1;
/// Multiplier used by the "low" contrast and grayscale variants.
pub const LOW_FACTOR: f64 = 0.9;
/// Additive per-channel offsets for color correction (R, G, B).
pub const COLOR_CORRECTION_OFFSETS: [i32; 3] = [20, 10, 5];

/// Clamp an integer channel value into `[0, 255]`.
#[inline]
pub fn clamp_channel(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// How a filter maps source pixels to destination pixels.
#[derive(Clone, Copy)]
pub enum FilterDescriptor {
    /// Pure `Color → Color` mapping.
    Pixel(fn(Color) -> Color),
    /// Two-phase mapping: `statistic` is computed once from the untouched
    /// source, then `map` is applied to every pixel with that value.
    WithStatistic {
        statistic: fn(&PixelBuffer) -> f64,
        map: fn(f64, Color) -> Color,
    },
}

impl fmt::Debug for FilterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterDescriptor::Pixel(_) => f.write_str("Pixel"),
            FilterDescriptor::WithStatistic { .. } => f.write_str("WithStatistic"),
        }
    }
}

/// Every filter the engine knows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Filter {
    Invert,
    BlackAndWhite,
    Sepia,
    GreenBoost,
    BlueDim,
    BrightnessHigh,
    BrightnessLow,
    ContrastHigh,
    ContrastLow,
    GrayscaleHigh,
    GrayscaleLow,
    ColorCorrection,
}

impl Filter {
    pub fn all() -> &'static [Filter] {
        &[
            Filter::Invert,
            Filter::BlackAndWhite,
            Filter::Sepia,
            Filter::GreenBoost,
            Filter::BlueDim,
            Filter::BrightnessHigh,
            Filter::BrightnessLow,
            Filter::ContrastHigh,
            Filter::ContrastLow,
            Filter::GrayscaleHigh,
            Filter::GrayscaleLow,
            Filter::ColorCorrection,
        ]
    }

    /// Kebab-case name used on the command line and in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Filter::Invert          => "invert",
            Filter::BlackAndWhite   => "black-and-white",
            Filter::Sepia           => "sepia",
            Filter::GreenBoost      => "green-boost",
            Filter::BlueDim         => "blue-dim",
            Filter::BrightnessHigh  => "brightness-high",
            Filter::BrightnessLow   => "brightness-low",
            Filter::ContrastHigh    => "contrast-high",
            Filter::ContrastLow     => "contrast-low",
            Filter::GrayscaleHigh   => "grayscale-high",
            Filter::GrayscaleLow    => "grayscale-low",
            Filter::ColorCorrection => "color-correction",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Filter::Invert          => "Invert",
            Filter::BlackAndWhite   => "Black & White",
            Filter::Sepia           => "Sepia",
            Filter::GreenBoost      => "Green Boost",
            Filter::BlueDim         => "Blue Dim",
            Filter::BrightnessHigh  => "Brightness +",
            Filter::BrightnessLow   => "Brightness -",
            Filter::ContrastHigh    => "Contrast +",
            Filter::ContrastLow     => "Contrast -",
            Filter::GrayscaleHigh   => "Grayscale +",
            Filter::GrayscaleLow    => "Grayscale -",
            Filter::ColorCorrection => "Color Correction",
        }
    }

    pub fn descriptor(&self) -> FilterDescriptor {
        match self {
            Filter::Invert          => FilterDescriptor::Pixel(invert),
            Filter::BlackAndWhite   => FilterDescriptor::Pixel(black_and_white),
            Filter::Sepia           => FilterDescriptor::Pixel(sepia),
            Filter::GreenBoost      => FilterDescriptor::Pixel(green_boost),
            Filter::BlueDim         => FilterDescriptor::Pixel(blue_dim),
            Filter::BrightnessHigh  => FilterDescriptor::Pixel(brightness_high),
            Filter::BrightnessLow   => FilterDescriptor::Pixel(brightness_low),
            Filter::ContrastHigh    => FilterDescriptor::WithStatistic {
                statistic: PixelBuffer::average_intensity,
                map: contrast_high,
            },
            Filter::ContrastLow     => FilterDescriptor::WithStatistic {
                statistic: PixelBuffer::average_intensity,
                map: contrast_low,
            },
            Filter::GrayscaleHigh   => FilterDescriptor::Pixel(grayscale_high),
            Filter::GrayscaleLow    => FilterDescriptor::Pixel(grayscale_low),
            Filter::ColorCorrection => FilterDescriptor::Pixel(color_correction),
        }
    }

    pub fn needs_statistic(&self) -> bool {
        matches!(self.descriptor(), FilterDescriptor::WithStatistic { .. })
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Filter {
    type Err = EngineError;

    /// Case-insensitive; `_` and spaces are accepted in place of `-`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace(['_', ' '], "-");
        Filter::all()
            .iter()
            .copied()
            .find(|f| f.name() == key)
            .ok_or_else(|| EngineError::UnknownFilter(s.to_string()))
    }
}

// ============================================================================
// PER-PIXEL MAPPINGS
// ============================================================================

pub fn invert(c: Color) -> Color {
    let [r, g, b] = c.0;
    Rgb([255 - r, 255 - g, 255 - b])
}

/// Integer average of the three channels.
pub fn black_and_white(c: Color) -> Color {
    let [r, g, b] = c.0;
    let avg = ((r as u16 + g as u16 + b as u16) / 3) as u8;
    Rgb([avg, avg, avg])
}

pub fn sepia(c: Color) -> Color {
    let [r, g, b] = c.0;
    let (r, g, b) = (r as f64, g as f64, b as f64);
    let sr = (r * 0.393 + g * 0.769 + b * 0.189) as i32;
    let sg = (r * 0.349 + g * 0.686 + b * 0.168) as i32;
    let sb = (r * 0.272 + g * 0.534 + b * 0.131) as i32;
    Rgb([sr.min(255) as u8, sg.min(255) as u8, sb.min(255) as u8])
}

pub fn green_boost(c: Color) -> Color {
    let [r, g, b] = c.0;
    let boosted = ((g as f64 * 1.5) as i32).min(255) as u8;
    Rgb([r, boosted, b])
}

pub fn blue_dim(c: Color) -> Color {
    let [r, g, b] = c.0;
    Rgb([r / 2, g / 2, b])
}

fn shift_brightness(c: Color, delta: i32) -> Color {
    let [r, g, b] = c.0;
    Rgb([
        clamp_channel(r as i32 + delta),
        clamp_channel(g as i32 + delta),
        clamp_channel(b as i32 + delta),
    ])
}

pub fn brightness_high(c: Color) -> Color {
    shift_brightness(c, BRIGHTNESS_DELTA)
}

pub fn brightness_low(c: Color) -> Color {
    shift_brightness(c, -BRIGHTNESS_DELTA)
}

/// Stretch one channel away from (or toward) the image's mean intensity.
#[inline]
fn contrast_channel(channel: u8, average: f64, factor: f64) -> u8 {
    clamp_channel(((channel as f64 - average) * factor + average) as i32)
}

fn scale_contrast(average: f64, c: Color, factor: f64) -> Color {
    let [r, g, b] = c.0;
    Rgb([
        contrast_channel(r, average, factor),
        contrast_channel(g, average, factor),
        contrast_channel(b, average, factor),
    ])
}

pub fn contrast_high(average: f64, c: Color) -> Color {
    scale_contrast(average, c, HIGH_FACTOR)
}

pub fn contrast_low(average: f64, c: Color) -> Color {
    scale_contrast(average, c, LOW_FACTOR)
}

/// Luma-weighted grey, truncated, then scaled by `factor`.
fn scaled_luma(c: Color, factor: f64) -> Color {
    let [r, g, b] = c.0;
    let lum = (0.3 * r as f64 + 0.59 * g as f64 + 0.11 * b as f64) as i32;
    let v = clamp_channel((lum as f64 * factor) as i32);
    Rgb([v, v, v])
}

pub fn grayscale_high(c: Color) -> Color {
    scaled_luma(c, HIGH_FACTOR)
}

pub fn grayscale_low(c: Color) -> Color {
    scaled_luma(c, LOW_FACTOR)
}

pub fn color_correction(c: Color) -> Color {
    let [r, g, b] = c.0;
    let [dr, dg, db] = COLOR_CORRECTION_OFFSETS;
    Rgb([
        clamp_channel(r as i32 + dr),
        clamp_channel(g as i32 + dg),
        clamp_channel(b as i32 + db),
    ])
}
