use serde::Serialize;
use std::cmp::Ordering;

use crate::pipeline::color::{rgb_to_hsv, rgb_to_lab, Hsv, Lab, Lch};
use crate::pipeline::services::image::sampler::{PixelBuffer, Sample};

/// Sort key used for signatures classified as neutral, after every real hue.
pub const NEUTRAL_HUE: f64 = 999.0;

/// Confidence reported by the histogram and k-means achromatic fallback
pub const ACHROMATIC_CONFIDENCE: f64 = 0.1;

/// Lightness reported when there is no opaque pixel to measure
const EMPTY_LIGHTNESS: f64 = 0.5;

/// Representative color of one image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorSignature {
    /// Hue in degrees [0, 360), `None` for images classified neutral
    pub hue: Option<f64>,
    /// Colorfulness in [0, 1]
    pub chroma: f64,
    /// Brightness in [0, 1]
    pub lightness: f64,
    /// How well the signature represents the image, in [0, 1]
    pub confidence: f64,
}

impl ColorSignature {
    pub fn neutral(lightness: f64, confidence: f64) -> Self {
        Self {
            hue: None,
            chroma: 0.0,
            lightness: lightness.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn from_lch(lch: Lch, confidence: f64) -> Self {
        if lch.c <= 0.0 {
            return Self::neutral(lch.l / 100.0, confidence);
        }
        Self {
            hue: Some(lch.h),
            chroma: (lch.c / 100.0).min(1.0),
            lightness: (lch.l / 100.0).clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn from_hsv(hsv: Hsv, confidence: f64) -> Self {
        if hsv.s <= 0.0 {
            return Self::neutral(hsv.v, confidence);
        }
        Self {
            hue: Some(hsv.h),
            chroma: hsv.s.min(1.0),
            lightness: hsv.v.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn is_neutral(&self) -> bool {
        self.hue.is_none()
    }

    pub fn sort_hue(&self) -> f64 {
        self.hue.unwrap_or(NEUTRAL_HUE)
    }

    /// Hue ascending, then chroma descending, then lightness descending.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        self.sort_hue()
            .total_cmp(&other.sort_hue())
            .then_with(|| other.chroma.total_cmp(&self.chroma))
            .then_with(|| other.lightness.total_cmp(&self.lightness))
    }
}

/// A sample enriched with its perceptual coordinates.
#[derive(Debug, Clone, Copy)]
pub struct AnalyzedPixel {
    pub sample: Sample,
    pub lab: Lab,
    pub lch: Lch,
}

impl AnalyzedPixel {
    pub fn new(sample: Sample) -> Self {
        let [r, g, b] = sample.rgb;
        let lab = rgb_to_lab(r, g, b);
        Self {
            sample,
            lab,
            lch: lab.to_lch(),
        }
    }
}

pub fn analyze_pixels(pixels: &PixelBuffer) -> Vec<AnalyzedPixel> {
    pixels.samples().iter().copied().map(AnalyzedPixel::new).collect()
}

/// Index of the hue bin containing `hue`, for `bins` equal-width bins.
pub fn hue_bin(hue: f64, bins: usize) -> usize {
    let width = 360.0 / bins as f64;
    ((hue / width).floor() as usize).min(bins - 1)
}

/// Neutral signature whose lightness is the mean HSV value of the opaque pixels.
pub fn achromatic_fallback(pixels: &PixelBuffer) -> ColorSignature {
    if pixels.is_empty() {
        return ColorSignature::neutral(EMPTY_LIGHTNESS, ACHROMATIC_CONFIDENCE);
    }

    let total_value: f64 = pixels
        .samples()
        .iter()
        .map(|s| rgb_to_hsv(s.rgb[0], s.rgb[1], s.rgb[2]).v)
        .sum();

    ColorSignature::neutral(total_value / pixels.len() as f64, ACHROMATIC_CONFIDENCE)
}

/// Mean LCh lightness of all analyzed pixels, normalized to [0, 1].
pub fn mean_lightness(pixels: &[AnalyzedPixel]) -> f64 {
    if pixels.is_empty() {
        return EMPTY_LIGHTNESS;
    }
    pixels.iter().map(|p| p.lch.l).sum::<f64>() / pixels.len() as f64 / 100.0
}

/// Rounded per-channel mean of a set of colors.
pub fn average_rgb<'a>(colors: impl IntoIterator<Item = &'a [u8; 3]>) -> Option<[u8; 3]> {
    let mut sums = [0u64; 3];
    let mut count = 0u64;
    for rgb in colors {
        for channel in 0..3 {
            sums[channel] += rgb[channel] as u64;
        }
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some(sums.map(|sum| (sum as f64 / count as f64).round() as u8))
}
