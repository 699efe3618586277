//! Perceptually weighted hue histogram.
//!
//! Pixels are weighted by how colorful they are, how close they sit to the
//! image center and how mid-tone they are. Near-gray pixels vote for a neutral
//! classification instead, which a small vivid accent can still override.
use tracing::debug;

use super::config::PerceptualParams;
use super::core::{analyze_pixels, hue_bin, mean_lightness, ColorSignature};
use crate::pipeline::color::Lab;
use crate::pipeline::services::image::sampler::PixelBuffer;

/// Confidence reported for images classified neutral
pub const NEUTRAL_CONFIDENCE: f64 = 0.2;

/// Circular smoothing kernel applied to the weight histogram
const SMOOTHING_KERNEL: [f64; 3] = [0.25, 0.5, 0.25];

#[derive(Debug, Clone, Copy, Default)]
struct WeightedBin {
    weight: f64,
    weighted_a: f64,
    weighted_b: f64,
    weighted_l: f64,
    chroma_sum: f64,
    count: usize,
}

impl WeightedBin {
    fn average_chroma(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.chroma_sum / self.count as f64
        }
    }

    fn centroid(&self) -> Lab {
        Lab {
            l: self.weighted_l / self.weight,
            a: self.weighted_a / self.weight,
            b: self.weighted_b / self.weight,
        }
    }
}

/// Soft ramp from 0 (gray) to 1 (clearly colored).
fn neutrality_mask(chroma: f64, params: &PerceptualParams) -> f64 {
    ((chroma - params.mask_low) / (params.mask_high - params.mask_low)).clamp(0.0, 1.0)
}

fn center_weight(dx: f64, dy: f64, sigma_sq: f64) -> f64 {
    (-(dx * dx + dy * dy) / (2.0 * sigma_sq)).exp()
}

/// Favors mid-tones: 1.0 at L = 50, 0.7 at pure black or white.
fn lightness_weight(lightness: f64) -> f64 {
    let normalized = lightness / 100.0;
    0.7 + 0.3 * (1.0 - (normalized - 0.5).abs() / 0.5)
}

fn smooth_circular(weights: &[f64]) -> Vec<f64> {
    let n = weights.len();
    (0..n)
        .map(|i| {
            let prev = weights[(i + n - 1) % n];
            let next = weights[(i + 1) % n];
            SMOOTHING_KERNEL[0] * prev + SMOOTHING_KERNEL[1] * weights[i] + SMOOTHING_KERNEL[2] * next
        })
        .collect()
}

pub fn analyze(pixels: &PixelBuffer, params: &PerceptualParams, bins: usize) -> ColorSignature {
    let analyzed = analyze_pixels(pixels);
    let total_pixels = analyzed.len();
    if total_pixels == 0 {
        return ColorSignature::neutral(mean_lightness(&analyzed), NEUTRAL_CONFIDENCE);
    }

    let mut histogram = vec![WeightedBin::default(); bins];
    let mut neutral_weight = 0.0;
    let mut total_weight = 0.0;

    for pixel in &analyzed {
        let mask = neutrality_mask(pixel.lch.c, params);
        if mask < params.mask_floor {
            neutral_weight += 1.0;
            continue;
        }

        let (dx, dy) = pixels.normalized_offset(&pixel.sample);
        let weight = mask
            * center_weight(dx, dy, params.center_sigma_sq)
            * lightness_weight(pixel.lch.l)
            * pixel.lch.c
            * pixel.lch.c;

        let bin = &mut histogram[hue_bin(pixel.lch.h, bins)];
        bin.weight += weight;
        bin.weighted_a += weight * pixel.lab.a;
        bin.weighted_b += weight * pixel.lab.b;
        bin.weighted_l += weight * pixel.lab.l;
        bin.chroma_sum += pixel.lch.c;
        bin.count += 1;
        total_weight += weight;
    }

    let neutral = || ColorSignature::neutral(mean_lightness(&analyzed), NEUTRAL_CONFIDENCE);

    if total_weight <= 0.0 {
        return neutral();
    }

    let weights: Vec<f64> = histogram.iter().map(|b| b.weight).collect();
    let smoothed = smooth_circular(&weights);
    let mut dominant = 0;
    for (index, weight) in smoothed.iter().enumerate() {
        if *weight > smoothed[dominant] {
            dominant = index;
        }
    }

    let dominant_bin = histogram[dominant];
    let dominant_share = dominant_bin.weight / total_weight;
    let neutral_ratio = neutral_weight / total_pixels as f64;

    if neutral_ratio > params.neutral_ratio {
        let pop_color =
            dominant_share > params.pop_share && dominant_bin.average_chroma() > params.pop_chroma;
        if !pop_color {
            debug!(
                "Classified neutral: {:.0}% near-gray pixels, dominant share {:.2}",
                neutral_ratio * 100.0,
                dominant_share
            );
            return neutral();
        }
        debug!(
            "Pop color override in bin {} (share {:.2}, chroma {:.1})",
            dominant,
            dominant_share,
            dominant_bin.average_chroma()
        );
    }

    // a smoothed peak can land on a bin with no pixels of its own
    if dominant_bin.weight <= 0.0 {
        return neutral();
    }

    let lch = dominant_bin.centroid().to_lch();
    ColorSignature::from_lch(lch, (2.0 * dominant_share).min(1.0))
}
