//! Hue histogram strategy: count x average chroma per bin.
use super::core::{
    achromatic_fallback, analyze_pixels, average_rgb, hue_bin, AnalyzedPixel, ColorSignature,
};
use crate::pipeline::color::rgb_to_lch;
use crate::pipeline::services::image::sampler::PixelBuffer;

#[derive(Debug, Clone, Default)]
struct HueBin<'a> {
    pixels: Vec<&'a AnalyzedPixel>,
    total_chroma: f64,
}

impl HueBin<'_> {
    fn score(&self) -> f64 {
        if self.pixels.is_empty() {
            return 0.0;
        }
        // count * mean chroma
        self.pixels.len() as f64 * (self.total_chroma / self.pixels.len() as f64)
    }
}

pub fn analyze(pixels: &PixelBuffer, min_chroma: f64, bins: usize) -> ColorSignature {
    let analyzed = analyze_pixels(pixels);
    let qualifying: Vec<&AnalyzedPixel> = analyzed.iter().filter(|p| p.lch.c > min_chroma).collect();

    if qualifying.is_empty() {
        return achromatic_fallback(pixels);
    }

    let mut histogram: Vec<HueBin> = vec![HueBin::default(); bins];
    for &pixel in &qualifying {
        let bin = &mut histogram[hue_bin(pixel.lch.h, bins)];
        bin.pixels.push(pixel);
        bin.total_chroma += pixel.lch.c;
    }

    let mut dominant = 0;
    let mut best_score = 0.0;
    for (index, bin) in histogram.iter().enumerate() {
        let score = bin.score();
        if score > best_score {
            best_score = score;
            dominant = index;
        }
    }

    let dominant_pixels = &histogram[dominant].pixels;
    let Some([r, g, b]) = average_rgb(dominant_pixels.iter().map(|p| &p.sample.rgb)) else {
        return achromatic_fallback(pixels);
    };

    let confidence = (2.0 * dominant_pixels.len() as f64 / qualifying.len() as f64).min(1.0);
    ColorSignature::from_lch(rgb_to_lch(r, g, b), confidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba, RgbaImage};

    fn buffer(image: RgbaImage) -> PixelBuffer {
        PixelBuffer::from_rgba(&image, 128)
    }

    fn striped(width: u32, height: u32, colors: &[([u8; 3], u32)]) -> PixelBuffer {
        // each color fills `share` consecutive columns out of `width`
        let mut columns = Vec::new();
        for (rgb, share) in colors {
            columns.extend(std::iter::repeat(*rgb).take(*share as usize));
        }
        buffer(ImageBuffer::from_fn(width, height, |x, _| {
            let [r, g, b] = columns[x as usize];
            Rgba([r, g, b, 255])
        }))
    }

    #[test]
    fn solid_red_reports_red_hue() {
        let pixels = buffer(ImageBuffer::from_pixel(8, 8, Rgba([255, 0, 0, 255])));
        let sig = analyze(&pixels, 8.0, 18);
        assert!((sig.hue.unwrap() - 40.0).abs() < 0.01);
        assert_eq!(sig.chroma, 1.0);
        assert!((sig.lightness - 0.5323).abs() < 0.001);
        assert_eq!(sig.confidence, 1.0);
    }

    #[test]
    fn larger_colored_area_wins_and_sets_confidence() {
        // 70% green, 30% blue
        let pixels = striped(10, 4, &[([0, 200, 0], 7), ([0, 0, 255], 3)]);
        let sig = analyze(&pixels, 8.0, 18);
        assert!((sig.hue.unwrap() - 136.0).abs() < 0.1);
        assert_eq!(sig.confidence, 1.0);

        // 40% green, 30% yellow, 30% orange: green wins, confidence 0.8
        let pixels = striped(
            10,
            4,
            &[([0, 200, 0], 4), ([200, 200, 0], 3), ([255, 140, 0], 3)],
        );
        let sig = analyze(&pixels, 8.0, 18);
        assert!((sig.hue.unwrap() - 136.0).abs() < 0.1);
        assert!((sig.confidence - 0.8).abs() < 1e-12);
    }

    #[test]
    fn gray_image_falls_back_to_mean_value() {
        let pixels = buffer(ImageBuffer::from_pixel(6, 6, Rgba([51, 51, 51, 255])));
        let sig = analyze(&pixels, 8.0, 18);
        assert!(sig.is_neutral());
        assert_eq!(sig.chroma, 0.0);
        assert!((sig.lightness - 0.2).abs() < 1e-12);
        assert_eq!(sig.confidence, 0.1);
    }

    #[test]
    fn transparent_image_takes_neutral_path() {
        let pixels = buffer(ImageBuffer::from_pixel(6, 6, Rgba([255, 0, 0, 0])));
        let sig = analyze(&pixels, 8.0, 18);
        assert!(sig.is_neutral());
        assert_eq!(sig.lightness, 0.5);
    }

    #[test]
    fn dominant_color_is_averaged_in_rgb_not_hue() {
        // two reds in the same 20 degree bin average to one color
        let pixels = striped(4, 2, &[([255, 20, 40], 2), ([230, 40, 40], 2)]);
        let sig = analyze(&pixels, 8.0, 18);
        let expected = rgb_to_lch(243, 30, 40);
        assert!((sig.hue.unwrap() - expected.h).abs() < 1e-9);
    }
}
