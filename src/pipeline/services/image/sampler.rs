use image::{imageops::FilterType, DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Controls how decoded images are reduced before color analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Longest edge after downsampling, in pixels
    pub max_dimension: u32,
    /// Pixels with alpha below this value are ignored
    pub alpha_threshold: u8,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            max_dimension: 200,
            alpha_threshold: 128,
        }
    }
}

/// An opaque pixel and where it sits on the sampled surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub x: u32,
    pub y: u32,
    pub rgb: [u8; 3],
}

/// Opaque pixels of a downsampled image.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    samples: Vec<Sample>,
}

impl PixelBuffer {
    pub fn from_rgba(image: &RgbaImage, alpha_threshold: u8) -> Self {
        let samples = image
            .enumerate_pixels()
            .filter(|(_, _, px)| px[3] >= alpha_threshold)
            .map(|(x, y, px)| Sample {
                x,
                y,
                rgb: [px[0], px[1], px[2]],
            })
            .collect();

        Self {
            width: image.width(),
            height: image.height(),
            samples,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Position of a sample relative to the surface center, each axis in [-1, 1].
    pub fn normalized_offset(&self, sample: &Sample) -> (f64, f64) {
        let nx = (sample.x as f64 + 0.5) / self.width as f64 * 2.0 - 1.0;
        let ny = (sample.y as f64 + 0.5) / self.height as f64 * 2.0 - 1.0;
        (nx, ny)
    }
}

#[derive(Debug, Clone)]
pub struct PixelSampler {
    config: SamplingConfig,
}

impl PixelSampler {
    pub fn new(config: SamplingConfig) -> Self {
        Self { config }
    }

    /// Decode raw bytes and reduce them to an opaque pixel buffer.
    pub fn sample(&self, bytes: &[u8]) -> Result<PixelBuffer, AppError> {
        let image = image::load_from_memory(bytes).map_err(|e| AppError::Decode(e.to_string()))?;
        self.sample_image(&image)
    }

    pub fn sample_image(&self, image: &DynamicImage) -> Result<PixelBuffer, AppError> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(AppError::UnsupportedContext { width, height });
        }

        let rgba = image.to_rgba8();
        let (target_width, target_height) =
            target_dimensions(width, height, self.config.max_dimension);

        let surface = if (target_width, target_height) == (width, height) {
            rgba
        } else {
            // filter in premultiplied space so invisible pixels add no color
            let mut rgba = rgba;
            premultiply(&mut rgba);
            let mut resized =
                image::imageops::resize(&rgba, target_width, target_height, FilterType::Triangle);
            unpremultiply(&mut resized);
            resized
        };

        Ok(PixelBuffer::from_rgba(&surface, self.config.alpha_threshold))
    }
}

fn premultiply(image: &mut RgbaImage) {
    for px in image.pixels_mut() {
        let alpha = px[3] as u32;
        for channel in &mut px.0[..3] {
            *channel = ((*channel as u32 * alpha + 127) / 255) as u8;
        }
    }
}

fn unpremultiply(image: &mut RgbaImage) {
    for px in image.pixels_mut() {
        let alpha = px[3] as u32;
        for channel in &mut px.0[..3] {
            *channel = if alpha == 0 {
                0
            } else {
                ((*channel as u32 * 255 + alpha / 2) / alpha).min(255) as u8
            };
        }
    }
}

/// Fit `width`x`height` inside a `max_dimension` square, keeping aspect ratio.
/// Images already inside the bound are left alone.
pub fn target_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_dimension {
        return (width, height);
    }

    let scale = max_dimension as f64 / longest as f64;
    let scaled = |edge: u32| ((edge as f64 * scale).round() as u32).max(1);

    if width >= height {
        (max_dimension, scaled(height))
    } else {
        (scaled(width), max_dimension)
    }
}
