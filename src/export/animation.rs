use image::codecs::gif::{GifEncoder, Repeat};
use image::imageops::{self, FilterType};
use image::{Delay, DynamicImage, Frame, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::common::ImageRecord;
use crate::error::AppError;
use crate::pipeline::services::image::sampler::target_dimensions;

/// GIF encoder speed, 1 (best quality) to 30 (fastest)
const ENCODER_SPEED: i32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    /// How long each frame stays on screen
    pub frame_duration_ms: u32,
    /// Frames larger than this on either edge are scaled down
    pub max_edge: u32,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            frame_duration_ms: 500,
            max_edge: 1000,
        }
    }
}

fn bounded_frame(image: DynamicImage, max_edge: u32) -> RgbaImage {
    let (width, height) = (image.width(), image.height());
    let (target_width, target_height) = target_dimensions(width, height, max_edge);
    if (target_width, target_height) == (width, height) {
        image.into_rgba8()
    } else {
        image
            .resize_exact(target_width, target_height, FilterType::Triangle)
            .into_rgba8()
    }
}

/// Encode the successful records, in order, as a looping GIF.
///
/// Every frame is centered on a transparent canvas as large as the widest and
/// tallest frame.
pub fn build_animation<'a>(
    records: impl IntoIterator<Item = &'a ImageRecord>,
    settings: &AnimationSettings,
) -> Result<Vec<u8>, AppError> {
    let mut frames = Vec::new();
    for record in records.into_iter().filter(|r| !r.is_failed()) {
        match image::load_from_memory(record.bytes()) {
            Ok(image) => frames.push(bounded_frame(image, settings.max_edge)),
            Err(e) => warn!("Leaving {} out of the animation: {}", record.original_name(), e),
        }
    }

    if frames.is_empty() {
        return Err(AppError::EmptyBatch);
    }

    let canvas_width = frames.iter().map(|f| f.width()).max().unwrap_or(1);
    let canvas_height = frames.iter().map(|f| f.height()).max().unwrap_or(1);
    let delay = Delay::from_numer_denom_ms(settings.frame_duration_ms, 1);

    let mut bytes = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(&mut bytes, ENCODER_SPEED);
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(AppError::Animation)?;

        for frame in &frames {
            let mut canvas = RgbaImage::new(canvas_width, canvas_height);
            let x = (canvas_width - frame.width()) / 2;
            let y = (canvas_height - frame.height()) / 2;
            imageops::overlay(&mut canvas, frame, x as i64, y as i64);
            encoder
                .encode_frame(Frame::from_parts(canvas, 0, 0, delay))
                .map_err(AppError::Animation)?;
        }
    }

    info!(
        "Built {}x{} animation with {} frames ({} bytes)",
        canvas_width,
        canvas_height,
        frames.len(),
        bytes.len()
    );
    Ok(bytes)
}
