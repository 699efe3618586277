//! Synthetic images shared by the test modules.
use std::io::Cursor;

use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use super::ImageSource;

pub fn encode_png(image: RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

pub fn solid_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    encode_png(RgbaImage::from_pixel(width, height, Rgba(rgba)))
}

pub fn fixed_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

pub fn solid_source(name: &str, rgb: [u8; 3]) -> ImageSource {
    let [r, g, b] = rgb;
    ImageSource::new(solid_png(8, 8, [r, g, b, 255]), name, fixed_time())
}

pub fn corrupt_source(name: &str) -> ImageSource {
    ImageSource::new(b"definitely not an image".to_vec(), name, fixed_time())
}
