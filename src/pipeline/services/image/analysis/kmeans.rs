//! K-means clustering in RGB space over the colored pixels of an image.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::config::{KMeansParams, OutputSpace};
use super::core::{achromatic_fallback, analyze_pixels, average_rgb, ColorSignature};
use crate::pipeline::color::{rgb_to_hsv, rgb_to_lch};
use crate::pipeline::services::image::sampler::PixelBuffer;

/// Result of clustering: the dominant centroid and how many points joined it.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    pub centroid: [f64; 3],
    pub members: usize,
    pub total: usize,
}

fn distance_sq(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (0..3).map(|i| (a[i] - b[i]).powi(2)).sum()
}

fn nearest(point: &[f64; 3], centroids: &[[f64; 3]]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (index, centroid) in centroids.iter().enumerate() {
        let distance = distance_sq(point, centroid);
        if distance < best_distance {
            best_distance = distance;
            best = index;
        }
    }
    best
}

/// Lloyd's algorithm with `k` randomly sampled starting points.
///
/// Runs exactly `iterations` rounds; clusters that lose all members keep
/// their previous centroid. `points` must hold at least `k` entries.
pub fn dominant_cluster<R: Rng + ?Sized>(
    points: &[[f64; 3]],
    k: usize,
    iterations: usize,
    rng: &mut R,
) -> Clustering {
    let mut centroids: Vec<[f64; 3]> = rand::seq::index::sample(rng, points.len(), k)
        .iter()
        .map(|i| points[i])
        .collect();
    let mut counts = vec![0usize; k];

    for _ in 0..iterations {
        let mut sums = vec![[0.0f64; 3]; k];
        counts.iter_mut().for_each(|c| *c = 0);

        for point in points {
            let cluster = nearest(point, &centroids);
            for channel in 0..3 {
                sums[cluster][channel] += point[channel];
            }
            counts[cluster] += 1;
        }

        for (cluster, centroid) in centroids.iter_mut().enumerate() {
            if counts[cluster] > 0 {
                let n = counts[cluster] as f64;
                *centroid = sums[cluster].map(|sum| sum / n);
            }
        }
    }

    let mut largest = 0;
    for (cluster, count) in counts.iter().enumerate() {
        if *count > counts[largest] {
            largest = cluster;
        }
    }

    Clustering {
        centroid: centroids[largest],
        members: counts[largest],
        total: points.len(),
    }
}

fn signature_for(rgb: [u8; 3], space: OutputSpace, confidence: f64) -> ColorSignature {
    let [r, g, b] = rgb;
    match space {
        OutputSpace::Lch => ColorSignature::from_lch(rgb_to_lch(r, g, b), confidence),
        OutputSpace::Hsv => ColorSignature::from_hsv(rgb_to_hsv(r, g, b), confidence),
    }
}

pub fn analyze(pixels: &PixelBuffer, params: &KMeansParams, min_chroma: f64) -> ColorSignature {
    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    analyze_with_rng(pixels, params, min_chroma, &mut rng)
}

pub fn analyze_with_rng<R: Rng + ?Sized>(
    pixels: &PixelBuffer,
    params: &KMeansParams,
    min_chroma: f64,
    rng: &mut R,
) -> ColorSignature {
    let colored: Vec<[u8; 3]> = analyze_pixels(pixels)
        .into_iter()
        .filter(|p| p.lch.c > min_chroma)
        .map(|p| p.sample.rgb)
        .collect();

    if colored.is_empty() {
        return achromatic_fallback(pixels);
    }

    if colored.len() < params.k {
        let share = colored.len() as f64 / pixels.len() as f64;
        return match average_rgb(colored.iter()) {
            Some(rgb) => signature_for(rgb, params.output_space, (2.0 * share).min(1.0)),
            None => achromatic_fallback(pixels),
        };
    }

    let points: Vec<[f64; 3]> = colored
        .iter()
        .map(|rgb| rgb.map(|channel| channel as f64))
        .collect();
    let clustering = dominant_cluster(&points, params.k, params.iterations, rng);

    let rgb = clustering
        .centroid
        .map(|channel| channel.round().clamp(0.0, 255.0) as u8);
    let share = clustering.members as f64 / clustering.total as f64;
    signature_for(rgb, params.output_space, (2.0 * share).min(1.0))
}
