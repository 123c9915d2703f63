//! K-means palette reducer (spec §4.C.3), seeded from median-cut's 16-color
//! result. Grounded on `original_source/src/quantize.cpp`'s
//! `kMeans_bucket` / `kMeans_recenter` / `reducePalette_kMeans`.

use std::sync::{Arc, Mutex};

use super::median_cut::MedianCut;
use super::{canonicalize, PaletteReducer};
use crate::color::Rgb;
use crate::error::Result;
use crate::mat::Mat;
use crate::workqueue::WorkQueue;

const MAX_ITERATIONS: u32 = 100;

pub struct KMeans;

impl PaletteReducer for KMeans {
    fn reduce(&self, image: &Mat<Rgb>, count: u8, queue: &WorkQueue) -> Result<Vec<Rgb>> {
        if image.data().is_empty() {
            return Ok(vec![]);
        }

        let mut centroids = MedianCut.reduce(image, 16, queue)?;
        centroids.truncate(count as usize);
        while centroids.len() < count as usize {
            centroids.push(Rgb::BLACK);
        }

        let pixels = image.data();

        for _ in 0..MAX_ITERATIONS {
            // Per-centroid bucket accumulators, merged under one mutex per
            // centroid (matches kMeans_bucket's per-centroid lock).
            let accumulators: Vec<Arc<Mutex<(u64, u64, u64, u64)>>> = centroids
                .iter()
                .map(|_| Arc::new(Mutex::new((0u64, 0u64, 0u64, 0u64))))
                .collect();

            let chunk_size = (pixels.len() / queue_parallelism(queue)).max(1);
            for chunk in pixels.chunks(chunk_size) {
                let chunk = chunk.to_vec();
                let centroids_snapshot = centroids.clone();
                let accs = accumulators.clone();
                queue.push(move || {
                    bucketize_chunk(&chunk, &centroids_snapshot, &accs);
                });
            }
            queue.wait();

            let mut changed = false;
            for (i, acc) in accumulators.iter().enumerate() {
                let (r, g, b, n) = *acc.lock().unwrap();
                if n == 0 {
                    continue;
                }
                let new = Rgb::new(
                    ((r + n / 2) / n) as u8,
                    ((g + n / 2) / n) as u8,
                    ((b + n / 2) / n) as u8,
                );
                if new != centroids[i] {
                    changed = true;
                    centroids[i] = new;
                }
            }

            if !changed {
                break;
            }
        }

        Ok(canonicalize(centroids))
    }
}

fn queue_parallelism(_queue: &WorkQueue) -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(8)
}

fn bucketize_chunk(
    chunk: &[Rgb],
    centroids: &[Rgb],
    accumulators: &[Arc<Mutex<(u64, u64, u64, u64)>>],
) {
    for &pixel in chunk {
        let mut best = 0usize;
        let mut best_dist = u32::MAX;
        for (i, c) in centroids.iter().enumerate() {
            let d = pixel.distance_sq(c);
            if d < best_dist {
                best_dist = d;
                best = i;
            }
        }
        let mut acc = accumulators[best].lock().unwrap();
        acc.0 += pixel.r as u64;
        acc.1 += pixel.g as u64;
        acc.2 += pixel.b as u64;
        acc.3 += 1;
    }
}
