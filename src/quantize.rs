//! Color quantizers: threshold, Floyd–Steinberg error diffusion, and
//! ordered (Bayer) dithering onto a fixed palette (spec §4.D), grounded on
//! `original_source/src/quantize.cpp` (`thresholdImage`, `ditherImage`,
//! `ditherImage_ordered`).

use crate::color::Rgb;
use crate::error::Result;
use crate::mat::Mat;
use crate::workqueue::WorkQueue;

pub trait Quantizer {
    fn quantize(&self, image: &Mat<Rgb>, palette: &[Rgb], queue: &WorkQueue) -> Result<Mat<u8>>;
}

/// Index of the closest palette entry by squared Euclidean distance
/// (monotonic with the spec's stated Euclidean `argmin`, cheaper to
/// compute).
pub fn nearest_color(pixel: Rgb, palette: &[Rgb]) -> u8 {
    let mut best = 0usize;
    let mut best_dist = u32::MAX;
    for (i, c) in palette.iter().enumerate() {
        let d = pixel.distance_sq(c);
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best as u8
}

pub struct Threshold;

impl Quantizer for Threshold {
    fn quantize(&self, image: &Mat<Rgb>, palette: &[Rgb], queue: &WorkQueue) -> Result<Mat<u8>> {
        let width = image.width();
        let height = image.height();
        let mut out = vec![0u8; width * height];

        let chunk_rows = (height / parallelism()).max(1);
        let mut offset = 0usize;
        let mut chunks = Vec::new();
        while offset < height {
            let rows = chunk_rows.min(height - offset);
            chunks.push((offset, rows));
            offset += rows;
        }

        let src = image.data().to_vec();
        let palette = palette.to_vec();
        let out_ptr = std::sync::Arc::new(std::sync::Mutex::new(std::mem::take(&mut out)));

        for (start_row, rows) in chunks {
            let src = src.clone();
            let palette = palette.clone();
            let out_ptr = std::sync::Arc::clone(&out_ptr);
            queue.push(move || {
                let mut local = vec![0u8; rows * width];
                for y in 0..rows {
                    for x in 0..width {
                        let p = src[(start_row + y) * width + x];
                        local[y * width + x] = nearest_color(p, &palette);
                    }
                }
                let mut out = out_ptr.lock().unwrap();
                out[start_row * width..(start_row + rows) * width].copy_from_slice(&local);
            });
        }
        queue.wait();

        let out = std::sync::Arc::try_unwrap(out_ptr)
            .expect("all queued closures have completed by now")
            .into_inner()
            .unwrap();
        Ok(Mat::from_vec(width, height, out))
    }
}

fn parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(8)
}

pub struct FloydSteinberg;

impl Quantizer for FloydSteinberg {
    fn quantize(&self, image: &Mat<Rgb>, palette: &[Rgb], _queue: &WorkQueue) -> Result<Mat<u8>> {
        let width = image.width();
        let height = image.height();
        let mut indices = vec![0u8; width * height];

        // Two-row sliding error buffer, one [f32;3] per pixel column.
        let mut cur_err = vec![[0f32; 3]; width];
        let mut next_err = vec![[0f32; 3]; width];

        for y in 0..height {
            for x in 0..width {
                let src = image.data()[y * width + x];
                let adjusted = [
                    (src.r as f32 + cur_err[x][0]).clamp(0.0, 255.0),
                    (src.g as f32 + cur_err[x][1]).clamp(0.0, 255.0),
                    (src.b as f32 + cur_err[x][2]).clamp(0.0, 255.0),
                ];
                let approx = Rgb::new(adjusted[0] as u8, adjusted[1] as u8, adjusted[2] as u8);
                let idx = nearest_color(approx, palette);
                indices[y * width + x] = idx;

                let chosen = palette[idx as usize];
                let err = [
                    adjusted[0] - chosen.r as f32,
                    adjusted[1] - chosen.g as f32,
                    adjusted[2] - chosen.b as f32,
                ];

                if x + 1 < width {
                    for c in 0..3 {
                        cur_err[x + 1][c] += err[c] * 7.0 / 16.0;
                    }
                }
                if x > 0 {
                    for c in 0..3 {
                        next_err[x - 1][c] += err[c] * 3.0 / 16.0;
                    }
                }
                for c in 0..3 {
                    next_err[x][c] += err[c] * 5.0 / 16.0;
                }
                if x + 1 < width {
                    for c in 0..3 {
                        next_err[x + 1][c] += err[c] * 1.0 / 16.0;
                    }
                }
            }
            std::mem::swap(&mut cur_err, &mut next_err);
            next_err.iter_mut().for_each(|e| *e = [0.0; 3]);
        }

        Ok(Mat::from_vec(width, height, indices))
    }
}

/// The canonical 8x8 Bayer ordered-dither threshold matrix.
pub const BAYER_8X8: [[u8; 8]; 8] = [
    [0, 32, 8, 40, 2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44, 4, 36, 14, 46, 6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [3, 35, 11, 43, 1, 33, 9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47, 7, 39, 13, 45, 5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];

pub struct Ordered;

impl Quantizer for Ordered {
    fn quantize(&self, image: &Mat<Rgb>, palette: &[Rgb], queue: &WorkQueue) -> Result<Mat<u8>> {
        let distance = mean_pairwise_distance(palette) / 6.0;
        let width = image.width();
        let height = image.height();
        let src = image.data().to_vec();
        let palette_vec = palette.to_vec();
        let out_ptr = std::sync::Arc::new(std::sync::Mutex::new(vec![0u8; width * height]));

        let chunk_rows = (height / parallelism()).max(1);
        let mut offset = 0usize;
        while offset < height {
            let rows = chunk_rows.min(height - offset);
            let src = src.clone();
            let palette_vec = palette_vec.clone();
            let out_ptr = std::sync::Arc::clone(&out_ptr);
            let start_row = offset;
            queue.push(move || {
                let mut local = vec![0u8; rows * width];
                for y in 0..rows {
                    let abs_y = start_row + y;
                    for x in 0..width {
                        let p = src[abs_y * width + x];
                        let offset_scale =
                            distance * (BAYER_8X8[abs_y % 8][x % 8] as f32 / 64.0 - 0.5);
                        let adjusted = Rgb::new(
                            (p.r as f32 + offset_scale).clamp(0.0, 255.0) as u8,
                            (p.g as f32 + offset_scale).clamp(0.0, 255.0) as u8,
                            (p.b as f32 + offset_scale).clamp(0.0, 255.0) as u8,
                        );
                        local[y * width + x] = nearest_color(adjusted, &palette_vec);
                    }
                }
                let mut out = out_ptr.lock().unwrap();
                out[start_row * width..(start_row + rows) * width].copy_from_slice(&local);
            });
            offset += rows;
        }
        queue.wait();

        let out = std::sync::Arc::try_unwrap(out_ptr)
            .expect("all queued closures have completed by now")
            .into_inner()
            .unwrap();
        Ok(Mat::from_vec(width, height, out))
    }
}

fn mean_pairwise_distance(palette: &[Rgb]) -> f32 {
    if palette.len() < 2 {
        return 0.0;
    }
    let mut total = 0f32;
    for i in 0..palette.len() {
        for j in 0..palette.len() {
            total += palette[i].distance(&palette[j]);
        }
    }
    total / (palette.len() * palette.len()) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn bw_palette() -> Vec<Rgb> {
        vec![Rgb::new(255, 255, 255), Rgb::new(0, 0, 0)]
    }

    #[test]
    fn nearest_color_picks_exact_match() {
        let palette = bw_palette();
        assert_eq!(nearest_color(Rgb::new(0, 0, 0), &palette), 1);
        assert_eq!(nearest_color(Rgb::new(255, 255, 255), &palette), 0);
    }

    #[test]
    fn threshold_quantizes_every_pixel_into_domain() {
        let image = Mat::from_vec(
            2,
            2,
            vec![
                Rgb::new(10, 10, 10),
                Rgb::new(250, 250, 250),
                Rgb::new(0, 0, 0),
                Rgb::new(200, 200, 200),
            ],
        );
        let palette = bw_palette();
        let queue = WorkQueue::new(2);
        let out = Threshold.quantize(&image, &palette, &queue).unwrap();
        assert!(out.data().iter().all(|&i| (i as usize) < palette.len()));
    }

    #[test]
    fn floyd_steinberg_stays_in_domain() {
        let mut data = Vec::new();
        for i in 0..16u8 {
            data.push(Rgb::new(i * 16, i * 16, i * 16));
        }
        let image = Mat::from_vec(4, 4, data);
        let palette = bw_palette();
        let queue = WorkQueue::new(1);
        let out = FloydSteinberg.quantize(&image, &palette, &queue).unwrap();
        assert!(out.data().iter().all(|&i| (i as usize) < palette.len()));
    }

    #[test]
    fn ordered_dither_stays_in_domain() {
        let image = Mat::from_vec(8, 8, vec![Rgb::new(128, 128, 128); 64]);
        let palette = bw_palette();
        let queue = WorkQueue::new(2);
        let out = Ordered.quantize(&image, &palette, &queue).unwrap();
        assert!(out.data().iter().all(|&i| (i as usize) < palette.len()));
    }

    /// Pins the exact index grid a flat gray=120 8x8 image produces against
    /// the black/white palette. Hand-derived from `BAYER_8X8` and
    /// `mean_pairwise_distance`'s output for this palette (scale ~36.805):
    /// a transposed matrix reshuffles which cells cross the 127.5 midpoint,
    /// and a wrong normalization (e.g. summing only unordered pairs) moves
    /// the crossover far enough to flip row 0's b=40/42 cells to white.
    #[test]
    fn ordered_dither_pins_known_index_pattern_for_bw_palette() {
        let image = Mat::from_vec(8, 8, vec![Rgb::new(120, 120, 120); 64]);
        let palette = bw_palette();
        let queue = WorkQueue::new(1);
        let out = Ordered.quantize(&image, &palette, &queue).unwrap();

        #[rustfmt::skip]
        let expected: [u8; 64] = [
            1, 1, 1, 1, 1, 1, 1, 1,
            0, 1, 0, 1, 0, 1, 0, 1,
            1, 1, 1, 1, 1, 0, 1, 1,
            0, 1, 0, 1, 0, 1, 0, 1,
            1, 1, 1, 1, 1, 1, 1, 1,
            0, 1, 0, 1, 0, 1, 0, 1,
            1, 0, 1, 1, 1, 1, 1, 1,
            0, 1, 0, 1, 0, 1, 0, 1,
        ];
        assert_eq!(out.data(), &expected);
    }

    fn random_palette(rng: &mut impl rand::Rng, n: usize) -> Vec<Rgb> {
        (0..n).map(|_| Rgb::new(rng.gen(), rng.gen(), rng.gen())).collect()
    }

    fn random_image(rng: &mut impl rand::Rng, w: usize, h: usize) -> Mat<Rgb> {
        Mat::from_vec(w, h, (0..w * h).map(|_| Rgb::new(rng.gen(), rng.gen(), rng.gen())).collect())
    }

    fn luminance(c: Rgb) -> f32 {
        0.299 * c.r as f32 + 0.587 * c.g as f32 + 0.114 * c.b as f32
    }

    /// Invariant 8: Floyd-Steinberg's mean absolute luminance error per
    /// pixel never exceeds the worst-case nearest-color error available in
    /// the palette (threshold quantizing without diffusion).
    #[test]
    fn floyd_steinberg_mean_error_bounded_by_worst_case_nearest_color() {
        use rand::{rngs::StdRng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(42);
        let queue = WorkQueue::new(2);

        for _ in 0..5 {
            let palette = random_palette(&mut rng, 4);
            let image = random_image(&mut rng, 12, 12);

            let worst_case = image
                .data()
                .iter()
                .map(|&p| {
                    let idx = nearest_color(p, &palette);
                    (luminance(p) - luminance(palette[idx as usize])).abs()
                })
                .fold(0.0f32, f32::max);

            let out = FloydSteinberg.quantize(&image, &palette, &queue).unwrap();
            let total: f32 = image
                .data()
                .iter()
                .zip(out.data())
                .map(|(&p, &idx)| (luminance(p) - luminance(palette[idx as usize])).abs())
                .sum();
            let mean = total / image.data().len() as f32;
            assert!(mean <= worst_case + 1.0, "mean {mean} exceeded worst-case {worst_case}");
        }
    }

    /// Invariant 9: shifting every pixel by a constant offset smaller than
    /// the palette's minimum inter-entry spacing changes ordered-dither
    /// output indices by no more than one palette-spacing step.
    #[test]
    fn ordered_dither_is_stable_under_small_constant_offsets() {
        use rand::{rngs::StdRng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(7);
        let queue = WorkQueue::new(2);

        let palette = vec![Rgb::new(0, 0, 0), Rgb::new(64, 64, 64), Rgb::new(192, 192, 192)];
        let min_spacing = 64.0f32;
        let offset: i16 = 5; // well under min_spacing

        let base = random_image(&mut rng, 8, 8);
        let shifted = Mat::from_vec(
            base.width(),
            base.height(),
            base.data()
                .iter()
                .map(|p| {
                    let shift = |c: u8| (c as i16 + offset).clamp(0, 255) as u8;
                    Rgb::new(shift(p.r), shift(p.g), shift(p.b))
                })
                .collect(),
        );

        let out_a = Ordered.quantize(&base, &palette, &queue).unwrap();
        let out_b = Ordered.quantize(&shifted, &palette, &queue).unwrap();

        for (&a, &b) in out_a.data().iter().zip(out_b.data()) {
            let diff = (a as i32 - b as i32).abs();
            assert!(diff as f32 * min_spacing <= min_spacing, "indices diverged by {diff} steps");
        }
    }
}
