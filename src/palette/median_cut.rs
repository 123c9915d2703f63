//! Median-cut palette reducer (spec §4.C.1), grounded on
//! `original_source/src/quantize.cpp`'s `medianCut`/`reducePalette_medianCut`.

use std::sync::{Arc, Mutex};

use super::{canonicalize, PaletteReducer};
use crate::color::Rgb;
use crate::error::{Result, SanjuuniError};
use crate::mat::Mat;
use crate::workqueue::WorkQueue;

pub struct MedianCut;

impl PaletteReducer for MedianCut {
    fn reduce(&self, image: &Mat<Rgb>, count: u8, queue: &WorkQueue) -> Result<Vec<Rgb>> {
        if count == 0 || (count as u32).count_ones() != 1 {
            return Err(SanjuuniError::NotPowerOfTwo(count as u32));
        }
        let pixels: Vec<Rgb> = image.data().to_vec();
        if pixels.is_empty() {
            return Ok(vec![]);
        }

        let results = Arc::new(Mutex::new(Vec::new()));
        fan_out_top_level(pixels, count as u32, queue, Arc::clone(&results));
        queue.wait();

        let mut palette = Arc::try_unwrap(results)
            .expect("all queued closures have completed by now")
            .into_inner()
            .unwrap();
        palette.sort_by_key(|c| c.component_sum());
        Ok(canonicalize(palette))
    }
}

/// Splits the top-level bucket into two halves and submits each half to the
/// queue as an independent task; deeper recursion happens sequentially
/// inside each task. This matches the spec's "parallel fan-out via
/// work.push" without requiring closures to push back onto the queue
/// themselves.
fn fan_out_top_level(
    pixels: Vec<Rgb>,
    count: u32,
    queue: &WorkQueue,
    out: Arc<Mutex<Vec<Rgb>>>,
) {
    if count <= 1 || pixels.len() <= 1 {
        out.lock().unwrap().push(centroid(&pixels));
        return;
    }

    let channel = choose_channel(&pixels, None);
    let (left, right) = split_at_median(pixels, channel);
    let half = count / 2;

    let out_l = Arc::clone(&out);
    queue.push(move || bisect_seq(left, half, Some(channel), &out_l));
    let out_r = Arc::clone(&out);
    queue.push(move || bisect_seq(right, half, Some(channel), &out_r));
}

fn bisect_seq(pixels: Vec<Rgb>, count: u32, last_channel: Option<usize>, out: &Mutex<Vec<Rgb>>) {
    if count <= 1 || pixels.len() <= 1 {
        out.lock().unwrap().push(centroid(&pixels));
        return;
    }
    let channel = choose_channel(&pixels, last_channel);
    let (left, right) = split_at_median(pixels, channel);
    let half = count / 2;
    bisect_seq(left, half, Some(channel), out);
    bisect_seq(right, half, Some(channel), out);
}

fn channel_of(c: &Rgb, ch: usize) -> u8 {
    match ch {
        0 => c.r,
        1 => c.g,
        _ => c.b,
    }
}

fn channel_range(pixels: &[Rgb], ch: usize) -> i32 {
    let (mut lo, mut hi) = (255u8, 0u8);
    for p in pixels {
        let v = channel_of(p, ch);
        lo = lo.min(v);
        hi = hi.max(v);
    }
    hi as i32 - lo as i32
}

/// Picks the channel with the largest range. If it's the same channel used
/// at the previous split and the other two ranges are within 8 of it,
/// rotate to the larger of the other two (spec §4.C.1).
fn choose_channel(pixels: &[Rgb], last_channel: Option<usize>) -> usize {
    let ranges = [
        channel_range(pixels, 0),
        channel_range(pixels, 1),
        channel_range(pixels, 2),
    ];
    let mut channel = 0;
    for c in 1..3 {
        if ranges[c] > ranges[channel] {
            channel = c;
        }
    }

    if Some(channel) == last_channel {
        let others: Vec<usize> = (0..3).filter(|&c| c != channel).collect();
        let (a, b) = (others[0], others[1]);
        if ranges[a] >= ranges[channel] - 8 && ranges[b] >= ranges[channel] - 8 {
            channel = if ranges[a] >= ranges[b] { a } else { b };
        }
    }
    channel
}

fn split_at_median(mut pixels: Vec<Rgb>, channel: usize) -> (Vec<Rgb>, Vec<Rgb>) {
    pixels.sort_by_key(|p| channel_of(p, channel));
    let mid = pixels.len() / 2;
    let right = pixels.split_off(mid);
    (pixels, right)
}

fn centroid(pixels: &[Rgb]) -> Rgb {
    if pixels.is_empty() {
        return Rgb::BLACK;
    }
    let (mut r, mut g, mut b) = (0u64, 0u64, 0u64);
    for p in pixels {
        r += p.r as u64;
        g += p.g as u64;
        b += p.b as u64;
    }
    let n = pixels.len() as u64;
    Rgb::new(
        ((r + n / 2) / n) as u8,
        ((g + n / 2) / n) as u8,
        ((b + n / 2) / n) as u8,
    )
}
