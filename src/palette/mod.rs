//! Palette reducers: three independent ways to derive a bounded-size
//! palette from an image (spec §4.C). All three share one post-processing
//! contract (canonical light/dark ordering) and one entry trait.

mod kmeans;
mod median_cut;
mod octree;

pub use kmeans::KMeans;
pub use median_cut::MedianCut;
pub use octree::Octree;

use crate::color::Rgb;
use crate::error::Result;
use crate::mat::Mat;
use crate::workqueue::WorkQueue;

/// Common interface for the three palette reducers. Dispatch is static at
/// the call site; there is no trait object / dynamic dispatch requirement.
pub trait PaletteReducer {
    fn reduce(&self, image: &Mat<Rgb>, count: u8, queue: &WorkQueue) -> Result<Vec<Rgb>>;
}

/// Reorders a reduced palette so entry 0 is the lightest color (by
/// component sum) and the last entry is the darkest, dropping exact
/// duplicate colors along the way (spec §4.C / §8 invariant 2).
pub fn canonicalize(mut palette: Vec<Rgb>) -> Vec<Rgb> {
    let mut seen = std::collections::HashSet::new();
    palette.retain(|c| seen.insert((c.r, c.g, c.b)));

    if palette.len() <= 1 {
        return palette;
    }

    let lightest_idx = palette
        .iter()
        .enumerate()
        .max_by_key(|(_, c)| c.component_sum())
        .map(|(i, _)| i)
        .unwrap();
    let lightest = palette.remove(lightest_idx);

    let darkest_idx = palette
        .iter()
        .enumerate()
        .min_by_key(|(_, c)| c.component_sum())
        .map(|(i, _)| i)
        .unwrap();
    let darkest = palette.remove(darkest_idx);

    let mut out = Vec::with_capacity(palette.len() + 2);
    out.push(lightest);
    out.extend(palette);
    out.push(darkest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_orders_light_then_dark() {
        let palette = vec![
            Rgb::new(128, 128, 128),
            Rgb::new(255, 255, 255),
            Rgb::new(0, 0, 0),
            Rgb::new(64, 64, 64),
        ];
        let out = canonicalize(palette);
        assert_eq!(out[0], Rgb::new(255, 255, 255));
        assert_eq!(out[out.len() - 1], Rgb::new(0, 0, 0));
    }

    #[test]
    fn canonicalize_collapses_duplicates() {
        let palette = vec![Rgb::new(10, 10, 10); 4];
        let out = canonicalize(palette);
        assert_eq!(out.len(), 1);
    }

    /// Invariant 2, randomized: for any palette, entry 0's component sum is
    /// the max and the last entry's is the min, regardless of input order.
    #[test]
    fn canonicalize_orders_light_then_dark_for_random_palettes() {
        use rand::{rngs::StdRng, Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(1234);

        for _ in 0..20 {
            let n = rng.gen_range(2..10);
            let palette: Vec<Rgb> = (0..n).map(|_| Rgb::new(rng.gen(), rng.gen(), rng.gen())).collect();
            let out = canonicalize(palette);
            if out.is_empty() {
                continue;
            }
            let max_sum = out.iter().map(Rgb::component_sum).max().unwrap();
            let min_sum = out.iter().map(Rgb::component_sum).min().unwrap();
            assert_eq!(out[0].component_sum(), max_sum);
            assert_eq!(out[out.len() - 1].component_sum(), min_sum);
        }
    }
}
