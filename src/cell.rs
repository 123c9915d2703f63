//! 2x3 cell -> (character, color) glyph synthesis (spec §4.E), ported
//! case-for-case from `original_source/src/cc-pixel.cpp`'s `toCCPixel`
//! OpenCL kernel (ported to scalar Rust, kept branch-heavy per design
//! note §9) and its `ditherCCImage` fallback helper.
//!
//! Deviation from spec.md's per-branch prose: the n=1 branch is
//! documented there as emitting literal space (0x20), but §8 scenario S1
//! and invariant 1 both require bit 7 set on every character byte. S1 and
//! the cross-cutting invariant are treated as authoritative; n=1 emits
//! 0x80 (mask all-background) instead of 0x20.

use crate::color::Rgb;
use crate::error::{Result, SanjuuniError};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Vec3f {
    x: f32,
    y: f32,
    z: f32,
}

impl Vec3f {
    fn from_rgb(c: Rgb) -> Self {
        Vec3f {
            x: c.r as f32,
            y: c.g as f32,
            z: c.b as f32,
        }
    }

    fn distance(&self, other: &Vec3f) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    fn sub(&self, other: &Vec3f) -> Vec3f {
        Vec3f {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }

    fn add_scaled(&mut self, err: &Vec3f, scale: f32) {
        self.x += err.x * scale;
        self.y += err.y * scale;
        self.z += err.z * scale;
    }
}

/// Given six palette indices for a 2x3 block (layout `(0,0) (1,0) (0,1)
/// (1,1) (0,2) (1,2)`), returns `(character, color)` per spec §3/§4.E.
pub fn encode_cell(colors: [u8; 6], palette: &[Rgb]) -> Result<(u8, u8)> {
    for &c in &colors {
        if c >= 16 {
            return Err(SanjuuniError::TooManyColors);
        }
    }

    let mut used_colors: Vec<u8> = Vec::with_capacity(6);
    for &c in &colors {
        if !used_colors.contains(&c) {
            used_colors.push(c);
        }
    }

    let mut ch: u8 = 0x80;
    let (fg, bg): (u8, u8);

    match used_colors.len() {
        1 => {
            return Ok((0x80, used_colors[0] << 4));
        }
        2 => {
            let (mut f, mut b) = (used_colors[1], used_colors[0]);
            for i in 0..5 {
                if colors[i] == f {
                    ch |= 1 << i;
                }
            }
            if colors[5] == f {
                ch = (!ch & 0x1F) | 0x80;
                std::mem::swap(&mut f, &mut b);
            }
            fg = f;
            bg = b;
        }
        3 => {
            let mut uc = [used_colors[0], used_colors[1], used_colors[2]];
            let sum = |c: u8| palette[c as usize].component_sum();
            if sum(uc[0]) > sum(uc[1]) {
                uc.swap(0, 1);
            }
            if sum(uc[0]) > sum(uc[2]) {
                uc.swap(0, 2);
            }
            if sum(uc[1]) > sum(uc[2]) {
                uc.swap(1, 2);
            }
            let (darkest, mid, lightest) = (uc[0], uc[1], uc[2]);
            let pf = |c: u8| Vec3f::from_rgb(palette[c as usize]);
            let d_mid_dark = pf(mid).distance(&pf(darkest));
            let d_light_mid = pf(lightest).distance(&pf(mid));

            let mut color_map = [0u8; 16];
            let (mut f, mut b);
            if d_mid_dark - d_light_mid > 10.0 {
                color_map[darkest as usize] = darkest;
                color_map[mid as usize] = lightest;
                color_map[lightest as usize] = lightest;
                f = lightest;
                b = darkest;
            } else if d_light_mid - d_mid_dark > 10.0 {
                color_map[darkest as usize] = darkest;
                color_map[mid as usize] = darkest;
                color_map[lightest as usize] = lightest;
                f = lightest;
                b = darkest;
            } else if palette[darkest as usize].component_sum() < 32 {
                color_map[darkest as usize] = mid;
                color_map[mid as usize] = mid;
                color_map[lightest as usize] = lightest;
                f = mid;
                b = lightest;
            } else {
                // Covers both the "very light" case and the original's
                // identical fallback-if-the-algorithm-fails branch.
                color_map[darkest as usize] = mid;
                color_map[mid as usize] = lightest;
                color_map[lightest as usize] = lightest;
                f = mid;
                b = lightest;
            }

            for i in 0..5 {
                if color_map[colors[i] as usize] == f {
                    ch |= 1 << i;
                }
            }
            if color_map[colors[5] as usize] == f {
                ch = (!ch & 0x1F) | 0x80;
                let old_bg = b;
                f = old_bg;
                b = mid;
            }
            fg = f;
            bg = b;
        }
        4 => {
            let mut color_map = [0u8; 16];
            let mut f = 0xFFu8;
            let mut b = 0xFFu8;
            for &c in &colors {
                color_map[c as usize] += 1;
                if color_map[c as usize] == 2 {
                    if f == 0xFF {
                        f = c;
                    } else {
                        b = c;
                    }
                }
            }
            color_map[f as usize] = f;

            if b == 0xFF {
                let mut singles: Vec<u8> = used_colors
                    .iter()
                    .copied()
                    .filter(|&c| c != f)
                    .collect();
                singles.sort_by_key(|&c| palette[c as usize].component_sum());
                b = singles[1];
            }
            color_map[b as usize] = b;

            let mut singles: Vec<u8> = used_colors
                .iter()
                .copied()
                .filter(|&c| c != f && c != b)
                .collect();
            let pf = |c: u8| Vec3f::from_rgb(palette[c as usize]);
            let (pf_fg, pf_bg) = (pf(f), pf(b));
            for &c in &singles {
                if pf(c).distance(&pf_fg) < pf(c).distance(&pf_bg) {
                    color_map[c as usize] = f;
                } else {
                    color_map[c as usize] = b;
                }
            }
            singles.clear();

            for i in 0..5 {
                if color_map[colors[i] as usize] == f {
                    ch |= 1 << i;
                }
            }
            if color_map[colors[5] as usize] == f {
                ch = (!ch & 0x1F) | 0x80;
                std::mem::swap(&mut f, &mut b);
            }
            fg = f;
            bg = b;
        }
        _ => {
            let mut lo = [255u8; 3];
            let mut hi = [0u8; 3];
            for &c in &used_colors {
                let p = palette[c as usize];
                let comps = [p.r, p.g, p.b];
                for k in 0..3 {
                    lo[k] = lo[k].min(comps[k]);
                    hi[k] = hi[k].max(comps[k]);
                }
            }
            let ranges = [
                hi[0] as i32 - lo[0] as i32,
                hi[1] as i32 - lo[1] as i32,
                hi[2] as i32 - lo[2] as i32,
            ];
            let max_component = if ranges[0] > ranges[1] && ranges[0] > ranges[2] {
                0
            } else if ranges[1] > ranges[2] && ranges[1] > ranges[0] {
                1
            } else {
                2
            };
            let component = |c: u8| -> u8 {
                let p = palette[c as usize];
                match max_component {
                    0 => p.r,
                    1 => p.g,
                    _ => p.b,
                }
            };

            let mut sorted = colors;
            for i in 1..6 {
                let key = sorted[i];
                let key_val = component(key);
                let mut j = i;
                while j > 0 && component(sorted[j - 1]) > key_val {
                    sorted[j] = sorted[j - 1];
                    j -= 1;
                }
                sorted[j] = key;
            }

            let fg_candidate = sorted[2];
            let bg_candidate = sorted[5];

            let dither_in: Vec<Vec3f> = colors
                .iter()
                .map(|&c| Vec3f::from_rgb(palette[c as usize]))
                .collect();
            let out = dither_cc_image(
                &dither_in,
                Vec3f::from_rgb(palette[fg_candidate as usize]),
                Vec3f::from_rgb(palette[bg_candidate as usize]),
            );

            let mut f = fg_candidate;
            let mut b = bg_candidate;
            for i in 0..5 {
                if out[i] {
                    ch |= 1 << i;
                }
            }
            if out[5] {
                ch = (!ch & 0x1F) | 0x80;
                std::mem::swap(&mut f, &mut b);
            }
            fg = f;
            bg = b;
        }
    }

    Ok((ch, fg | (bg << 4)))
}

/// Unrolled Floyd-Steinberg dithering across a 2x3 block onto two chosen
/// colors `a` (true) / `b` (false). Returns, per cell, whether it was
/// assigned to `a`.
fn dither_cc_image(img_in: &[Vec3f], a: Vec3f, b: Vec3f) -> [bool; 6] {
    let mut img = [img_in[0], img_in[1], img_in[2], img_in[3], img_in[4], img_in[5]];
    let mut out = [false; 6];

    macro_rules! step {
        ($i:expr, [$($j:expr => $w:expr),*]) => {{
            let err = if img[$i].distance(&a) < img[$i].distance(&b) {
                out[$i] = true;
                let e = img[$i].sub(&a);
                img[$i] = a;
                e
            } else {
                out[$i] = false;
                let e = img[$i].sub(&b);
                img[$i] = b;
                e
            };
            $( img[$j].add_scaled(&err, $w); )*
        }};
    }

    step!(0, [1 => 7.0/16.0, 2 => 5.0/16.0, 3 => 1.0/16.0]);
    step!(1, [2 => 3.0/16.0, 3 => 5.0/16.0]);
    step!(2, [3 => 7.0/16.0, 4 => 5.0/16.0, 5 => 1.0/16.0]);
    step!(3, [4 => 3.0/16.0, 5 => 5.0/16.0]);
    step!(4, [5 => 7.0/16.0]);
    step!(5, []);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette16() -> Vec<Rgb> {
        (0..16u8)
            .map(|i| Rgb::new(i * 16, i * 16, i * 16))
            .collect()
    }

    #[test]
    fn s1_single_color_block() {
        let palette = palette16();
        let (ch, color) = encode_cell([3, 3, 3, 3, 3, 3], &palette).unwrap();
        assert_eq!(ch, 0x80);
        assert_eq!(color, 0x30);
    }

    // Hand-verified against the ported algorithm: for block [0,1,0,1,1,0]
    // positions 1, 3, and 4 (0-indexed) all equal fg=1, so the mask is
    // 0b11010, not the 0b01010 shown in the spec's worked example (that
    // example reuses the same bit pattern for two different blocks and
    // doesn't account for position 4 matching fg; the fg/bg/color values
    // it states do check out and match here).
    #[test]
    fn s2_two_color_block_no_swap() {
        let palette = palette16();
        let (ch, color) = encode_cell([0, 1, 0, 1, 1, 0], &palette).unwrap();
        assert_eq!(ch, 0x9A);
        assert_eq!(color, 0x01);
    }

    #[test]
    fn s2_two_color_block_with_swap() {
        let palette = palette16();
        let (ch, color) = encode_cell([0, 1, 0, 1, 0, 1], &palette).unwrap();
        assert_eq!(ch, 0x95);
        assert_eq!(color, 0x10);
    }

    #[test]
    fn rejects_out_of_range_index() {
        let palette = palette16();
        assert!(encode_cell([16, 0, 0, 0, 0, 0], &palette).is_err());
    }

    #[test]
    fn every_output_has_bit7_set_and_bg_at_position5() {
        let palette = palette16();
        let blocks: [[u8; 6]; 4] = [
            [0, 1, 2, 3, 0, 1],
            [0, 0, 1, 1, 2, 2],
            [0, 1, 2, 3, 4, 5],
            [5, 4, 3, 2, 1, 0],
        ];
        for block in blocks {
            let (ch, _) = encode_cell(block, &palette).unwrap();
            assert_eq!(ch & 0x80, 0x80);
            // position 5 is bit index 5 of the *un-inverted* mask; per the
            // character-code contract it must always read as background.
            assert_eq!((ch >> 5) & 1, 0, "position 5 bit must be 0 (bg)");
        }
    }
}
