//! Compressed 32vid frame encoder (spec §4.F/§4.G), ported from
//! `original_source/src/generator.cpp`'s `make32vid_cmp`: a canonical
//! Huffman code over the 32 screen symbols, a second canonical Huffman
//! code over a 24-symbol alphabet (16 literal nibbles plus 8 run-length
//! meta-symbols 16..23) carrying RLE-encoded fg/bg color-nibble streams,
//! and the usual 16-entry `(B,G,R)` palette trailer.
//!
//! The color RLE state machine mirrors the original's `fc`/`fn`/`fset`
//! bookkeeping with one correction: the original never initializes `fc`
//! from the stream's first value, so a first run longer than one pixel
//! emits a spurious leading literal `0` before its real color (see
//! scenario S5 in DESIGN.md). This port primes `c`/`n` from the first
//! pushed value instead, which is what the run-length decomposition was
//! clearly meant to do.

use std::collections::BinaryHeap;
use std::cmp::Reverse;

use super::super::serialize::EncodedFrame;

struct ColorRle {
    c: u8,
    n: u16,
    set: bool,
    primed: bool,
    out: Vec<u8>,
}

fn emit_run_bits(n: u8, c: u8, out: &mut Vec<u8>, weights: &mut [u64; 24]) {
    if n & 1 != 0 {
        out.push(c);
        weights[c as usize] += 1;
    }
    if n & 2 != 0 {
        out.push(16);
        weights[16] += 1;
    }
    if n & 4 != 0 {
        out.push(17);
        weights[17] += 1;
    }
    if n & 8 != 0 {
        out.push(18);
        weights[18] += 1;
    }
    if n & 16 != 0 {
        out.push(19);
        weights[19] += 1;
    }
    if n & 32 != 0 {
        out.push(20);
        weights[20] += 1;
    }
    if n & 64 != 0 {
        out.push(21);
        weights[21] += 1;
    }
    if n & 128 != 0 {
        out.push(22);
        weights[22] += 1;
    }
}

impl ColorRle {
    fn new() -> Self {
        Self { c: 0, n: 0, set: false, primed: false, out: Vec::new() }
    }

    fn push(&mut self, v: u8, weights: &mut [u64; 24]) {
        if !self.primed {
            self.primed = true;
            self.c = v;
            self.n = 1;
            return;
        }
        let mut ok = true;
        if v != self.c || self.n == 255 {
            if !self.set {
                self.out.push(self.c);
                weights[self.c as usize] += 1;
            }
            if v == self.c {
                self.out.push(23);
                weights[23] += 1;
                ok = false;
                self.set = true;
            } else {
                self.set = false;
                self.n -= 1;
                if self.n != 0 {
                    emit_run_bits(self.n as u8, self.c, &mut self.out, weights);
                }
            }
            self.n = 0;
            self.c = v;
        }
        if ok {
            self.n += 1;
        }
    }

    fn finish(&mut self, weights: &mut [u64; 24]) {
        if !self.primed || self.n == 0 {
            return;
        }
        if !self.set {
            self.out.push(self.c);
            weights[self.c as usize] += 1;
        }
        self.n -= 1;
        if self.n != 0 {
            emit_run_bits(self.n as u8, self.c, &mut self.out, weights);
        }
    }
}

struct TreeNode {
    weight: u64,
    data: u8,
    left: i32,
    right: i32,
}

fn walk(arena: &[TreeNode], idx: i32, depth: u8, bits: &mut [u8]) {
    let node = &arena[idx as usize];
    if node.left >= 0 && node.right >= 0 {
        walk(arena, node.left, depth + 1, bits);
        walk(arena, node.right, depth + 1, bits);
    } else {
        bits[node.data as usize] = depth;
    }
}

/// Builds a canonical Huffman codebook for `weights` (index = symbol,
/// value = occurrence count). Entries for zero-weight symbols come back
/// as `(0, 0)`. Caller is responsible for the "only one symbol present"
/// special case; this always builds a real tree.
fn build_huffman(weights: &[u64]) -> Vec<(u8, u16)> {
    let n = weights.len();
    let mut arena: Vec<TreeNode> = Vec::new();
    let mut heap: BinaryHeap<Reverse<(u64, u32, u32)>> = BinaryHeap::new();
    let mut seq = 0u32;
    for (sym, &w) in weights.iter().enumerate() {
        if w > 0 {
            arena.push(TreeNode { weight: w, data: sym as u8, left: -1, right: -1 });
            heap.push(Reverse((w, seq, (arena.len() - 1) as u32)));
            seq += 1;
        }
    }
    if heap.is_empty() {
        return vec![(0, 0); n];
    }
    while heap.len() > 1 {
        let Reverse((wa, _, ia)) = heap.pop().unwrap();
        let Reverse((wb, _, ib)) = heap.pop().unwrap();
        arena.push(TreeNode { weight: wa + wb, data: 0, left: ia as i32, right: ib as i32 });
        let idx = (arena.len() - 1) as u32;
        heap.push(Reverse((wa + wb, seq, idx)));
        seq += 1;
    }
    let Reverse((_, _, root)) = heap.pop().unwrap();

    let mut bits = vec![0u8; n];
    walk(&arena, root as i32, 0, &mut bits);

    let mut order: Vec<usize> = (0..n).filter(|&i| bits[i] > 0).collect();
    order.sort_by(|&a, &b| bits[a].cmp(&bits[b]).then(a.cmp(&b)));

    let mut codes = vec![0u16; n];
    if !order.is_empty() {
        codes[order[0]] = 0;
        for w in 1..order.len() {
            let prev = order[w - 1];
            let cur = order[w];
            codes[cur] = (codes[prev] + 1) << (bits[cur] - bits[prev]);
        }
    }
    (0..n).map(|i| (bits[i], codes[i])).collect()
}

fn pack_bits(out: &mut Vec<u8>, codebook: &[(u8, u16)], symbols: impl Iterator<Item = u8>) {
    let mut tmp: u32 = 0;
    let mut shift: i32 = 32;
    for sym in symbols {
        let (bits, code) = codebook[sym as usize];
        tmp |= (code as u32) << (shift - bits as i32);
        shift -= bits as i32;
        while shift <= 24 {
            out.push((tmp >> 24) as u8);
            tmp <<= 8;
            shift += 8;
        }
    }
    if shift < 32 {
        out.push((tmp >> 24) as u8);
    }
}

fn encode_plane(weights: &[u64], symbols: &[u8], header_len: usize, out: &mut Vec<u8>) {
    let distinct: Vec<u8> = (0..weights.len() as u8).filter(|&i| weights[i as usize] > 0).collect();
    if distinct.len() <= 1 {
        out.extend(std::iter::repeat(0u8).take(header_len));
        out.push(distinct.first().copied().unwrap_or(0));
        return;
    }
    let codebook = build_huffman(weights);
    for pair in codebook.chunks(2) {
        let a = pair[0].0;
        let b = if pair.len() > 1 { pair[1].0 } else { 0 };
        out.push((a << 4) | b);
    }
    pack_bits(out, &codebook, symbols.iter().copied());
}

/// Builds a Huffman-compressed 32vid frame payload: screen plane, color
/// plane, then the fixed 48-byte palette trailer.
pub fn make_32vid_frame_compressed(frame: &EncodedFrame) -> Vec<u8> {
    let mut screen_weights = [0u64; 32];
    let mut color_weights = [0u64; 24];

    let mut fg_rle = ColorRle::new();
    let mut bg_rle = ColorRle::new();

    let screen_symbols: Vec<u8> = frame.characters.iter().map(|&c| c & 0x1F).collect();
    for &s in &screen_symbols {
        screen_weights[s as usize] += 1;
    }
    for &cc in frame.colors {
        fg_rle.push(cc & 0x0F, &mut color_weights);
        bg_rle.push(cc >> 4, &mut color_weights);
    }
    fg_rle.finish(&mut color_weights);
    bg_rle.finish(&mut color_weights);

    let mut out = Vec::new();
    encode_plane(&screen_weights, &screen_symbols, 16, &mut out);

    let mut color_symbols = fg_rle.out;
    color_symbols.extend_from_slice(&bg_rle.out);
    encode_plane(&color_weights, &color_symbols, 12, &mut out);

    for i in 0..16 {
        if i < frame.palette.len() {
            let c = frame.palette[i];
            out.push(c.b);
            out.push(c.g);
            out.push(c.r);
        } else {
            out.extend_from_slice(&[0u8; 3]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;

    /// Scenario S4: frequencies {0:10, 31:1} -> both 1-bit codes, header
    /// byte pair at offset 0 is 0x10 and at offset 15 is 0x01.
    #[test]
    fn s4_canonical_huffman_corner() {
        let mut weights = [0u64; 32];
        weights[0] = 10;
        weights[31] = 1;
        let codebook = build_huffman(&weights);
        assert_eq!(codebook[0], (1, 0));
        assert_eq!(codebook[31], (1, 1));

        let mut header = Vec::new();
        for pair in codebook.chunks(2) {
            header.push((pair[0].0 << 4) | pair[1].0);
        }
        assert_eq!(header[0], 0x10);
        assert_eq!(header[15], 0x01);
    }

    /// Scenario S5: a run of five identical nibbles RLE-decomposes into
    /// a literal followed by a single run-length meta-symbol.
    #[test]
    fn s5_rle_meta_symbol_run_of_five() {
        let mut weights = [0u64; 24];
        let mut rle = ColorRle::new();
        for _ in 0..5 {
            rle.push(5, &mut weights);
        }
        rle.finish(&mut weights);
        assert_eq!(rle.out, vec![5, 17]);
    }

    #[test]
    fn single_distinct_screen_symbol_uses_literal_header() {
        let palette = vec![Rgb::new(1, 1, 1)];
        let characters = [0x80u8; 4];
        let colors = [0x00u8; 4];
        let frame = EncodedFrame {
            width: 2,
            height: 2,
            characters: &characters,
            colors: &colors,
            palette: &palette,
        };
        let out = make_32vid_frame_compressed(&frame);
        assert_eq!(&out[0..16], &[0u8; 16]);
        assert_eq!(out[16], 0x80 & 0x1F);
    }

    #[test]
    fn mixed_frame_round_trips_symbol_counts() {
        let palette = vec![Rgb::new(1, 2, 3), Rgb::new(4, 5, 6)];
        let characters = [0x80u8, 0x81, 0x82, 0x83, 0x84, 0x85];
        let colors = [0x01u8, 0x01, 0x12, 0x12, 0x23, 0x30];
        let frame = EncodedFrame {
            width: 6,
            height: 1,
            characters: &characters,
            colors: &colors,
            palette: &palette,
        };
        let out = make_32vid_frame_compressed(&frame);
        assert!(out.len() > 16 + 12 + 48);
    }
}
