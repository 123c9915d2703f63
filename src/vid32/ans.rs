//! Table-based rANS decoder for compressed 32vid video chunks, ported
//! from `original_source/tools/32vid-player.cpp`'s `Vid32Decoder`.
//!
//! Each plane (screen, fg color, bg color) is decoded independently from
//! its own byte slice: a 1-byte range parameter `R`, a packed table of
//! quasi-log symbol frequencies, then the rANS-coded bitstream. The
//! color planes reuse the screen/color RLE meta-symbol alphabet (spec
//! §4.G): decoded symbols `>= 16` are runs of `2^(sym-15)` repeats of
//! the previously decoded symbol, not literal values.

use crate::error::{Result, SanjuuniError};

struct DecEntry {
    x: u32,
    n: u32,
    sym: u8,
}

fn log2i(n: u32) -> u32 {
    if n == 0 {
        0
    } else {
        31 - n.leading_zeros()
    }
}

/// A single rANS-coded plane: the frequency table plus a cursor into the
/// coded bitstream. `is_color` selects the 24-symbol color alphabet
/// (with its run-length meta-symbols) over the 32-symbol screen one.
pub struct AnsDecoder<'a> {
    table: Vec<DecEntry>,
    buf: &'a [u8],
    pos: usize,
    x: u32,
    partial: u64,
    bits: u32,
    r: u8,
    is_color: bool,
    constant: bool,
}

impl<'a> AnsDecoder<'a> {
    /// `data` starts at the plane's 1-byte `R` field.
    pub fn new(data: &'a [u8], is_color: bool) -> Result<Self> {
        if data.is_empty() {
            return Err(SanjuuniError::Truncated(1));
        }
        let r = data[0];
        let n_ls: usize = if is_color { 24 } else { 32 };
        let table_bytes = n_ls / 2;
        if data.len() < 1 + table_bytes {
            return Err(SanjuuniError::Truncated((1 + table_bytes) as u64));
        }
        let mut ls = vec![0u32; n_ls];
        for i in 0..table_bytes {
            let b = data[1 + i];
            ls[i * 2] = (b >> 4) as u32;
            ls[i * 2 + 1] = (b & 0x0F) as u32;
        }

        let header_len = 1 + table_bytes;
        let buf = &data[header_len..];

        if r == 0 {
            if buf.is_empty() {
                return Err(SanjuuniError::Truncated(1));
            }
            return Ok(AnsDecoder {
                table: vec![DecEntry { x: 0, n: 1, sym: buf[0] }],
                buf: &buf[1..],
                pos: 0,
                x: u32::MAX,
                partial: 0,
                bits: 0,
                r,
                is_color,
                constant: true,
            });
        }

        let l: u32 = 1 << r;
        let lm = l - 1;
        for v in ls.iter_mut() {
            if *v != 0 {
                *v = 1 << (*v - 1);
            }
        }

        let step = (l >> 1) + (l >> 3) + 3;
        let mut symbol = vec![0xFFu8; l as usize];
        let mut next = vec![0u32; n_ls];
        let mut x: u32 = 0;
        for i in 0..n_ls {
            next[i] = ls[i];
            for _ in 0..ls[i] {
                while symbol[x as usize] != 0xFF {
                    x = (x + 1) & lm;
                }
                symbol[x as usize] = i as u8;
                x = (x + step) & lm;
            }
        }

        let mut table = Vec::with_capacity(l as usize);
        for xi in 0..l {
            let s = symbol[xi as usize] as usize;
            let n = r as u32 - log2i(next[s]);
            let entry_x = (next[s] << n) - l;
            next[s] += 1;
            table.push(DecEntry { x: entry_x, n, sym: s as u8 });
        }

        let mut dec = AnsDecoder {
            table,
            buf,
            pos: 0,
            x: 0,
            partial: 0,
            bits: 0,
            r,
            is_color,
            constant: false,
        };
        dec.x = dec.readbits(r as u32);
        Ok(dec)
    }

    fn readbits(&mut self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        while self.bits < n {
            let byte = self.buf.get(self.pos).copied().unwrap_or(0);
            self.pos += 1;
            self.bits += 8;
            self.partial = (self.partial << 8) | byte as u64;
        }
        let retval = (self.partial >> (self.bits - n)) & ((1u64 << n) - 1);
        self.bits -= n;
        retval as u32
    }

    /// Decodes `nsym` symbols. For color planes, run-length meta-symbols
    /// expand in place, so the returned vector always has exactly
    /// `nsym` entries of literal (already-expanded) nibble values.
    pub fn read(&mut self, nsym: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(nsym);
        if self.constant {
            out.resize(nsym, self.table[0].sym);
            return out;
        }
        let mut last = 0u8;
        while out.len() < nsym {
            let t_x = self.x as usize;
            let (entry_x, entry_n, entry_sym) = {
                let t = &self.table[t_x];
                (t.x, t.n, t.sym)
            };
            if self.is_color && entry_sym >= 16 {
                let l = 1usize << (entry_sym - 15);
                let remaining = nsym - out.len();
                for _ in 0..l.min(remaining) {
                    out.push(last);
                }
            } else {
                out.push(entry_sym);
                last = entry_sym;
            }
            let add = self.readbits(entry_n);
            self.x = entry_x + add;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scenario S6: R=0 always decodes to the packed literal symbol,
    /// regardless of any further bytes in the buffer.
    #[test]
    fn s6_constant_plane_ignores_trailing_bytes() {
        let mut data = vec![0u8]; // R = 0
        data.extend_from_slice(&[0u8; 16]); // unused table for screen alphabet
        data.push(7); // literal symbol
        data.extend_from_slice(&[0xFF, 0xFF, 0xFF]); // garbage trailing bytes
        let mut dec = AnsDecoder::new(&data, false).unwrap();
        let out = dec.read(10);
        assert_eq!(out, vec![7u8; 10]);
    }

    #[test]
    fn log2i_matches_bit_length_minus_one() {
        assert_eq!(log2i(1), 0);
        assert_eq!(log2i(2), 1);
        assert_eq!(log2i(7), 2);
        assert_eq!(log2i(8), 3);
    }
}
