//! NFP (paint-format) serializer (spec §4.F), ported from
//! `original_source/src/generator.cpp`'s `makeNFP`.
//!
//! The original indexes each cell with `y*height+x`, which only agrees
//! with `y*width+x` on square frames; that's an indexing bug, not a
//! documented convention, so it's corrected here (see DESIGN.md).

use super::EncodedFrame;

const HEX: &[u8; 16] = b"0123456789abcdef";

pub fn make_nfp(frame: &EncodedFrame) -> String {
    let mut out = String::new();
    for y in 0..frame.height {
        let mut lines = [String::new(), String::new(), String::new()];
        for x in 0..frame.width {
            let offset = y * frame.width + x;
            let cc = frame.colors[offset];
            let fg = HEX[(cc & 0xf) as usize] as char;
            let bg = HEX[(cc >> 4) as usize] as char;
            let ch = frame.characters[offset];
            lines[0].push(if ch & 1 != 0 { fg } else { bg });
            lines[0].push(if ch & 2 != 0 { fg } else { bg });
            lines[1].push(if ch & 4 != 0 { fg } else { bg });
            lines[1].push(if ch & 8 != 0 { fg } else { bg });
            lines[2].push(if ch & 16 != 0 { fg } else { bg });
            lines[2].push(bg);
        }
        out.push_str(&lines[0]);
        out.push('\n');
        out.push_str(&lines[1]);
        out.push('\n');
        out.push_str(&lines[2]);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;

    #[test]
    fn bottom_right_subcell_is_always_background() {
        let palette = vec![Rgb::new(255, 255, 255), Rgb::new(0, 0, 0)];
        // char with every bit set: mask = 0x1F, so position 5 (bit 5) would
        // be foreground if it were addressable at all -- it never is.
        let frame = EncodedFrame {
            width: 1,
            height: 1,
            characters: &[0x9F],
            colors: &[0x01],
            palette: &palette,
        };
        let nfp = make_nfp(&frame);
        let lines: Vec<&str> = nfp.lines().collect();
        assert_eq!(lines[2].chars().nth(1).unwrap(), '0');
    }

    #[test]
    fn three_lines_per_cell_row() {
        let palette = vec![Rgb::new(255, 255, 255)];
        let frame = EncodedFrame {
            width: 2,
            height: 2,
            characters: &[0x80, 0x80, 0x80, 0x80],
            colors: &[0x00, 0x00, 0x00, 0x00],
            palette: &palette,
        };
        let nfp = make_nfp(&frame);
        assert_eq!(nfp.lines().count(), 6);
    }
}
