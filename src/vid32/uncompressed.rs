//! Uncompressed 32vid frame serializer (spec §4.F), ported from
//! `original_source/src/generator.cpp`'s `make32vid`: packs eight 5-bit
//! character codes into 5 bytes (40 bits) per group, big-endian within
//! the group, left-padding the final partial group with zero bits.

use crate::serialize::EncodedFrame;

pub fn make_32vid_frame(frame: &EncodedFrame) -> Vec<u8> {
    let mut screen = Vec::new();
    let mut next5bit: u64 = 0;
    let mut pos: u8 = 0;

    for &c in frame.characters {
        next5bit = (next5bit << 5) | (c & 0x1F) as u64;
        pos += 1;
        if pos == 8 {
            screen.push((next5bit >> 32) as u8);
            screen.push((next5bit >> 24) as u8);
            screen.push((next5bit >> 16) as u8);
            screen.push((next5bit >> 8) as u8);
            screen.push(next5bit as u8);
            next5bit = 0;
            pos = 0;
        }
    }
    if pos != 0 {
        next5bit <<= (8 - pos) as u32 * 5;
        screen.push((next5bit >> 32) as u8);
        screen.push((next5bit >> 24) as u8);
        screen.push((next5bit >> 16) as u8);
        screen.push((next5bit >> 8) as u8);
        screen.push(next5bit as u8);
    }

    let mut out = screen;
    out.extend_from_slice(frame.colors);
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

    #[test]
    fn packs_eight_codes_into_five_bytes() {
        let palette = vec![];
        let characters = [0x80u8, 0x81, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87];
        let colors = [0u8; 8];
        let frame = EncodedFrame {
            width: 8,
            height: 1,
            characters: &characters,
            colors: &colors,
            palette: &palette,
        };
        let out = make_32vid_frame(&frame);
        // screen plane is exactly 5 bytes for 8 codes
        assert_eq!(&out[0..5].len(), &5);
        // followed by 8 color bytes, then 48 palette bytes
        assert_eq!(out.len(), 5 + 8 + 48);
    }

    #[test]
    fn partial_group_is_left_padded() {
        let palette = vec![Rgb::new(1, 2, 3)];
        let characters = [0x9Fu8, 0x80, 0x80];
        let colors = [0u8; 3];
        let frame = EncodedFrame {
            width: 3,
            height: 1,
            characters: &characters,
            colors: &colors,
            palette: &palette,
        };
        let out = make_32vid_frame(&frame);
        assert_eq!(out.len(), 5 + 3 + 48);
    }
}
