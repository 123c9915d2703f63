//! Raw-mode serializer (spec §4.F), ported from
//! `original_source/src/generator.cpp`'s `makeRawImage`: a little-endian
//! header, RLE-encoded screen and color planes, a zero-padded 16-entry
//! `(B,G,R)` palette, base64-encoded and framed with a `!CPC`/`!CPD`
//! length+CRC32 prefix/suffix.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::EncodedFrame;

fn rle_encode(plane: &[u8], out: &mut Vec<u8>) {
    if plane.is_empty() {
        return;
    }
    let mut c = plane[0];
    let mut n: u8 = 0;
    for &byte in plane {
        if byte != c || n == 255 {
            out.push(c);
            out.push(n);
            c = byte;
            n = 0;
        }
        n += 1;
    }
    if n > 0 {
        out.push(c);
        out.push(n);
    }
}

pub fn make_raw_image(frame: &EncodedFrame) -> String {
    let mut buf = Vec::new();
    buf.extend_from_slice(&[0u8; 4]);
    buf.extend_from_slice(&(frame.width as u16).to_le_bytes());
    buf.extend_from_slice(&(frame.height as u16).to_le_bytes());
    buf.extend_from_slice(&[0u8; 8]);

    rle_encode(frame.characters, &mut buf);
    rle_encode(frame.colors, &mut buf);

    for i in 0..16 {
        if i < frame.palette.len() {
            let c = frame.palette[i];
            buf.push(c.b);
            buf.push(c.g);
            buf.push(c.r);
        } else {
            buf.extend_from_slice(&[0u8; 3]);
        }
    }

    let crc = crc32fast::hash(&buf);
    let encoded: String = STANDARD
        .encode(&buf)
        .chars()
        .filter(|&c| c != '\n' && c != '\r')
        .collect();

    if encoded.len() > 65535 {
        format!("!CPD{:012X}{}{:08x}\n", encoded.len(), encoded, crc)
    } else {
        format!("!CPC{:04X}{}{:08x}\n", encoded.len(), encoded, crc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;

    /// Scenario S3 from spec §8: 2x2 frame, uniform RLE runs, empty palette.
    #[test]
    fn s3_raw_mode_header_and_framing() {
        let palette: Vec<Rgb> = vec![];
        let frame = EncodedFrame {
            width: 2,
            height: 2,
            characters: &[0x80, 0x80, 0x81, 0x81],
            colors: &[0xF0, 0xF0, 0xF0, 0xF0],
            palette: &palette,
        };

        let mut expected = Vec::new();
        expected.extend_from_slice(&[0u8; 4]);
        expected.extend_from_slice(&2u16.to_le_bytes());
        expected.extend_from_slice(&2u16.to_le_bytes());
        expected.extend_from_slice(&[0u8; 8]);
        expected.extend_from_slice(&[0x80, 0x02, 0x81, 0x02]);
        expected.extend_from_slice(&[0xF0, 0x04]);
        expected.extend_from_slice(&[0u8; 48]);

        let crc = crc32fast::hash(&expected);
        let b64 = STANDARD.encode(&expected);

        let out = make_raw_image(&frame);
        assert!(out.starts_with("!CPC"));
        assert!(out.ends_with(&format!("{crc:08x}\n")));
        assert!(out.contains(&b64));
    }

    #[test]
    fn large_frames_use_cpd_framing() {
        let palette = vec![Rgb::new(1, 2, 3)];
        let w = 300;
        let h = 300;
        let characters: Vec<u8> = (0..w * h).map(|i| 0x80 | (i % 2) as u8).collect();
        let colors: Vec<u8> = (0..w * h).map(|i| (i % 16) as u8).collect();
        let frame = EncodedFrame {
            width: w,
            height: h,
            characters: &characters,
            colors: &colors,
            palette: &palette,
        };
        let out = make_raw_image(&frame);
        assert!(out.starts_with("!CPD"));
    }
}
