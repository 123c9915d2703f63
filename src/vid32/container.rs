//! 32vid container framing (spec §4.G), ported from the `Vid32Header`,
//! `Vid32Chunk`, and `Vid32SubtitleEvent` structs in
//! `original_source/src/sanjuuni.hpp`.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, SanjuuniError};

pub const MAGIC: [u8; 4] = *b"32VD";

pub const VIDEO_COMPRESSION_NONE: u16 = 0x0000;
pub const VIDEO_COMPRESSION_ANS: u16 = 0x0001;
pub const VIDEO_COMPRESSION_DEFLATE: u16 = 0x0002;
pub const VIDEO_COMPRESSION_CUSTOM: u16 = 0x0003;
pub const AUDIO_COMPRESSION_DFPWM: u16 = 0x0004;
pub const VIDEO_5BIT_CODES: u16 = 0x0010;
pub const VIDEO_MULTIMONITOR: u16 = 0x0020;

/// The 12-byte file header: magic, frame dimensions, frame rate, stream
/// count, and a compression/feature flag bitfield.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vid32Header {
    pub width: u16,
    pub height: u16,
    pub fps: u8,
    pub nstreams: u8,
    pub flags: u16,
}

impl Vid32Header {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&MAGIC);
        buf.put_u16_le(self.width);
        buf.put_u16_le(self.height);
        buf.put_u8(self.fps);
        buf.put_u8(self.nstreams);
        buf.put_u16_le(self.flags);
    }

    pub fn decode(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < 12 {
            return Err(SanjuuniError::Truncated(12));
        }
        let mut magic = [0u8; 4];
        buf.copy_to_slice(&mut magic);
        if magic != MAGIC {
            return Err(SanjuuniError::BadMagic(u32::from_le_bytes(magic) as u64));
        }
        Ok(Vid32Header {
            width: buf.get_u16_le(),
            height: buf.get_u16_le(),
            fps: buf.get_u8(),
            nstreams: buf.get_u8(),
            flags: buf.get_u16_le(),
        })
    }
}

/// A chunk header: payload size, frame count within the chunk, and a
/// stream type tag (video, audio, subtitle track, ...). `data` follows
/// immediately after in the file and is handled by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vid32ChunkHeader {
    pub size: u32,
    pub nframes: u32,
    pub chunk_type: u8,
}

pub const CHUNK_VIDEO: u8 = 0;
pub const CHUNK_AUDIO: u8 = 1;
pub const CHUNK_SUBTITLE: u8 = 8;
pub const CHUNK_COMBINED: u8 = 12;
pub const CHUNK_COMBINED_INDEX: u8 = 13;

impl Vid32ChunkHeader {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.size);
        buf.put_u32_le(self.nframes);
        buf.put_u8(self.chunk_type);
    }

    pub fn decode(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < 9 {
            return Err(SanjuuniError::Truncated(9));
        }
        Ok(Vid32ChunkHeader {
            size: buf.get_u32_le(),
            nframes: buf.get_u32_le(),
            chunk_type: buf.get_u8(),
        })
    }
}

/// A single burned-in subtitle cue, as packed into the subtitle stream:
/// start frame, duration in frames, cell position, color nibble pair,
/// flags, and the UTF-8 text payload (length-prefixed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vid32SubtitleEvent {
    pub start: u32,
    pub length: u32,
    pub x: u16,
    pub y: u16,
    pub colors: u8,
    pub flags: u8,
    pub text: String,
}

impl Vid32SubtitleEvent {
    pub fn encoded_len(&self) -> usize {
        16 + self.text.len()
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.start);
        buf.put_u32_le(self.length);
        buf.put_u16_le(self.x);
        buf.put_u16_le(self.y);
        buf.put_u8(self.colors);
        buf.put_u8(self.flags);
        buf.put_u16_le(self.text.len() as u16);
        buf.put_slice(self.text.as_bytes());
    }

    pub fn decode(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < 16 {
            return Err(SanjuuniError::Truncated(16));
        }
        let start = buf.get_u32_le();
        let length = buf.get_u32_le();
        let x = buf.get_u16_le();
        let y = buf.get_u16_le();
        let colors = buf.get_u8();
        let flags = buf.get_u8();
        let size = buf.get_u16_le() as usize;
        if buf.remaining() < size {
            return Err(SanjuuniError::Truncated(size as u64));
        }
        let mut text = vec![0u8; size];
        buf.copy_to_slice(&mut text);
        let text = String::from_utf8_lossy(&text).into_owned();
        Ok(Vid32SubtitleEvent { start, length, x, y, colors, flags, text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let h = Vid32Header { width: 160, height: 90, fps: 20, nstreams: 1, flags: VIDEO_COMPRESSION_CUSTOM | VIDEO_5BIT_CODES };
        let mut buf = BytesMut::new();
        h.encode(&mut buf);
        assert_eq!(buf.len(), 12);
        let mut reader = &buf[..];
        let back = Vid32Header::decode(&mut reader).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut buf = BytesMut::new();
        buf.put_slice(b"NOPE");
        buf.put_bytes(0, 8);
        let mut reader = &buf[..];
        assert!(Vid32Header::decode(&mut reader).is_err());
    }

    #[test]
    fn subtitle_event_round_trips() {
        let ev = Vid32SubtitleEvent {
            start: 10,
            length: 30,
            x: 2,
            y: 3,
            colors: 0xF0,
            flags: 0,
            text: "hello".to_string(),
        };
        let mut buf = BytesMut::new();
        ev.encode(&mut buf);
        assert_eq!(buf.len(), ev.encoded_len());
        let mut reader = &buf[..];
        let back = Vid32SubtitleEvent::decode(&mut reader).unwrap();
        assert_eq!(back, ev);
    }
}
