//! Frame serializers (spec §4.F): Lua/BIMG table, NFP, raw-mode, and
//! uncompressed 32vid. Each takes the screen plane (character bytes),
//! color plane (color bytes), and palette produced by the pipeline and
//! emits one output blob.

pub mod lua;
pub mod nfp;
pub mod raw;

/// A single encoded frame: parallel character/color planes plus the
/// palette in effect when it was produced.
pub struct EncodedFrame<'a> {
    pub width: usize,
    pub height: usize,
    pub characters: &'a [u8],
    pub colors: &'a [u8],
    pub palette: &'a [crate::color::Rgb],
}

impl<'a> EncodedFrame<'a> {
    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }
}
