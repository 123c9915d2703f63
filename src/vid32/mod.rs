//! The 32vid container format (spec §3, §4.G): a 12-byte file header and
//! a sequence of typed chunks (video, audio, subtitles). Video planes can
//! be written uncompressed (`uncompressed`) or canonical-Huffman-coded
//! (`huffman`); `ans` is a separate table-based rANS decoder ported from
//! a different original tool and is not the decode half of `huffman`'s
//! output (see DESIGN.md open question 9).

pub mod ans;
pub mod container;
pub mod huffman;
pub mod uncompressed;

pub use container::{Vid32ChunkHeader, Vid32Header, Vid32SubtitleEvent};
