//! sanjuuni-rs: converts images and video frames into ComputerCraft
//! terminal display formats (Lua/BIMG tables, NFP paint images, raw-mode
//! text frames, and the 32vid binary container). See `DESIGN.md` for how
//! each module is grounded.

pub mod cell;
pub mod color;
pub mod dfpwm;
pub mod error;
pub mod frame_source;
pub mod grid;
pub mod mat;
pub mod palette;
pub mod quantize;
pub mod serialize;
pub mod subtitle;
pub mod vid32;
pub mod workqueue;

pub use error::{Result, SanjuuniError};
