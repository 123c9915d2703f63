//! Frame acquisition boundary (spec §1 Non-goals: media demuxing is out
//! of scope for the core pipeline, but the CLI still needs a concrete
//! source of RGB frames to feed it). `PngFrameSource` is the CLI's
//! single-image implementation, backed by the `image` crate; anything
//! that demuxes video/audio containers is expected to implement
//! [`FrameSource`] itself and hand frames to the same pipeline.

use std::path::Path;

use crate::color::Rgb;
use crate::error::{Result, SanjuuniError};
use crate::mat::Mat;

/// A source of successive RGB frames. A single still image is a source
/// that yields exactly one frame.
pub trait FrameSource {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    /// Frames per second, for container headers and subtitle timing.
    fn fps(&self) -> u8;
    /// Pulls the next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Mat<Rgb>>>;
}

/// A `FrameSource` that yields a single decoded still image.
pub struct PngFrameSource {
    image: Option<Mat<Rgb>>,
    width: usize,
    height: usize,
}

impl PngFrameSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let img = image::open(path.as_ref())
            .map_err(|e| SanjuuniError::OutOfRange(format!("failed to decode image: {e}")))?
            .to_rgb8();
        let (width, height) = (img.width() as usize, img.height() as usize);
        let data: Vec<Rgb> = img.pixels().map(|p| Rgb::new(p[0], p[1], p[2])).collect();
        Ok(PngFrameSource { image: Some(Mat::from_vec(width, height, data)), width, height })
    }
}

impl FrameSource for PngFrameSource {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn fps(&self) -> u8 {
        0
    }

    fn next_frame(&mut self) -> Result<Option<Mat<Rgb>>> {
        Ok(self.image.take())
    }
}
