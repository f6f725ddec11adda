//! Decoded RGB frames. Uploads and reference photos share this type.

use std::path::Path;
use thiserror::Error;

const RGB_CHANNELS: usize = 3;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("cannot decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("image has zero area ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

/// An 8-bit RGB image, row-major and interleaved (`R, G, B, R, G, B, ...`).
#[derive(Clone)]
pub struct Frame {
    /// Pixel data (width * height * 3 bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl Frame {
    /// Decode an in-memory image of any format the `image` crate recognises.
    ///
    /// Grayscale and alpha inputs are converted to RGB.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        let img = image::load_from_memory(bytes)?;
        Self::from_rgb(img.to_rgb8())
    }

    /// Read and decode an image file from disk.
    pub fn open(path: &Path) -> Result<Self, FrameError> {
        let bytes = std::fs::read(path).map_err(|source| FrameError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::decode(&bytes)
    }

    fn from_rgb(img: image::RgbImage) -> Result<Self, FrameError> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(FrameError::Empty { width, height });
        }
        Ok(Self {
            data: img.into_raw(),
            width,
            height,
        })
    }

    /// RGB triple at (x, y). Caller guarantees the coordinates are in bounds.
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let off = (y * self.width as usize + x) * RGB_CHANNELS;
        [self.data[off], self.data[off + 1], self.data[off + 2]]
    }
}
