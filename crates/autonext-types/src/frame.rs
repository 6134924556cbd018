use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const BYTES_PER_PIXEL: usize = 4;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("provided frame data length {data_len} is smaller than width * height * 4 ({required})")]
    InsufficientData { data_len: usize, required: usize },
    #[error("frame dimensions {width}x{height} are empty")]
    EmptyFrame { width: usize, height: usize },
    #[error("unknown pixel format '{0}'")]
    UnknownFormat(String),
}

/// Byte order of a packed 32-bit pixel as delivered by the host capture call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba,
    Bgra,
}

impl PixelFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            PixelFormat::Rgba => "rgba",
            PixelFormat::Bgra => "bgra",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PixelFormat {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rgba" => Ok(PixelFormat::Rgba),
            "bgra" => Ok(PixelFormat::Bgra),
            other => Err(FrameError::UnknownFormat(other.to_string())),
        }
    }
}

/// A captured video frame as a packed 32-bit pixel buffer.
///
/// Hosts are free to hand back a different size than the one requested from
/// the capture call, so consumers must read `width`/`height` instead of
/// assuming the requested geometry.
#[derive(Debug, Clone)]
pub struct RawFrame {
    width: usize,
    height: usize,
    format: PixelFormat,
    data: Vec<u8>,
}

impl RawFrame {
    pub fn new(
        width: usize,
        height: usize,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::EmptyFrame { width, height });
        }
        let required = width * height * BYTES_PER_PIXEL;
        if data.len() < required {
            return Err(FrameError::InsufficientData {
                data_len: data.len(),
                required,
            });
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Converts the frame to a Rec.601 grayscale plane, one byte per pixel.
    ///
    /// Channel order is corrected per `format`, so BGRA captures produce the
    /// same plane as their RGBA equivalent.
    pub fn luma(&self) -> Vec<u8> {
        let pixels = self.width * self.height;
        let mut plane = Vec::with_capacity(pixels);
        for chunk in self.data[..pixels * BYTES_PER_PIXEL].chunks_exact(BYTES_PER_PIXEL) {
            let (r, g, b) = match self.format {
                PixelFormat::Rgba => (chunk[0], chunk[1], chunk[2]),
                PixelFormat::Bgra => (chunk[2], chunk[1], chunk[0]),
            };
            plane.push(luma_601(r, g, b));
        }
        plane
    }
}

// Integer Rec.601 luma: (77 R + 150 G + 29 B) / 256, rounded.
fn luma_601(r: u8, g: u8, b: u8) -> u8 {
    let weighted = 77 * u32::from(r) + 150 * u32::from(g) + 29 * u32::from(b);
    ((weighted + 128) >> 8) as u8
}
