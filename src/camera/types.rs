//! Privacy-preserving frame types for the camera collaborator.
//!
//! A [`PixelBuffer`] is the only form image data ever takes inside the crate.
//! It holds a single still frame as packed RGB bytes and wipes them on drop.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Which physical camera to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Front camera, pointed at the user
    #[default]
    User,
    /// Rear camera
    Environment,
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facing::User => write!(f, "user"),
            Facing::Environment => write!(f, "environment"),
        }
    }
}

impl FromStr for Facing {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" | "front" => Ok(Facing::User),
            "environment" | "rear" | "back" => Ok(Facing::Environment),
            other => Err(CameraError::DeviceError(format!(
                "unknown camera facing '{other}'"
            ))),
        }
    }
}

/// Errors reported by a camera device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("camera device error: {0}")]
    DeviceError(String),

    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}

/// A single captured frame as packed 8-bit RGB.
///
/// Bytes are zeroized when the buffer is dropped, so discarding the buffer
/// also destroys the image.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
}

impl PixelBuffer {
    /// Build a buffer from packed RGB bytes (3 bytes per pixel, row-major).
    pub fn from_rgb(width: u32, height: u32, rgb: Vec<u8>) -> Result<Self, CameraError> {
        let expected = frame_len(width, height, 3).ok_or_else(|| too_large(width, height))?;
        if rgb.len() != expected {
            return Err(CameraError::InvalidFrame(format!(
                "expected {expected} RGB bytes for {width}x{height}, got {}",
                rgb.len()
            )));
        }
        Ok(Self { width, height, rgb })
    }

    /// Build a buffer from packed RGBA bytes, as produced by a canvas readback.
    ///
    /// The alpha channel is dropped.
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> Result<Self, CameraError> {
        let expected = frame_len(width, height, 4).ok_or_else(|| too_large(width, height))?;
        if rgba.len() != expected {
            return Err(CameraError::InvalidFrame(format!(
                "expected {expected} RGBA bytes for {width}x{height}, got {}",
                rgba.len()
            )));
        }
        let rgb = rgba
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        Ok(Self { width, height, rgb })
    }

    /// A buffer filled with one color.
    ///
    /// Dimensions too large to address give an empty 0x0 buffer.
    pub fn solid(width: u32, height: u32, color: [u8; 3]) -> Self {
        let Some(len) = frame_len(width, height, 3) else {
            return Self {
                width: 0,
                height: 0,
                rgb: Vec::new(),
            };
        };
        let rgb = color.iter().copied().cycle().take(len).collect();
        Self { width, height, rgb }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels.
    pub fn area(&self) -> usize {
        self.rgb.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }

    /// RGB value at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        Some([self.rgb[i], self.rgb[i + 1], self.rgb[i + 2]])
    }

    /// Iterate over rows of packed RGB bytes.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        // chunks_exact panics on a zero chunk size
        let stride = (self.width as usize).saturating_mul(3).max(1);
        self.rgb.chunks_exact(stride).take(self.height as usize)
    }
}

/// Byte length of a `width` x `height` frame, or `None` if it overflows `usize`.
pub(crate) fn frame_len(width: u32, height: u32, channels: usize) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(channels)
}

fn too_large(width: u32, height: u32) -> CameraError {
    CameraError::InvalidFrame(format!("{width}x{height} is too large to address"))
}

// Never print pixel data.
impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// A camera device that can be opened, read once, and released.
///
/// `release` must be idempotent: it may be called on a stream that was
/// already released.
pub trait CameraDevice {
    /// Handle to an open live stream.
    type Stream;

    /// Request exclusive access to the camera.
    fn acquire(&self, facing: Facing) -> Result<Self::Stream, CameraError>;

    /// Snapshot the current frame of an open stream.
    fn frame(&self, stream: &mut Self::Stream) -> Result<PixelBuffer, CameraError>;

    /// Stop the device and detach the stream.
    fn release(&self, stream: &mut Self::Stream);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_length_checked() {
        assert!(PixelBuffer::from_rgb(2, 2, vec![0; 12]).is_ok());
        assert!(matches!(
            PixelBuffer::from_rgb(2, 2, vec![0; 11]),
            Err(CameraError::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_rgba_drops_alpha() {
        let rgba = [10, 20, 30, 255, 40, 50, 60, 0];
        let buffer = PixelBuffer::from_rgba(2, 1, &rgba).unwrap();
        assert_eq!(buffer.pixel(0, 0), Some([10, 20, 30]));
        assert_eq!(buffer.pixel(1, 0), Some([40, 50, 60]));
        assert_eq!(buffer.pixel(2, 0), None);
    }

    #[test]
    fn test_zero_area_buffer_is_empty() {
        let buffer = PixelBuffer::from_rgb(0, 10, Vec::new()).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.rows().count(), 0);
    }

    #[test]
    fn test_oversized_dimensions_rejected() {
        assert!(matches!(
            PixelBuffer::from_rgb(u32::MAX, u32::MAX, Vec::new()),
            Err(CameraError::InvalidFrame(_))
        ));
        assert!(matches!(
            PixelBuffer::from_rgba(u32::MAX, u32::MAX, &[]),
            Err(CameraError::InvalidFrame(_))
        ));
        assert!(PixelBuffer::solid(u32::MAX, u32::MAX, [0, 0, 0]).is_empty());
    }

    #[test]
    fn test_debug_hides_pixels() {
        let buffer = PixelBuffer::solid(1, 1, [1, 2, 3]);
        let debug = format!("{buffer:?}");
        assert!(debug.contains("width"));
        assert!(!debug.contains("rgb"));
    }

    #[test]
    fn test_facing_parsing() {
        assert_eq!("user".parse::<Facing>().unwrap(), Facing::User);
        assert_eq!("Environment".parse::<Facing>().unwrap(), Facing::Environment);
        assert!("sideways".parse::<Facing>().is_err());
    }
}
