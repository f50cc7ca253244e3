//! Signal extraction from a captured frame.
//!
//! Reduces a pixel buffer to three scalars: average luminance, the share of
//! dark pixels, and a horizontal-gradient sharpness proxy. Nothing else about
//! the image survives this step.

use crate::camera::PixelBuffer;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rec. 709 luma weights.
const LUMA_R: f64 = 0.2126;
const LUMA_G: f64 = 0.7152;
const LUMA_B: f64 = 0.0722;

/// Pixels darker than this luminance count towards the dark ratio.
pub const DARK_LUMINANCE_THRESHOLD: f64 = 60.0;

/// Errors from signal extraction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("invalid frame: {width}x{height} has no pixels")]
    InvalidFrame { width: u32, height: u32 },
}

/// Scalar signals derived from one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PixelSignals {
    /// Mean luminance over all pixels (0-255)
    pub avg_luminance: f64,
    /// Fraction of pixels with luminance below the dark threshold (0-1)
    pub dark_ratio: f64,
    /// Sum of horizontal RGB differences divided by the pixel count
    pub sharpness: f64,
}

/// Perceptual luminance of one RGB pixel.
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    LUMA_R * r as f64 + LUMA_G * g as f64 + LUMA_B * b as f64
}

/// Compute the signals for a frame in a single pass.
///
/// Pixels in the first column have no left neighbour and contribute nothing
/// to the gradient sum; the sum is still normalised by the full pixel count.
pub fn extract_signals(frame: &PixelBuffer) -> Result<PixelSignals, SignalError> {
    if frame.is_empty() {
        return Err(SignalError::InvalidFrame {
            width: frame.width(),
            height: frame.height(),
        });
    }

    let mut luminance_sum = 0.0;
    let mut dark_count: u64 = 0;
    let mut gradient_sum: u64 = 0;

    for row in frame.rows() {
        let mut previous: Option<&[u8]> = None;
        for px in row.chunks_exact(3) {
            let lum = luminance(px[0], px[1], px[2]);
            luminance_sum += lum;
            if lum < DARK_LUMINANCE_THRESHOLD {
                dark_count += 1;
            }
            if let Some(left) = previous {
                gradient_sum += px
                    .iter()
                    .zip(left)
                    .map(|(&a, &b)| a.abs_diff(b) as u64)
                    .sum::<u64>();
            }
            previous = Some(px);
        }
    }

    let area = frame.area() as f64;
    Ok(PixelSignals {
        avg_luminance: luminance_sum / area,
        dark_ratio: dark_count as f64 / area,
        sharpness: gradient_sum as f64 / area,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Vertical stripes alternating between two colors.
    fn stripes(width: u32, height: u32, a: [u8; 3], b: [u8; 3]) -> PixelBuffer {
        let mut rgb = Vec::new();
        for _ in 0..height {
            for x in 0..width {
                rgb.extend_from_slice(if x % 2 == 0 { &a } else { &b });
            }
        }
        PixelBuffer::from_rgb(width, height, rgb).unwrap()
    }

    #[test]
    fn test_zero_area_frame_rejected() {
        let frame = PixelBuffer::from_rgb(0, 0, Vec::new()).unwrap();
        assert_eq!(
            extract_signals(&frame),
            Err(SignalError::InvalidFrame {
                width: 0,
                height: 0
            })
        );
    }

    #[test]
    fn test_uniform_frame() {
        let frame = PixelBuffer::solid(4, 3, [100, 100, 100]);
        let signals = extract_signals(&frame).unwrap();
        assert!((signals.avg_luminance - 100.0).abs() < 1e-9);
        assert_eq!(signals.dark_ratio, 0.0);
        assert_eq!(signals.sharpness, 0.0);
    }

    #[test]
    fn test_black_frame_is_all_dark() {
        let frame = PixelBuffer::solid(3, 3, [0, 0, 0]);
        let signals = extract_signals(&frame).unwrap();
        assert_eq!(signals.avg_luminance, 0.0);
        assert_eq!(signals.dark_ratio, 1.0);
    }

    #[test]
    fn test_sharpness_from_horizontal_edges() {
        // 2x1: one edge of |255-0| * 3 channels, normalised by 2 pixels
        let frame = stripes(2, 1, [0, 0, 0], [255, 255, 255]);
        let signals = extract_signals(&frame).unwrap();
        assert_eq!(signals.sharpness, 765.0 / 2.0);
        assert_eq!(signals.dark_ratio, 0.5);
    }

    #[test]
    fn test_vertical_edges_do_not_count() {
        let mut rgb = vec![0u8; 3];
        rgb.extend_from_slice(&[255, 255, 255]);
        let frame = PixelBuffer::from_rgb(1, 2, rgb).unwrap();
        assert_eq!(extract_signals(&frame).unwrap().sharpness, 0.0);
    }

    #[test]
    fn test_deterministic() {
        let frame = stripes(64, 48, [12, 200, 40], [90, 10, 250]);
        let first = extract_signals(&frame).unwrap();
        let second = extract_signals(&frame.clone()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_luminance_weights() {
        assert!((luminance(255, 255, 255) - 255.0).abs() < 1e-9);
        assert!((luminance(255, 0, 0) - 54.213).abs() < 1e-9);
    }
}
