//! Replay camera serving a fixed frame.
//!
//! Used by the CLI (`aura scan --frame photo.ppm`) and by tests. It counts
//! open streams so callers can verify that every acquisition was released.

use crate::camera::types::{frame_len, CameraDevice, CameraError, Facing, PixelBuffer};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Open stream handed out by [`ReplayCamera`].
#[derive(Debug)]
pub struct ReplayStream {
    facing: Facing,
    live: bool,
}

impl ReplayStream {
    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn is_live(&self) -> bool {
        self.live
    }
}

/// A camera that replays one frame, or refuses access.
#[derive(Debug)]
pub struct ReplayCamera {
    frame: Option<PixelBuffer>,
    refusal: Option<CameraError>,
    open_streams: Arc<AtomicUsize>,
    acquisitions: AtomicUsize,
}

impl ReplayCamera {
    /// Camera whose every capture returns `frame`.
    pub fn new(frame: PixelBuffer) -> Self {
        Self {
            frame: Some(frame),
            refusal: None,
            open_streams: Arc::new(AtomicUsize::new(0)),
            acquisitions: AtomicUsize::new(0),
        }
    }

    /// Camera whose permission prompt is always declined.
    pub fn denied() -> Self {
        Self::refusing(CameraError::PermissionDenied)
    }

    /// Camera that fails to open with the given error.
    pub fn refusing(error: CameraError) -> Self {
        Self {
            frame: None,
            refusal: Some(error),
            open_streams: Arc::new(AtomicUsize::new(0)),
            acquisitions: AtomicUsize::new(0),
        }
    }

    /// Camera replaying a binary PPM (P6) image.
    pub fn from_ppm_file(path: &Path) -> Result<Self, CameraError> {
        let bytes = std::fs::read(path)
            .map_err(|e| CameraError::DeviceError(format!("cannot read {path:?}: {e}")))?;
        Ok(Self::new(parse_ppm(&bytes)?))
    }

    /// Number of streams acquired and not yet released.
    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }

    /// Shared handle to the open-stream counter.
    pub fn open_stream_counter(&self) -> Arc<AtomicUsize> {
        self.open_streams.clone()
    }

    /// Number of successful acquisitions over the camera's lifetime.
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }
}

impl CameraDevice for ReplayCamera {
    type Stream = ReplayStream;

    fn acquire(&self, facing: Facing) -> Result<ReplayStream, CameraError> {
        if let Some(ref error) = self.refusal {
            return Err(error.clone());
        }
        self.open_streams.fetch_add(1, Ordering::SeqCst);
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        Ok(ReplayStream { facing, live: true })
    }

    fn frame(&self, stream: &mut ReplayStream) -> Result<PixelBuffer, CameraError> {
        if !stream.live {
            return Err(CameraError::DeviceError("stream already released".to_string()));
        }
        self.frame
            .clone()
            .ok_or_else(|| CameraError::DeviceError("no frame available".to_string()))
    }

    fn release(&self, stream: &mut ReplayStream) {
        if stream.live {
            stream.live = false;
            self.open_streams.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Parse a binary PPM (P6) image with a maxval of 255.
pub fn parse_ppm(bytes: &[u8]) -> Result<PixelBuffer, CameraError> {
    let invalid = |msg: &str| CameraError::InvalidFrame(format!("PPM: {msg}"));

    let mut pos = 0;
    let mut fields = [0u32; 3];

    let magic = next_token(bytes, &mut pos).ok_or_else(|| invalid("missing magic"))?;
    if magic != b"P6" {
        return Err(invalid("only binary P6 images are supported"));
    }
    for field in fields.iter_mut() {
        let token = next_token(bytes, &mut pos).ok_or_else(|| invalid("truncated header"))?;
        *field = std::str::from_utf8(token)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| invalid("non-numeric header field"))?;
    }
    let [width, height, maxval] = fields;
    if maxval != 255 {
        return Err(invalid("only 8-bit images (maxval 255) are supported"));
    }

    // Exactly one whitespace byte separates the header from pixel data.
    let data = bytes.get(pos + 1..).ok_or_else(|| invalid("missing pixel data"))?;
    let expected =
        frame_len(width, height, 3).ok_or_else(|| invalid("image dimensions too large"))?;
    if data.len() < expected {
        return Err(invalid("truncated pixel data"));
    }
    PixelBuffer::from_rgb(width, height, data[..expected].to_vec())
}

/// Next whitespace-delimited header token, skipping `#` comments.
fn next_token<'a>(bytes: &'a [u8], pos: &mut usize) -> Option<&'a [u8]> {
    loop {
        while *pos < bytes.len() && bytes[*pos].is_ascii_whitespace() {
            *pos += 1;
        }
        if *pos < bytes.len() && bytes[*pos] == b'#' {
            while *pos < bytes.len() && bytes[*pos] != b'\n' {
                *pos += 1;
            }
            continue;
        }
        break;
    }
    let start = *pos;
    while *pos < bytes.len() && !bytes[*pos].is_ascii_whitespace() {
        *pos += 1;
    }
    (start < *pos).then(|| &bytes[start..*pos])
}
