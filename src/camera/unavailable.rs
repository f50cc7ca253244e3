//! Camera for hosts without an accessible capture device.
//!
//! This exists so the crate (and binary) work on hosts where no camera
//! backend is wired in: every acquisition is refused, which the capture
//! session turns into a neutral scan.

use crate::camera::types::{CameraDevice, CameraError, Facing, PixelBuffer};

/// A camera that never grants access.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableCamera;

impl UnavailableCamera {
    pub fn new() -> Self {
        Self
    }
}

impl CameraDevice for UnavailableCamera {
    type Stream = ();

    fn acquire(&self, _facing: Facing) -> Result<(), CameraError> {
        Err(CameraError::PermissionDenied)
    }

    fn frame(&self, _stream: &mut ()) -> Result<PixelBuffer, CameraError> {
        Err(CameraError::DeviceError("no camera stream".to_string()))
    }

    fn release(&self, _stream: &mut ()) {}
}

/// Whether camera access can be granted on this host.
pub fn check_permission() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_is_denied() {
        let camera = UnavailableCamera::new();
        assert_eq!(
            camera.acquire(Facing::User),
            Err(CameraError::PermissionDenied)
        );
        assert!(!check_permission());
    }
}
