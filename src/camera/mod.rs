//! Camera collaborator for the wellbeing companion.
//!
//! The core only sees the [`CameraDevice`] trait. Hosts plug in a real
//! backend; the crate ships a replay camera and an always-denied default.

pub mod replay;
pub mod types;
pub mod unavailable;

// Re-export commonly used types
pub use replay::{parse_ppm, ReplayCamera, ReplayStream};
pub use types::{CameraDevice, CameraError, Facing, PixelBuffer};
pub use unavailable::{check_permission, UnavailableCamera};
