//! Transparency module for the wellbeing companion.
//!
//! This module tracks and exposes what the companion did with the camera
//! and with user input, supporting user trust.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, SharedTransparencyLog, TransparencyLog,
    TransparencyStats,
};
