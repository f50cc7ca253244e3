//! Aura Companion - privacy-first on-device wellbeing companion.
//!
//! This library provides one-shot affect scans from a single camera frame,
//! stress check-ins, incident reports and the analytics built on them, with
//! strong privacy guarantees.
//!
//! # Privacy Guarantees
//!
//! - **One frame only**: A scan reads a single frame and the camera is released before it is analysed
//! - **No images kept**: The frame is wiped as soon as its label is computed
//! - **Local first**: All data lives in one document on this device
//! - **Transparency**: Every capture and discard is counted and auditable
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Aura Companion                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Camera    │──▶│   Capture   │──▶│  Signals +  │       │
//! │  │   (lease)   │   │   Session   │   │ Classifier  │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │                           │                 │              │
//! │                           ▼                 ▼              │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │Transparency │   │  Wellbeing  │──▶│  Storage /  │       │
//! │  │    Log      │   │    Store    │   │  Telemetry  │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use aura_companion::{camera, core, storage};
//!
//! let store = core::WellbeingStore::open(storage::FileStore::new("/tmp/aura"));
//! store.append_stress(4).expect("level in range");
//!
//! let camera = camera::ReplayCamera::new(camera::PixelBuffer::solid(64, 64, [180, 170, 160]));
//! let mut session = core::CaptureSession::new(&camera, &store, camera::Facing::User);
//! session.start().expect("camera free");
//! let scan = session.capture().expect("frame captured");
//! println!("{}", scan.result.message());
//! ```

pub mod camera;
pub mod config;
pub mod core;
pub mod storage;
pub mod telemetry;
pub mod transparency;

// Re-export key types at crate root for convenience
pub use camera::{CameraDevice, CameraError, Facing, PixelBuffer, ReplayCamera, UnavailableCamera};
pub use config::{Config, ConfigError, TelemetryConfig};
pub use core::{
    AffectLabel, CaptureError, CaptureSession, CaptureState, RiskAssessment, RiskTier,
    StoreError, WellbeingState, WellbeingStore, WellbeingSummary,
};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use telemetry::{LogSink, TelemetryDispatcher, TelemetryError, TelemetryEvent, TelemetrySink};
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

// Gateway re-exports (when enabled)
#[cfg(feature = "gateway")]
pub use telemetry::{GatewayConfig, GatewaySink};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Privacy declaration that can be displayed to users.
pub const PRIVACY_DECLARATION: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║              AURA COMPANION - PRIVACY DECLARATION                ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This companion helps you track stress and wellbeing.            ║
║                                                                  ║
║  ✓ WHAT WE KEEP:                                                 ║
║    • Your stress check-ins (a level from 1 to 5)                 ║
║    • Incident reports you choose to file                         ║
║    • The label of each emotion scan (calm, stressed, ...)        ║
║                                                                  ║
║  ✗ WHAT WE NEVER KEEP:                                           ║
║    • Camera images or video                                      ║
║    • Facial features or biometric templates                      ║
║    • A live camera feed after the scan                           ║
║                                                                  ║
║  A scan reads one frame, releases the camera, computes a label   ║
║  on this device, and wipes the frame immediately.                ║
║                                                                  ║
║  You can view capture statistics anytime with:                   ║
║    aura status                                                   ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privacy_declaration_contents() {
        assert!(PRIVACY_DECLARATION.contains("PRIVACY"));
        assert!(PRIVACY_DECLARATION.contains("NEVER KEEP"));
        assert!(PRIVACY_DECLARATION.contains("Camera images"));
    }
}
