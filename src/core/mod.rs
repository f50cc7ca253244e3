//! Core functionality for the wellbeing companion.
//!
//! This module contains:
//! - Signal extraction and affect classification for single frames
//! - The capture session state machine and camera lease
//! - The wellbeing aggregate and the store that owns it
//! - Recent-window analytics, risk assessment and the weekly summary

pub mod advisor;
pub mod capture;
pub mod classifier;
pub mod clock;
pub mod signals;
pub mod state;
pub mod store;
pub mod summary;
pub mod windowing;

// Re-export commonly used types
pub use advisor::{assess, scan_suggestions, tier_for, RiskAssessment, RiskTier};
pub use capture::{
    CameraLease, CaptureError, CaptureOutcome, CaptureSession, CaptureState, LeaseRegistry,
};
pub use classifier::{classify, AffectClassifier, ClassifierThresholds};
pub use clock::{Clock, ManualClock, SystemClock};
pub use signals::{extract_signals, PixelSignals, SignalError};
pub use state::{
    AffectLabel, EmotionScan, IncidentReport, IncidentStatus, StressSample, WellbeingState,
    WellnessField, WellnessMetrics, INJURY_TYPES,
};
pub use store::{StoreError, StoreOptions, WellbeingStore, DEFAULT_STORE_KEY};
pub use summary::WellbeingSummary;
pub use windowing::{stress_streak, StressTrend, StressWindow, DEFAULT_WINDOW_DAYS};
