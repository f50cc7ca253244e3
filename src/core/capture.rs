//! One-shot capture session.
//!
//! A session walks `Idle → Acquiring → Streaming → Captured → Released`, or
//! ends in `Cancelled` when the user aborts. The camera is held through a
//! [`CameraLease`], which releases the stream in `Drop`; every way out of the
//! holding states (capture, cancel, error, the session being dropped, a panic
//! unwinding through it) therefore gives the camera back.
//!
//! At most one lease exists per [`LeaseRegistry`]. Sessions use the
//! process-wide registry unless they are handed their own.

use crate::camera::{CameraDevice, CameraError, Facing, PixelBuffer};
use crate::core::classifier::AffectClassifier;
use crate::core::signals::{extract_signals, SignalError};
use crate::core::state::{AffectLabel, EmotionScan};
use crate::core::store::WellbeingStore;
use crate::transparency::SharedTransparencyLog;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Where a capture session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureState {
    Idle,
    Acquiring,
    Streaming,
    Captured,
    Released,
    Cancelled,
}

impl CaptureState {
    /// `Released` and `Cancelled` accept no further actions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CaptureState::Released | CaptureState::Cancelled)
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CaptureState::Idle => "idle",
            CaptureState::Acquiring => "acquiring",
            CaptureState::Streaming => "streaming",
            CaptureState::Captured => "captured",
            CaptureState::Released => "released",
            CaptureState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Errors surfaced by a capture session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("another capture session holds the camera")]
    SessionBusy,

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("cannot {action} a session that is {from}")]
    InvalidTransition {
        from: CaptureState,
        action: &'static str,
    },
}

impl From<SignalError> for CaptureError {
    fn from(e: SignalError) -> Self {
        CaptureError::InvalidFrame(e.to_string())
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// A frame was classified and the scan recorded.
    Scanned(EmotionScan),
    /// The camera was unavailable; a neutral scan was recorded instead.
    Fallback {
        scan: EmotionScan,
        reason: CameraError,
    },
    /// The user aborted; nothing was recorded.
    Cancelled,
}

impl CaptureOutcome {
    pub fn scan(&self) -> Option<&EmotionScan> {
        match self {
            CaptureOutcome::Scanned(scan) | CaptureOutcome::Fallback { scan, .. } => Some(scan),
            CaptureOutcome::Cancelled => None,
        }
    }
}

/// Exclusivity slot for the camera.
#[derive(Debug, Clone, Default)]
pub struct LeaseRegistry {
    held: Arc<AtomicBool>,
}

impl LeaseRegistry {
    /// A registry independent of every other one.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by the whole process.
    pub fn global() -> &'static LeaseRegistry {
        static GLOBAL: OnceLock<LeaseRegistry> = OnceLock::new();
        GLOBAL.get_or_init(LeaseRegistry::new)
    }

    /// Whether a lease is currently outstanding.
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    fn claim(&self) -> Option<SlotGuard> {
        self.held
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| SlotGuard {
                held: self.held.clone(),
            })
    }
}

/// Frees the registry slot when dropped.
#[derive(Debug)]
struct SlotGuard {
    held: Arc<AtomicBool>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.held.store(false, Ordering::SeqCst);
    }
}

/// Scoped hold on the camera.
pub struct CameraLease<'a, C: CameraDevice> {
    camera: &'a C,
    stream: C::Stream,
    _slot: SlotGuard,
}

impl<'a, C: CameraDevice> CameraLease<'a, C> {
    /// Claim the registry slot, then open the camera.
    ///
    /// The slot is freed again if the camera refuses.
    pub fn acquire(
        registry: &LeaseRegistry,
        camera: &'a C,
        facing: Facing,
    ) -> Result<Result<Self, CameraError>, CaptureError> {
        let slot = registry.claim().ok_or(CaptureError::SessionBusy)?;
        Ok(camera.acquire(facing).map(|stream| Self {
            camera,
            stream,
            _slot: slot,
        }))
    }

    /// Snapshot the current frame.
    pub fn frame(&mut self) -> Result<PixelBuffer, CameraError> {
        self.camera.frame(&mut self.stream)
    }

    /// Give the camera back now.
    pub fn release(self) {}
}

impl<'a, C: CameraDevice> Drop for CameraLease<'a, C> {
    fn drop(&mut self) {
        self.camera.release(&mut self.stream);
        debug!("camera released");
    }
}

impl<'a, C: CameraDevice> fmt::Debug for CameraLease<'a, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraLease").finish_non_exhaustive()
    }
}

/// A single emotion scan from acquisition to release.
pub struct CaptureSession<'a, C: CameraDevice> {
    camera: &'a C,
    store: &'a WellbeingStore,
    facing: Facing,
    registry: LeaseRegistry,
    classifier: AffectClassifier,
    transparency: Option<SharedTransparencyLog>,
    state: CaptureState,
    lease: Option<CameraLease<'a, C>>,
    outcome: Option<CaptureOutcome>,
}

impl<'a, C: CameraDevice> CaptureSession<'a, C> {
    pub fn new(camera: &'a C, store: &'a WellbeingStore, facing: Facing) -> Self {
        Self {
            camera,
            store,
            facing,
            registry: LeaseRegistry::global().clone(),
            classifier: AffectClassifier::default(),
            transparency: None,
            state: CaptureState::Idle,
            lease: None,
            outcome: None,
        }
    }

    /// Use `registry` instead of the process-wide one.
    pub fn with_registry(mut self, registry: LeaseRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_classifier(mut self, classifier: AffectClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_transparency(mut self, log: SharedTransparencyLog) -> Self {
        self.transparency = Some(log);
        self
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    /// How the session ended, once it is terminal.
    pub fn outcome(&self) -> Option<&CaptureOutcome> {
        self.outcome.as_ref()
    }

    /// Request the camera.
    ///
    /// Returns the state reached: `Streaming` when the camera was granted, or
    /// `Released` after recording a neutral scan when it was not. Fails with
    /// `SessionBusy`, leaving the session `Idle`, while another lease is out.
    pub fn start(&mut self) -> Result<CaptureState, CaptureError> {
        self.expect_state(&[CaptureState::Idle], "start")?;

        let acquired = CameraLease::acquire(&self.registry, self.camera, self.facing)?;
        self.transition(CaptureState::Acquiring);

        match acquired {
            Ok(lease) => {
                self.lease = Some(lease);
                self.transition(CaptureState::Streaming);
            }
            Err(reason) => {
                warn!("Camera unavailable ({reason}), recording a neutral scan");
                self.fall_back(reason);
            }
        }
        Ok(self.state)
    }

    /// Take one frame, classify it and record the scan.
    pub fn capture(&mut self) -> Result<EmotionScan, CaptureError> {
        self.expect_state(&[CaptureState::Streaming], "capture")?;
        let Some(mut lease) = self.lease.take() else {
            return Err(CaptureError::InvalidTransition {
                from: self.state,
                action: "capture",
            });
        };

        let frame = lease.frame();
        lease.release();

        let frame = match frame {
            Ok(frame) => frame,
            Err(CameraError::InvalidFrame(msg)) => {
                self.transition(CaptureState::Released);
                return Err(CaptureError::InvalidFrame(msg));
            }
            Err(reason) => {
                warn!("Frame read failed ({reason}), recording a neutral scan");
                return Ok(self.fall_back(reason));
            }
        };

        self.transition(CaptureState::Captured);
        if let Some(ref log) = self.transparency {
            log.record_frame_captured();
        }

        let signals = extract_signals(&frame);
        drop(frame);
        if let Some(ref log) = self.transparency {
            log.record_frame_discarded();
        }

        let signals = match signals {
            Ok(signals) => signals,
            Err(e) => {
                self.transition(CaptureState::Released);
                return Err(e.into());
            }
        };

        let label = self.classifier.classify(&signals);
        let scan = self.store.append_emotion_scan(label);
        if let Some(ref log) = self.transparency {
            log.record_scan();
        }
        info!(result = %label, "emotion scan recorded");

        self.outcome = Some(CaptureOutcome::Scanned(scan.clone()));
        self.transition(CaptureState::Released);
        Ok(scan)
    }

    /// Abort before capture. Nothing is recorded.
    pub fn cancel(&mut self) -> Result<(), CaptureError> {
        self.expect_state(&[CaptureState::Acquiring, CaptureState::Streaming], "cancel")?;

        self.lease = None;
        if let Some(ref log) = self.transparency {
            log.record_session_cancelled();
        }
        self.outcome = Some(CaptureOutcome::Cancelled);
        self.transition(CaptureState::Cancelled);
        Ok(())
    }

    fn fall_back(&mut self, reason: CameraError) -> EmotionScan {
        self.lease = None;
        let scan = self.store.append_emotion_scan(AffectLabel::Neutral);
        if let Some(ref log) = self.transparency {
            log.record_fallback_scan();
        }
        self.outcome = Some(CaptureOutcome::Fallback {
            scan: scan.clone(),
            reason,
        });
        self.transition(CaptureState::Released);
        scan
    }

    fn expect_state(
        &self,
        allowed: &[CaptureState],
        action: &'static str,
    ) -> Result<(), CaptureError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(CaptureError::InvalidTransition {
                from: self.state,
                action,
            })
        }
    }

    fn transition(&mut self, to: CaptureState) {
        debug!(from = %self.state, to = %to, "capture session transition");
        self.state = to;
    }
}

impl<'a, C: CameraDevice> fmt::Debug for CaptureSession<'a, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("state", &self.state)
            .field("facing", &self.facing)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}
