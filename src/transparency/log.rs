//! Privacy-preserving transparency log.
//!
//! Counts what the companion did with the camera and with user input,
//! without storing any of the data itself. Users can inspect these
//! counters to confirm that every captured frame was discarded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Transparency counters for the current and previous sessions.
#[derive(Debug)]
pub struct TransparencyLog {
    /// Frames snapshotted from a live camera
    frames_captured: AtomicU64,
    /// Frames destroyed after classification
    frames_discarded: AtomicU64,
    /// Emotion scans appended to the store
    scans_recorded: AtomicU64,
    /// Scans recorded as neutral because the camera was unavailable
    fallback_scans: AtomicU64,
    /// Scans cancelled before capture
    sessions_cancelled: AtomicU64,
    /// Stress check-ins recorded
    stress_check_ins: AtomicU64,
    /// Incident reports filed
    incidents_filed: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl TransparencyLog {
    /// Create a new transparency log.
    pub fn new() -> Self {
        Self {
            frames_captured: AtomicU64::new(0),
            frames_discarded: AtomicU64::new(0),
            scans_recorded: AtomicU64::new(0),
            fallback_scans: AtomicU64::new(0),
            sessions_cancelled: AtomicU64::new(0),
            stress_check_ins: AtomicU64::new(0),
            incidents_filed: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a transparency log with persistence.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        // Try to load existing stats
        if let Err(e) = log.load() {
            debug!("Could not load previous transparency stats: {e}");
        }

        log
    }

    pub fn record_frame_captured(&self) {
        self.frames_captured.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_discarded(&self) {
        self.frames_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scan(&self) {
        self.scans_recorded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a neutral scan produced without a frame.
    pub fn record_fallback_scan(&self) {
        self.scans_recorded.fetch_add(1, Ordering::Relaxed);
        self.fallback_scans.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_cancelled(&self) {
        self.sessions_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stress_check_in(&self) {
        self.stress_check_ins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_incident_filed(&self) {
        self.incidents_filed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            frames_discarded: self.frames_discarded.load(Ordering::Relaxed),
            scans_recorded: self.scans_recorded.load(Ordering::Relaxed),
            fallback_scans: self.fallback_scans.load(Ordering::Relaxed),
            sessions_cancelled: self.sessions_cancelled.load(Ordering::Relaxed),
            stress_check_ins: self.stress_check_ins.load(Ordering::Relaxed),
            incidents_filed: self.incidents_filed.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Transparency Statistics:\n\
             - Frames captured: {}\n\
             - Frames discarded: {}\n\
             - Emotion scans recorded: {} ({} without camera)\n\
             - Scans cancelled: {}\n\
             - Stress check-ins: {}\n\
             - Incidents filed: {}\n\
             \n\
             Privacy Guarantee:\n\
             - Camera frames are processed on this device only\n\
             - Each frame is wiped right after classification\n\
             - Only the resulting label is kept",
            stats.frames_captured,
            stats.frames_discarded,
            stats.scans_recorded,
            stats.fallback_scans,
            stats.sessions_cancelled,
            stats.stress_check_ins,
            stats.incidents_filed
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            // Ensure parent directory exists
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                frames_captured: stats.frames_captured,
                frames_discarded: stats.frames_discarded,
                scans_recorded: stats.scans_recorded,
                fallback_scans: stats.fallback_scans,
                sessions_cancelled: stats.sessions_cancelled,
                stress_check_ins: stats.stress_check_ins,
                incidents_filed: stats.incidents_filed,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Load stats from disk.
    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.frames_captured
                    .store(persisted.frames_captured, Ordering::Relaxed);
                self.frames_discarded
                    .store(persisted.frames_discarded, Ordering::Relaxed);
                self.scans_recorded
                    .store(persisted.scans_recorded, Ordering::Relaxed);
                self.fallback_scans
                    .store(persisted.fallback_scans, Ordering::Relaxed);
                self.sessions_cancelled
                    .store(persisted.sessions_cancelled, Ordering::Relaxed);
                self.stress_check_ins
                    .store(persisted.stress_check_ins, Ordering::Relaxed);
                self.incidents_filed
                    .store(persisted.incidents_filed, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        for counter in [
            &self.frames_captured,
            &self.frames_discarded,
            &self.scans_recorded,
            &self.fallback_scans,
            &self.sessions_cancelled,
            &self.stress_check_ins,
            &self.incidents_filed,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of transparency statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub frames_captured: u64,
    pub frames_discarded: u64,
    pub scans_recorded: u64,
    pub fallback_scans: u64,
    pub sessions_cancelled: u64,
    pub stress_check_ins: u64,
    pub incidents_filed: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct PersistedStats {
    frames_captured: u64,
    frames_discarded: u64,
    scans_recorded: u64,
    fallback_scans: u64,
    sessions_cancelled: u64,
    stress_check_ins: u64,
    incidents_filed: u64,
    last_updated: DateTime<Utc>,
}

impl Default for PersistedStats {
    fn default() -> Self {
        Self {
            frames_captured: 0,
            frames_discarded: 0,
            scans_recorded: 0,
            fallback_scans: 0,
            sessions_cancelled: 0,
            stress_check_ins: 0,
            incidents_filed: 0,
            last_updated: Utc::now(),
        }
    }
}

/// Thread-safe shared transparency log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

/// Create a new shared transparency log.
pub fn create_shared_log() -> SharedTransparencyLog {
    Arc::new(TransparencyLog::new())
}

/// Create a new shared transparency log with persistence.
pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedTransparencyLog {
    Arc::new(TransparencyLog::with_persistence(path))
}
