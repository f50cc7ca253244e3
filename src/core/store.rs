//! The wellbeing store: the single owner of the user's aggregate.
//!
//! All mutations go through [`WellbeingStore`] methods. Each one validates its
//! input, applies the change and persists the whole aggregate while holding
//! the store lock, so writes reach storage in the same order the mutations
//! happened and no reader sees a half-applied change. Telemetry is fired
//! after the lock is released and can never undo a mutation.

use crate::core::advisor::{assess, RiskAssessment};
use crate::core::clock::{Clock, SystemClock};
use crate::core::state::{
    AffectLabel, EmotionScan, IncidentReport, IncidentStatus, StressSample, WellbeingState,
    WellnessField, MAX_DESCRIPTION_CHARS, MAX_STRESS_LEVEL, MIN_STRESS_LEVEL,
};
use crate::core::summary::{count_flagged_scans, WellbeingSummary};
use crate::core::windowing::{StressTrend, StressWindow, DEFAULT_WINDOW_DAYS};
use crate::storage::KeyValueStore;
use crate::telemetry::{TelemetryDispatcher, TelemetryEvent};
use crate::transparency::SharedTransparencyLog;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// Storage key of the aggregate document.
pub const DEFAULT_STORE_KEY: &str = "aura_data";

/// Rejected store input. Nothing is mutated when one of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("stress level {0} is outside 1..=5")]
    InvalidLevel(u8),

    #[error("invalid incident: {0}")]
    InvalidIncidentFields(String),

    #[error("habit name must not be empty")]
    InvalidHabit,

    #[error("invalid value {value} for {field:?}")]
    InvalidWellnessValue { field: WellnessField, value: f64 },
}

/// Settings fixed when a store is opened.
#[derive(Clone)]
pub struct StoreOptions {
    /// Key of the aggregate in storage
    pub key: String,
    /// Timezone for calendar-day strings
    pub timezone: Tz,
    /// Length of the recent window in days
    pub window_days: u32,
    pub clock: Arc<dyn Clock>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            key: DEFAULT_STORE_KEY.to_string(),
            timezone: Tz::UTC,
            window_days: DEFAULT_WINDOW_DAYS,
            clock: Arc::new(SystemClock),
        }
    }
}

impl std::fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreOptions")
            .field("key", &self.key)
            .field("timezone", &self.timezone)
            .field("window_days", &self.window_days)
            .finish_non_exhaustive()
    }
}

/// Owner of the wellbeing aggregate.
pub struct WellbeingStore {
    state: Mutex<WellbeingState>,
    storage: Box<dyn KeyValueStore>,
    options: StoreOptions,
    telemetry: Option<TelemetryDispatcher>,
    transparency: Option<SharedTransparencyLog>,
    save_failures: AtomicU64,
}

impl WellbeingStore {
    /// Open the store with default options.
    pub fn open<S: KeyValueStore + 'static>(storage: S) -> Self {
        Self::open_with(storage, StoreOptions::default())
    }

    /// Open the store, loading the aggregate from `storage`.
    ///
    /// A missing or unreadable document yields an empty aggregate.
    pub fn open_with<S: KeyValueStore + 'static>(storage: S, options: StoreOptions) -> Self {
        let state = load_state(&storage, &options.key);
        Self {
            state: Mutex::new(state),
            storage: Box::new(storage),
            options,
            telemetry: None,
            transparency: None,
            save_failures: AtomicU64::new(0),
        }
    }

    /// Fire telemetry for check-ins and incidents through `dispatcher`.
    pub fn with_telemetry(mut self, dispatcher: TelemetryDispatcher) -> Self {
        self.telemetry = Some(dispatcher);
        self
    }

    /// Count recorded entries in a transparency log.
    pub fn with_transparency(mut self, log: SharedTransparencyLog) -> Self {
        self.transparency = Some(log);
        self
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Detach the telemetry dispatcher, e.g. to flush it on shutdown.
    pub fn take_telemetry(&mut self) -> Option<TelemetryDispatcher> {
        self.telemetry.take()
    }

    /// Number of persistence attempts that failed since opening.
    pub fn save_failures(&self) -> u64 {
        self.save_failures.load(Ordering::Relaxed)
    }

    /// Record a stress check-in.
    pub fn append_stress(&self, level: u8) -> Result<StressSample, StoreError> {
        if !(MIN_STRESS_LEVEL..=MAX_STRESS_LEVEL).contains(&level) {
            return Err(StoreError::InvalidLevel(level));
        }

        let sample = self.commit(|state, now, date| {
            let sample = StressSample {
                date,
                level,
                captured_at: now,
            };
            state.stress_history.push(sample.clone());
            sample
        });

        debug!(level, "stress check-in recorded");
        if let Some(ref log) = self.transparency {
            log.record_stress_check_in();
        }
        self.notify(TelemetryEvent::StressSample {
            level,
            timestamp: sample.captured_at,
        });
        Ok(sample)
    }

    /// File an incident report with status `pending`.
    pub fn append_incident(
        &self,
        description: &str,
        injury_type: &str,
    ) -> Result<IncidentReport, StoreError> {
        let description = description.trim();
        let injury_type = injury_type.trim();

        let chars = description.chars().count();
        if chars == 0 {
            return Err(StoreError::InvalidIncidentFields(
                "description must not be empty".to_string(),
            ));
        }
        if chars > MAX_DESCRIPTION_CHARS {
            return Err(StoreError::InvalidIncidentFields(format!(
                "description is {chars} characters, limit is {MAX_DESCRIPTION_CHARS}"
            )));
        }
        if injury_type.is_empty() {
            return Err(StoreError::InvalidIncidentFields(
                "injury type must not be empty".to_string(),
            ));
        }

        let report = self.commit(|state, now, date| {
            let report = IncidentReport {
                id: Uuid::new_v4(),
                date,
                description: description.to_string(),
                injury_type: injury_type.to_string(),
                status: IncidentStatus::Pending,
                captured_at: now,
            };
            state.incidents.push(report.clone());
            report
        });

        debug!(id = %report.id, "incident filed");
        if let Some(ref log) = self.transparency {
            log.record_incident_filed();
        }
        self.notify(TelemetryEvent::Incident(report.clone()));
        Ok(report)
    }

    /// Record the result of an emotion scan.
    pub fn append_emotion_scan(&self, result: AffectLabel) -> EmotionScan {
        let scan = self.commit(|state, now, date| {
            let scan = EmotionScan {
                date,
                result,
                captured_at: now,
            };
            state.emotion_scans.push(scan.clone());
            scan
        });
        debug!(%result, "emotion scan recorded");
        scan
    }

    /// Flip a habit and return its new value.
    pub fn toggle_habit(&self, name: &str) -> Result<bool, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidHabit);
        }
        Ok(self.commit(|state, _, _| {
            let done = state.habits.entry(name.to_string()).or_insert(false);
            *done = !*done;
            *done
        }))
    }

    /// Set one of the daily wellness counters.
    pub fn update_wellness(&self, field: WellnessField, value: f64) -> Result<(), StoreError> {
        if !value.is_finite() || value < 0.0 {
            return Err(StoreError::InvalidWellnessValue { field, value });
        }
        self.commit(|state, _, _| state.wellness.set(field, value));
        Ok(())
    }

    /// Mark onboarding as done.
    pub fn complete_onboarding(&self) {
        self.commit(|state, _, _| state.onboarding_complete = true);
    }

    /// Clear the whole aggregate and persist the empty document.
    pub fn reset(&self) {
        self.commit(|state, _, _| *state = WellbeingState::default());
        debug!("wellbeing data reset");
    }

    /// Copy of the current aggregate.
    pub fn snapshot(&self) -> WellbeingState {
        self.lock().clone()
    }

    /// The recent window with the configured length.
    pub fn stress_window(&self) -> StressWindow {
        self.stress_window_within(self.options.window_days)
    }

    pub fn stress_window_within(&self, days: u32) -> StressWindow {
        let now = self.options.clock.now();
        let state = self.lock();
        StressWindow::ending_at(&state.stress_history, now, days)
    }

    /// Check-ins within the configured window, oldest first.
    pub fn recent_stress(&self) -> Vec<StressSample> {
        self.stress_window().samples
    }

    /// Check-ins within `days` of now, oldest first.
    pub fn recent_stress_within(&self, days: u32) -> Vec<StressSample> {
        self.stress_window_within(days).samples
    }

    /// Consecutive high-stress check-ins ending with the most recent one.
    pub fn stress_streak(&self) -> u32 {
        self.stress_window().streak()
    }

    pub fn average_stress(&self) -> Option<f64> {
        self.stress_window().average()
    }

    pub fn stress_trend(&self) -> StressTrend {
        self.stress_window().trend()
    }

    /// Number of scans labelled stressed or fatigued.
    pub fn flagged_scans(&self) -> usize {
        count_flagged_scans(&self.lock())
    }

    /// The last `n` scans, most recent first.
    pub fn recent_scans(&self, n: usize) -> Vec<EmotionScan> {
        self.lock().emotion_scans.iter().rev().take(n).cloned().collect()
    }

    /// The last `n` incident reports, most recent first.
    pub fn recent_incidents(&self, n: usize) -> Vec<IncidentReport> {
        self.lock().incidents.iter().rev().take(n).cloned().collect()
    }

    /// Risk tier and recommendations for the recent window.
    pub fn assess(&self) -> RiskAssessment {
        let window = self.stress_window();
        assess(&window.samples, window.streak())
    }

    /// All derived views, computed from one consistent read.
    pub fn summary(&self) -> WellbeingSummary {
        let now = self.options.clock.now();
        let state = self.lock();
        let window = StressWindow::ending_at(&state.stress_history, now, self.options.window_days);
        WellbeingSummary::from_window(&window, &state)
    }

    /// Calendar day of `instant` in the store's timezone.
    pub fn calendar_day(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.options.timezone)
            .format("%Y-%m-%d")
            .to_string()
    }

    fn lock(&self) -> MutexGuard<'_, WellbeingState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply a mutation and persist the result under the store lock.
    ///
    /// The timestamp is taken after the lock, so insertion order matches
    /// timestamp order.
    fn commit<T>(&self, apply: impl FnOnce(&mut WellbeingState, DateTime<Utc>, String) -> T) -> T {
        let mut state = self.lock();
        let now = self.options.clock.now();
        let date = self.calendar_day(now);
        let out = apply(&mut *state, now, date);
        self.persist(&state);
        out
    }

    fn persist(&self, state: &WellbeingState) {
        let result = state
            .to_bytes()
            .map_err(|e| e.to_string())
            .and_then(|bytes| {
                self.storage
                    .save(&self.options.key, &bytes)
                    .map_err(|e| e.to_string())
            });

        if let Err(e) = result {
            self.save_failures.fetch_add(1, Ordering::Relaxed);
            warn!("Could not persist wellbeing data, continuing in memory: {e}");
        }
    }

    fn notify(&self, event: TelemetryEvent) {
        if let Some(ref telemetry) = self.telemetry {
            telemetry.dispatch(event);
        }
    }
}

impl std::fmt::Debug for WellbeingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WellbeingStore")
            .field("options", &self.options)
            .field("telemetry", &self.telemetry)
            .finish_non_exhaustive()
    }
}

fn load_state(storage: &dyn KeyValueStore, key: &str) -> WellbeingState {
    match storage.load(key) {
        Ok(Some(bytes)) => match WellbeingState::from_bytes(&bytes) {
            Ok(state) => state,
            Err(e) => {
                warn!("Stored wellbeing data is unreadable, starting fresh: {e}");
                WellbeingState::default()
            }
        },
        Ok(None) => WellbeingState::default(),
        Err(e) => {
            warn!("Could not load wellbeing data, starting fresh: {e}");
            WellbeingState::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::core::state::WellnessMetrics;
    use crate::storage::{MemoryStore, StorageError};
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn load(&self, _key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            Err(StorageError::Unavailable("disk gone".to_string()))
        }

        fn save(&self, _key: &str, _bytes: &[u8]) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disk gone".to_string()))
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    fn store_with_clock() -> (WellbeingStore, Arc<ManualClock>, Arc<MemoryStore>) {
        let clock = Arc::new(ManualClock::new(start()));
        let storage = Arc::new(MemoryStore::new());
        let options = StoreOptions {
            clock: clock.clone(),
            ..Default::default()
        };
        (
            WellbeingStore::open_with(storage.clone(), options),
            clock,
            storage,
        )
    }

    #[test]
    fn test_invalid_level_rejected_without_mutation() {
        let (store, _, storage) = store_with_clock();
        assert_eq!(store.append_stress(0), Err(StoreError::InvalidLevel(0)));
        assert_eq!(store.append_stress(6), Err(StoreError::InvalidLevel(6)));
        assert!(store.snapshot().stress_history.is_empty());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_append_persists_every_mutation() {
        let (store, _, storage) = store_with_clock();
        let sample = store.append_stress(3).unwrap();
        assert_eq!(sample.date, "2025-03-10");
        assert_eq!(sample.captured_at, start());

        let saved = storage.load(DEFAULT_STORE_KEY).unwrap().unwrap();
        let state = WellbeingState::from_bytes(&saved).unwrap();
        assert_eq!(state.stress_history, vec![sample]);
    }

    #[test]
    fn test_recent_window_boundaries() {
        let (store, clock, _) = store_with_clock();
        store.append_stress(5).unwrap();
        clock.advance(Duration::seconds(1));
        store.append_stress(2).unwrap();

        // first sample is now 7d + 1s old, second exactly 7d
        clock.advance(Duration::days(7));
        assert!(store.recent_stress().is_empty());

        clock.set(start() + Duration::days(6));
        assert_eq!(store.recent_stress().len(), 2);
        assert_eq!(store.recent_stress_within(1).len(), 0);
    }

    #[test]
    fn test_streak_and_trend() {
        let (store, clock, _) = store_with_clock();
        for level in [2, 4, 5, 4] {
            store.append_stress(level).unwrap();
            clock.advance(Duration::hours(1));
        }
        assert_eq!(store.stress_streak(), 3);
        assert_eq!(store.stress_trend(), StressTrend::Rising);
        let average = store.average_stress().unwrap();
        assert!((average - 3.75).abs() < 1e-9);
    }

    /// Clock whose first reading is slow to return.
    struct SlowFirstClock {
        calls: std::sync::atomic::AtomicI64,
    }

    impl Clock for SlowFirstClock {
        fn now(&self) -> DateTime<Utc> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                std::thread::sleep(std::time::Duration::from_millis(200));
            }
            start() + Duration::seconds(n)
        }
    }

    #[test]
    fn test_concurrent_appends_stay_chronological() {
        let options = StoreOptions {
            clock: Arc::new(SlowFirstClock {
                calls: std::sync::atomic::AtomicI64::new(0),
            }),
            ..Default::default()
        };
        let store = WellbeingStore::open_with(MemoryStore::new(), options);

        std::thread::scope(|s| {
            s.spawn(|| store.append_stress(2).unwrap());
            std::thread::sleep(std::time::Duration::from_millis(50));
            store.append_stress(5).unwrap();
        });

        let history = store.snapshot().stress_history;
        let levels: Vec<u8> = history.iter().map(|s| s.level).collect();
        assert_eq!(levels, vec![2, 5]);
        assert!(history[0].captured_at < history[1].captured_at);
        assert_eq!(store.stress_streak(), 1);
    }

    #[test]
    fn test_incident_validation() {
        let (store, _, _) = store_with_clock();
        assert!(matches!(
            store.append_incident("   ", "Fall"),
            Err(StoreError::InvalidIncidentFields(_))
        ));
        assert!(matches!(
            store.append_incident(&"x".repeat(501), "Fall"),
            Err(StoreError::InvalidIncidentFields(_))
        ));
        assert!(matches!(
            store.append_incident("scraped knee", " "),
            Err(StoreError::InvalidIncidentFields(_))
        ));
        assert!(store.snapshot().incidents.is_empty());

        let report = store.append_incident(&"é".repeat(500), "Fall").unwrap();
        assert_eq!(report.status, IncidentStatus::Pending);

        let other = store.append_incident("  slipped on wet road ", "Road rash").unwrap();
        assert_eq!(other.description, "slipped on wet road");
        assert_ne!(report.id, other.id);
        assert_eq!(store.recent_incidents(1), vec![other]);
    }

    #[test]
    fn test_habits_wellness_onboarding() {
        let (store, _, _) = store_with_clock();
        assert_eq!(store.toggle_habit("stretch"), Ok(true));
        assert_eq!(store.toggle_habit("stretch"), Ok(false));
        assert_eq!(store.toggle_habit(""), Err(StoreError::InvalidHabit));

        store.update_wellness(WellnessField::SleepHours, 7.5).unwrap();
        assert!(store.update_wellness(WellnessField::StepsCount, -1.0).is_err());
        assert!(store
            .update_wellness(WellnessField::WaterIntake, f64::NAN)
            .is_err());

        store.complete_onboarding();
        let state = store.snapshot();
        assert_eq!(state.wellness.sleep_hours, 7.5);
        assert!(state.onboarding_complete);
    }

    #[test]
    fn test_reset_clears_everything() {
        let (store, _, storage) = store_with_clock();
        store.append_stress(5).unwrap();
        store.append_emotion_scan(AffectLabel::Calm);
        store.toggle_habit("walk").unwrap();
        store.update_wellness(WellnessField::StepsCount, 12000.0).unwrap();
        store.complete_onboarding();

        store.reset();
        assert_eq!(store.snapshot().wellness, WellnessMetrics::default());
        assert!(store.recent_stress().is_empty());
        assert_eq!(store.stress_streak(), 0);
        assert!(store.snapshot().is_empty());

        let saved = storage.load(DEFAULT_STORE_KEY).unwrap().unwrap();
        assert!(WellbeingState::from_bytes(&saved).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_document_falls_back_to_empty() {
        let storage = MemoryStore::new();
        storage.save(DEFAULT_STORE_KEY, b"{not json").unwrap();
        let store = WellbeingStore::open(storage);
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_storage_failures_do_not_block() {
        let store = WellbeingStore::open(BrokenStore);
        store.append_stress(4).unwrap();
        store.append_stress(5).unwrap();
        assert_eq!(store.save_failures(), 2);
        assert_eq!(store.snapshot().stress_history.len(), 2);
    }

    #[test]
    fn test_calendar_day_uses_timezone() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 10, 23, 30, 0).unwrap(),
        ));
        let options = StoreOptions {
            timezone: chrono_tz::Asia::Tokyo,
            clock,
            ..Default::default()
        };
        let store = WellbeingStore::open_with(MemoryStore::new(), options);
        let scan = store.append_emotion_scan(AffectLabel::Neutral);
        assert_eq!(scan.date, "2025-03-11");
    }

    #[test]
    fn test_recent_scans_most_recent_first() {
        let (store, _, _) = store_with_clock();
        store.append_emotion_scan(AffectLabel::Calm);
        store.append_emotion_scan(AffectLabel::Stressed);
        store.append_emotion_scan(AffectLabel::Fatigued);

        let recent: Vec<AffectLabel> = store.recent_scans(2).into_iter().map(|s| s.result).collect();
        assert_eq!(recent, vec![AffectLabel::Fatigued, AffectLabel::Stressed]);
        assert_eq!(store.flagged_scans(), 2);
    }
}
