//! Integration tests for the wellbeing store backed by files.

use aura_companion::core::{
    AffectLabel, IncidentStatus, StoreOptions, WellbeingStore, WellnessField, DEFAULT_STORE_KEY,
};
use aura_companion::storage::{FileStore, KeyValueStore};
use aura_companion::telemetry::{MemorySink, TelemetryDispatcher, TelemetryEvent};
use aura_companion::transparency::create_shared_log;
use pretty_assertions::assert_eq;

#[test]
fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let before = {
        let store = WellbeingStore::open(FileStore::new(dir.path()));
        store.append_stress(2).unwrap();
        store.append_stress(5).unwrap();
        store
            .append_incident("Clipped a kerb and fell", "Fall")
            .unwrap();
        store.append_emotion_scan(AffectLabel::Stressed);
        store.toggle_habit("hydrate").unwrap();
        store
            .update_wellness(WellnessField::MindfulMinutes, 10.0)
            .unwrap();
        store.complete_onboarding();
        store.snapshot()
    };

    let reopened = WellbeingStore::open(FileStore::new(dir.path()));
    assert_eq!(reopened.snapshot(), before);
    assert_eq!(reopened.stress_streak(), 1);
    assert_eq!(
        reopened.recent_incidents(5)[0].status,
        IncidentStatus::Pending
    );
}

#[test]
fn test_reset_is_durable() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = WellbeingStore::open(FileStore::new(dir.path()));
        store.append_stress(4).unwrap();
        store.append_emotion_scan(AffectLabel::Calm);
        store.reset();
        assert!(store.recent_stress().is_empty());
        assert_eq!(store.stress_streak(), 0);
    }

    let reopened = WellbeingStore::open(FileStore::new(dir.path()));
    assert!(reopened.snapshot().is_empty());
}

#[test]
fn test_custom_key_and_corrupt_document() {
    let dir = tempfile::tempdir().unwrap();
    let files = FileStore::new(dir.path());
    files.save("rider_7", b"\x00\x01 definitely not json").unwrap();

    let options = StoreOptions {
        key: "rider_7".to_string(),
        ..Default::default()
    };
    let store = WellbeingStore::open_with(FileStore::new(dir.path()), options);
    assert!(store.snapshot().is_empty());

    store.append_stress(3).unwrap();
    assert!(files.load("rider_7").unwrap().is_some());
    assert!(files.load(DEFAULT_STORE_KEY).unwrap().is_none());
}

#[test]
fn test_telemetry_failure_keeps_mutation() {
    let sink = MemorySink::failing();
    let store = WellbeingStore::open(aura_companion::storage::MemoryStore::new())
        .with_telemetry(TelemetryDispatcher::spawn(sink.clone()));

    let sample = store.append_stress(4).unwrap();
    let report = store.append_incident("Van door clipped mirror", "Vehicle damage").unwrap();
    store.append_emotion_scan(AffectLabel::Fatigued);

    let mut store = store;
    if let Some(dispatcher) = store.take_telemetry() {
        dispatcher.shutdown();
    }

    assert_eq!(store.snapshot().stress_history, vec![sample.clone()]);
    assert_eq!(store.snapshot().incidents, vec![report.clone()]);
    // scans are not mirrored
    assert_eq!(
        sink.events(),
        vec![
            TelemetryEvent::StressSample {
                level: 4,
                timestamp: sample.captured_at,
            },
            TelemetryEvent::Incident(report),
        ]
    );
}

#[test]
fn test_transparency_counts_store_activity() {
    let log = create_shared_log();
    let store = WellbeingStore::open(aura_companion::storage::MemoryStore::new())
        .with_transparency(log.clone());

    store.append_stress(1).unwrap();
    store.append_stress(9).unwrap_err();
    store.append_incident("Minor graze", "Minor scrape").unwrap();

    let stats = log.stats();
    assert_eq!(stats.stress_check_ins, 1);
    assert_eq!(stats.incidents_filed, 1);
}
