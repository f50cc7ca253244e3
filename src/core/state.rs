//! The wellbeing aggregate and the records it holds.
//!
//! Every record is immutable once appended. The aggregate serializes as a
//! single camelCase JSON document; missing fields fall back to defaults so
//! partial documents still load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lowest accepted stress level.
pub const MIN_STRESS_LEVEL: u8 = 1;
/// Highest accepted stress level.
pub const MAX_STRESS_LEVEL: u8 = 5;
/// Samples at or above this level count towards the streak.
pub const HIGH_STRESS_LEVEL: u8 = 4;
/// Maximum incident description length, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Injury labels offered when filing an incident.
pub const INJURY_TYPES: [&str; 6] = [
    "Minor scrape",
    "Road rash",
    "Vehicle damage",
    "Collision",
    "Fall",
    "Other",
];

/// A self-reported stress check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressSample {
    /// Calendar day (YYYY-MM-DD) in the user's timezone
    pub date: String,
    /// Stress level, 1 (very calm) to 5 (very stressed)
    pub level: u8,
    pub captured_at: DateTime<Utc>,
}

impl StressSample {
    pub fn is_high(&self) -> bool {
        self.level >= HIGH_STRESS_LEVEL
    }
}

/// Review status of an incident report.
///
/// Reports are always created as `Pending`; later transitions belong to
/// whoever reviews them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    #[default]
    Pending,
    Reviewing,
    Approved,
    Denied,
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IncidentStatus::Pending => "pending",
            IncidentStatus::Reviewing => "reviewing",
            IncidentStatus::Approved => "approved",
            IncidentStatus::Denied => "denied",
        };
        f.write_str(s)
    }
}

/// A filed incident report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentReport {
    pub id: Uuid,
    pub date: String,
    pub description: String,
    pub injury_type: String,
    pub status: IncidentStatus,
    pub captured_at: DateTime<Utc>,
}

/// Coarse affective state from a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AffectLabel {
    Calm,
    /// Fallback when no frame could be taken
    Neutral,
    Stressed,
    Fatigued,
}

impl AffectLabel {
    pub const ALL: [AffectLabel; 4] = [
        AffectLabel::Calm,
        AffectLabel::Neutral,
        AffectLabel::Stressed,
        AffectLabel::Fatigued,
    ];

    /// Whether the label should trigger follow-up suggestions.
    pub fn is_high_stress(&self) -> bool {
        matches!(self, AffectLabel::Stressed | AffectLabel::Fatigued)
    }

    /// Message shown with a scan result.
    pub fn message(&self) -> &'static str {
        match self {
            AffectLabel::Calm => "You seem calm and focused. Great state for riding!",
            AffectLabel::Neutral => "Looking neutral. Stay hydrated and take breaks.",
            AffectLabel::Stressed => "Signs of stress detected. Consider a short break.",
            AffectLabel::Fatigued => "You appear fatigued. Rest is important for safety.",
        }
    }
}

impl fmt::Display for AffectLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AffectLabel::Calm => "calm",
            AffectLabel::Neutral => "neutral",
            AffectLabel::Stressed => "stressed",
            AffectLabel::Fatigued => "fatigued",
        };
        f.write_str(s)
    }
}

impl FromStr for AffectLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AffectLabel::ALL
            .into_iter()
            .find(|label| label.to_string() == s.trim().to_lowercase())
            .ok_or_else(|| format!("unknown affect label '{s}'"))
    }
}

/// Result of one emotion scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionScan {
    pub date: String,
    pub result: AffectLabel,
    pub captured_at: DateTime<Utc>,
}

/// Daily wellness counters set by the user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WellnessMetrics {
    /// Glasses of water
    pub water_intake: f64,
    pub sleep_hours: f64,
    pub steps_count: f64,
    pub mindful_minutes: f64,
}

impl Default for WellnessMetrics {
    fn default() -> Self {
        Self {
            water_intake: 5.0,
            sleep_hours: 7.0,
            steps_count: 6200.0,
            mindful_minutes: 15.0,
        }
    }
}

/// A settable field of [`WellnessMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WellnessField {
    WaterIntake,
    SleepHours,
    StepsCount,
    MindfulMinutes,
}

impl WellnessField {
    pub const ALL: [WellnessField; 4] = [
        WellnessField::WaterIntake,
        WellnessField::SleepHours,
        WellnessField::StepsCount,
        WellnessField::MindfulMinutes,
    ];

    /// Display name with unit.
    pub fn label(&self) -> &'static str {
        match self {
            WellnessField::WaterIntake => "Water (glasses)",
            WellnessField::SleepHours => "Sleep (hours)",
            WellnessField::StepsCount => "Steps",
            WellnessField::MindfulMinutes => "Mindful (minutes)",
        }
    }
}

impl WellnessMetrics {
    pub fn get(&self, field: WellnessField) -> f64 {
        match field {
            WellnessField::WaterIntake => self.water_intake,
            WellnessField::SleepHours => self.sleep_hours,
            WellnessField::StepsCount => self.steps_count,
            WellnessField::MindfulMinutes => self.mindful_minutes,
        }
    }

    pub(crate) fn set(&mut self, field: WellnessField, value: f64) {
        match field {
            WellnessField::WaterIntake => self.water_intake = value,
            WellnessField::SleepHours => self.sleep_hours = value,
            WellnessField::StepsCount => self.steps_count = value,
            WellnessField::MindfulMinutes => self.mindful_minutes = value,
        }
    }
}

impl FromStr for WellnessField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "water" | "water_intake" => Ok(WellnessField::WaterIntake),
            "sleep" | "sleep_hours" => Ok(WellnessField::SleepHours),
            "steps" | "steps_count" => Ok(WellnessField::StepsCount),
            "mindful" | "mindful_minutes" => Ok(WellnessField::MindfulMinutes),
            other => Err(format!("unknown wellness field '{other}'")),
        }
    }
}

/// Everything the user has recorded.
///
/// The three logs are append-only; only a full reset removes entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WellbeingState {
    /// Stress check-ins in insertion (chronological) order
    pub stress_history: Vec<StressSample>,
    pub incidents: Vec<IncidentReport>,
    pub emotion_scans: Vec<EmotionScan>,
    pub habits: BTreeMap<String, bool>,
    pub wellness: WellnessMetrics,
    pub onboarding_complete: bool,
}

impl WellbeingState {
    /// Serialize to the stored document.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Parse a stored document.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
