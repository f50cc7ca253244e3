//! Heuristic affect classifier.
//!
//! An ordered decision list over [`PixelSignals`]. Rules are evaluated top to
//! bottom and the first match wins, so a frame that is both fatigued and
//! stressed by the thresholds is reported as fatigued.
//!
//! The classifier never yields [`AffectLabel::Neutral`]; that label is
//! reserved for scans where no frame could be taken.

use crate::core::signals::PixelSignals;
use crate::core::state::AffectLabel;
use serde::{Deserialize, Serialize};

/// Threshold values for the decision list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierThresholds {
    /// Fatigued requires sharpness below this...
    pub fatigue_max_sharpness: f64,
    /// ...and a dark ratio above this
    pub fatigue_min_dark_ratio: f64,
    /// Stressed if luminance is below this
    pub stress_max_luminance: f64,
    /// or the dark ratio is above this
    pub stress_min_dark_ratio: f64,
    /// or sharpness is below this
    pub stress_max_sharpness: f64,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            fatigue_max_sharpness: 15.0,
            fatigue_min_dark_ratio: 0.15,
            stress_max_luminance: 70.0,
            stress_min_dark_ratio: 0.08,
            stress_max_sharpness: 25.0,
        }
    }
}

/// Maps frame signals to an affect label.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AffectClassifier {
    thresholds: ClassifierThresholds,
}

impl AffectClassifier {
    pub fn new(thresholds: ClassifierThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ClassifierThresholds {
        &self.thresholds
    }

    /// Classify a frame's signals. Always returns calm, stressed or fatigued.
    pub fn classify(&self, signals: &PixelSignals) -> AffectLabel {
        let t = &self.thresholds;

        if signals.sharpness < t.fatigue_max_sharpness
            && signals.dark_ratio > t.fatigue_min_dark_ratio
        {
            return AffectLabel::Fatigued;
        }

        if signals.avg_luminance < t.stress_max_luminance
            || signals.dark_ratio > t.stress_min_dark_ratio
            || signals.sharpness < t.stress_max_sharpness
        {
            return AffectLabel::Stressed;
        }

        AffectLabel::Calm
    }
}

/// Classify with the default thresholds.
pub fn classify(signals: &PixelSignals) -> AffectLabel {
    AffectClassifier::default().classify(signals)
}
