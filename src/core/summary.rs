//! Weekly wellbeing report.

use crate::core::advisor::{assess, RiskAssessment};
use crate::core::state::WellbeingState;
use crate::core::windowing::{StressTrend, StressWindow};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every derived view of the aggregate, taken at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellbeingSummary {
    /// Check-ins inside the recent window
    pub recent_check_ins: usize,
    /// Check-ins ever recorded
    pub total_check_ins: usize,
    pub average_stress: Option<f64>,
    pub trend: StressTrend,
    pub streak: u32,
    /// Scans labelled stressed or fatigued
    pub flagged_scans: usize,
    pub assessment: RiskAssessment,
}

impl WellbeingSummary {
    pub fn from_window(window: &StressWindow, state: &WellbeingState) -> Self {
        let streak = window.streak();
        Self {
            recent_check_ins: window.len(),
            total_check_ins: state.stress_history.len(),
            average_stress: window.average(),
            trend: window.trend(),
            streak,
            flagged_scans: count_flagged_scans(state),
            assessment: assess(&window.samples, streak),
        }
    }
}

/// Scans whose result calls for follow-up.
pub fn count_flagged_scans(state: &WellbeingState) -> usize {
    state
        .emotion_scans
        .iter()
        .filter(|scan| scan.result.is_high_stress())
        .count()
}

impl fmt::Display for WellbeingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let average = self
            .average_stress
            .map(|a| format!("{a:.1}"))
            .unwrap_or_else(|| "-".to_string());

        writeln!(f, "Risk level: {}", self.assessment.tier.label())?;
        writeln!(
            f,
            "Based on {} check-ins & {} flagged emotion scans",
            self.recent_check_ins, self.flagged_scans
        )?;
        writeln!(f)?;
        writeln!(f, "  Average stress: {average}/5")?;
        writeln!(f, "  Trend: {}", self.trend)?;
        writeln!(f, "  High-stress streak: {}", self.streak)?;
        writeln!(f, "  Total check-ins: {}", self.total_check_ins)?;
        writeln!(f)?;
        writeln!(f, "Recommendations:")?;
        for rec in &self.assessment.recommendations {
            writeln!(f, "  - {rec}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::advisor::RiskTier;
    use crate::core::state::{AffectLabel, EmotionScan, StressSample};
    use chrono::{Duration, Utc};

    #[test]
    fn test_summary_from_window() {
        let now = Utc::now();
        let mut state = WellbeingState::default();
        for (i, level) in [2u8, 4, 4, 5].into_iter().enumerate() {
            state.stress_history.push(StressSample {
                date: "2025-01-01".to_string(),
                level,
                captured_at: now - Duration::hours(10 - i as i64),
            });
        }
        state.stress_history.insert(
            0,
            StressSample {
                date: "2024-12-01".to_string(),
                level: 1,
                captured_at: now - Duration::days(30),
            },
        );
        for result in [AffectLabel::Calm, AffectLabel::Stressed, AffectLabel::Fatigued] {
            state.emotion_scans.push(EmotionScan {
                date: "2025-01-01".to_string(),
                result,
                captured_at: now,
            });
        }

        let window = StressWindow::ending_at(&state.stress_history, now, 7);
        let summary = WellbeingSummary::from_window(&window, &state);

        assert_eq!(summary.recent_check_ins, 4);
        assert_eq!(summary.total_check_ins, 5);
        assert_eq!(summary.streak, 3);
        assert_eq!(summary.trend, StressTrend::Rising);
        assert_eq!(summary.flagged_scans, 2);
        assert_eq!(summary.assessment.tier, RiskTier::Moderate);

        let text = summary.to_string();
        assert!(text.contains("Moderate"));
        assert!(text.contains("High-stress streak: 3"));
    }
}
