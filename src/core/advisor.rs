//! Risk tiers and recommendations.
//!
//! A pure function of the recent stress window and the current streak. The
//! tier policy is evaluated top to bottom, first match wins:
//!
//! | condition              | tier     |
//! |------------------------|----------|
//! | streak >= 5            | high     |
//! | streak >= 3            | moderate |
//! | mean level >= 3.5      | elevated |
//! | otherwise              | low      |

use crate::core::state::{AffectLabel, StressSample};
use crate::core::windowing::average_level;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Streak at which the tier becomes high.
pub const HIGH_STREAK: u32 = 5;
/// Streak at which the tier becomes moderate.
pub const MODERATE_STREAK: u32 = 3;
/// Mean level at which the tier becomes elevated.
pub const ELEVATED_AVERAGE: f64 = 3.5;

/// Risk category, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Elevated,
    Moderate,
    High,
}

impl RiskTier {
    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low Risk",
            RiskTier::Elevated => "Elevated",
            RiskTier::Moderate => "Moderate",
            RiskTier::High => "High Risk",
        }
    }

    /// Fixed, ordered advice for this tier.
    pub fn recommendations(&self) -> &'static [&'static str] {
        match self {
            RiskTier::High => &[
                "Strongly recommend taking a rest day",
                "Consider speaking with your supervisor about shift adjustment",
                "Use the emergency support helpline if needed",
                "Try the breathing exercise before each shift",
            ],
            RiskTier::Moderate => &[
                "Take regular 10-minute breaks between deliveries",
                "Stay hydrated, aim for 8 glasses today",
                "Try a breathing exercise before your next shift",
                "Consider a lighter shift tomorrow",
            ],
            RiskTier::Elevated => &[
                "Your average stress is running high this week",
                "Plan a short break into each shift",
                "Try the breathing exercise when you feel tense",
                "Rest well tonight, aim for 7-8 hours",
            ],
            RiskTier::Low => &[
                "Keep up the great work! You're managing well",
                "Continue regular check-ins to track patterns",
                "Stay hydrated and stretch between deliveries",
                "Rest well tonight, aim for 7-8 hours",
            ],
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskTier::Low => "low",
            RiskTier::Elevated => "elevated",
            RiskTier::Moderate => "moderate",
            RiskTier::High => "high",
        };
        f.write_str(s)
    }
}

/// Outcome of a risk assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub tier: RiskTier,
    pub recommendations: Vec<String>,
    /// Mean level over the window used
    pub average: Option<f64>,
    pub streak: u32,
}

/// Pick the tier for a streak and average level.
pub fn tier_for(streak: u32, average: Option<f64>) -> RiskTier {
    if streak >= HIGH_STREAK {
        RiskTier::High
    } else if streak >= MODERATE_STREAK {
        RiskTier::Moderate
    } else if average.unwrap_or(0.0) >= ELEVATED_AVERAGE {
        RiskTier::Elevated
    } else {
        RiskTier::Low
    }
}

/// Assess risk from the recent stress window and the current streak.
pub fn assess(recent: &[StressSample], streak: u32) -> RiskAssessment {
    let average = average_level(recent);
    let tier = tier_for(streak, average);
    RiskAssessment {
        tier,
        recommendations: tier.recommendations().iter().map(|s| s.to_string()).collect(),
        average,
        streak,
    }
}

/// Follow-up suggestions after a scan; empty unless the result is high stress.
pub fn scan_suggestions(label: AffectLabel) -> &'static [&'static str] {
    if !label.is_high_stress() {
        return &[];
    }
    &[
        "Try the breathing exercise on the home page",
        "Take a 10-minute break if possible",
        "Drink some water and stretch",
        "Consider a lighter shift schedule",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn samples(levels: &[u8]) -> Vec<StressSample> {
        levels
            .iter()
            .map(|&level| StressSample {
                date: "2025-01-01".to_string(),
                level,
                captured_at: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn test_high_streak_ignores_average() {
        let assessment = assess(&samples(&[1, 1, 1]), 5);
        assert_eq!(assessment.tier, RiskTier::High);
    }

    #[test]
    fn test_elevated_from_average() {
        let assessment = assess(&samples(&[4, 4, 4, 4]), 0);
        assert_eq!(assessment.tier, RiskTier::Elevated);
        assert_eq!(assessment.average, Some(4.0));
    }

    #[test]
    fn test_tier_policy_order() {
        assert_eq!(tier_for(3, Some(5.0)), RiskTier::Moderate);
        assert_eq!(tier_for(4, None), RiskTier::Moderate);
        assert_eq!(tier_for(2, Some(3.5)), RiskTier::Elevated);
        assert_eq!(tier_for(2, Some(3.49)), RiskTier::Low);
        assert_eq!(tier_for(0, None), RiskTier::Low);
    }

    #[test]
    fn test_recommendations_follow_tier() {
        let assessment = assess(&[], 6);
        assert_eq!(
            assessment.recommendations[0],
            "Strongly recommend taking a rest day"
        );
        for tier in [RiskTier::Low, RiskTier::Elevated, RiskTier::Moderate, RiskTier::High] {
            assert!(!tier.recommendations().is_empty());
        }
    }

    #[test]
    fn test_tiers_are_ordered() {
        assert!(RiskTier::High > RiskTier::Moderate);
        assert!(RiskTier::Moderate > RiskTier::Elevated);
        assert!(RiskTier::Elevated > RiskTier::Low);
    }

    #[test]
    fn test_scan_suggestions() {
        assert!(scan_suggestions(AffectLabel::Calm).is_empty());
        assert!(scan_suggestions(AffectLabel::Neutral).is_empty());
        assert_eq!(scan_suggestions(AffectLabel::Fatigued).len(), 4);
    }
}
