//! Rolling time window over stress check-ins.
//!
//! The recent window holds every sample captured strictly after
//! `now - days * 24h`, kept in insertion order. Streak, average and trend
//! are all computed over that window.

use crate::core::state::StressSample;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fmt;

/// Default length of the recent window in days.
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Direction of stress across the recent window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StressTrend {
    /// Latest level above the earliest
    Rising,
    /// Latest level below the earliest
    Improving,
    Stable,
}

impl fmt::Display for StressTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StressTrend::Rising => write!(f, "Rising"),
            StressTrend::Improving => write!(f, "Improving"),
            StressTrend::Stable => write!(f, "Stable"),
        }
    }
}

/// Samples falling inside a time window ending now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StressWindow {
    /// Exclusive lower bound
    pub start: DateTime<Utc>,
    /// The instant the window was taken
    pub end: DateTime<Utc>,
    /// Samples in chronological order
    pub samples: Vec<StressSample>,
}

impl StressWindow {
    /// Select the samples of `history` within `days` of `now`.
    pub fn ending_at(history: &[StressSample], now: DateTime<Utc>, days: u32) -> Self {
        let start = now - Duration::days(days as i64);
        let samples = history
            .iter()
            .filter(|s| s.captured_at > start)
            .cloned()
            .collect();
        Self {
            start,
            end: now,
            samples,
        }
    }

    /// Check if a timestamp falls within this window.
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp > self.start
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Consecutive high-stress samples counting back from the most recent.
    pub fn streak(&self) -> u32 {
        stress_streak(&self.samples)
    }

    /// Mean level, or `None` for an empty window.
    pub fn average(&self) -> Option<f64> {
        average_level(&self.samples)
    }

    pub fn trend(&self) -> StressTrend {
        stress_trend(&self.samples)
    }
}

/// Count consecutive samples with a high level, walking back from the end.
pub fn stress_streak(samples: &[StressSample]) -> u32 {
    samples.iter().rev().take_while(|s| s.is_high()).count() as u32
}

/// Mean stress level of the samples.
pub fn average_level(samples: &[StressSample]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().map(|s| s.level as f64).mean())
}

/// Compare the latest level with the earliest.
pub fn stress_trend(samples: &[StressSample]) -> StressTrend {
    match (samples.first(), samples.last()) {
        (Some(first), Some(last)) if samples.len() >= 2 => {
            match last.level.cmp(&first.level) {
                std::cmp::Ordering::Greater => StressTrend::Rising,
                std::cmp::Ordering::Less => StressTrend::Improving,
                std::cmp::Ordering::Equal => StressTrend::Stable,
            }
        }
        _ => StressTrend::Stable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(level: u8, captured_at: DateTime<Utc>) -> StressSample {
        StressSample {
            date: captured_at.format("%Y-%m-%d").to_string(),
            level,
            captured_at,
        }
    }

    fn series(levels: &[u8]) -> Vec<StressSample> {
        let now = Utc::now();
        levels
            .iter()
            .enumerate()
            .map(|(i, &level)| sample(level, now - Duration::hours((levels.len() - i) as i64)))
            .collect()
    }

    #[test]
    fn test_streak_examples() {
        assert_eq!(stress_streak(&series(&[2, 4, 5, 4])), 3);
        assert_eq!(stress_streak(&series(&[4, 5, 2, 5])), 1);
        assert_eq!(stress_streak(&series(&[])), 0);
        assert_eq!(stress_streak(&series(&[5, 5, 5, 5, 5])), 5);
        assert_eq!(stress_streak(&series(&[4, 3])), 0);
    }

    #[test]
    fn test_window_boundaries() {
        let now = Utc::now();
        let history = vec![
            sample(5, now - Duration::days(7) - Duration::seconds(1)),
            sample(5, now - Duration::days(7)),
            sample(2, now - Duration::days(6)),
        ];
        let window = StressWindow::ending_at(&history, now, DEFAULT_WINDOW_DAYS);
        assert_eq!(window.len(), 1);
        assert_eq!(window.samples[0].level, 2);
        assert!(!window.contains(now - Duration::days(7)));
        assert!(window.contains(now - Duration::days(6)));
    }

    #[test]
    fn test_streak_stops_at_window_start() {
        let now = Utc::now();
        let history = vec![
            sample(5, now - Duration::days(10)),
            sample(4, now - Duration::days(2)),
            sample(5, now - Duration::days(1)),
        ];
        let window = StressWindow::ending_at(&history, now, 7);
        assert_eq!(window.streak(), 2);
    }

    #[test]
    fn test_average() {
        assert_eq!(average_level(&[]), None);
        let avg = average_level(&series(&[3, 4, 5])).unwrap();
        assert!((avg - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_trend() {
        assert_eq!(stress_trend(&series(&[2, 5, 4])), StressTrend::Rising);
        assert_eq!(stress_trend(&series(&[5, 1, 3])), StressTrend::Improving);
        assert_eq!(stress_trend(&series(&[3, 5, 3])), StressTrend::Stable);
        assert_eq!(stress_trend(&series(&[5])), StressTrend::Stable);
        assert_eq!(stress_trend(&[]), StressTrend::Stable);
    }
}
