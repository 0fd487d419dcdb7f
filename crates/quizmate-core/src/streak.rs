//! Consecutive-correct streak tracking.

use serde::{Deserialize, Serialize};

/// Display tier derived from the current streak.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreakTier {
    #[default]
    None,
    /// 3 or 4 in a row.
    Medium,
    /// 5 or more in a row.
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreakTracker {
    current: u32,
    best: u32,
}

impl StreakTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one submitted answer and return the new streak.
    pub fn record(&mut self, correct: bool) -> u32 {
        if correct {
            self.current = self.current.saturating_add(1);
            self.best = self.best.max(self.current);
        } else {
            self.current = 0;
        }
        self.current
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    /// Longest streak seen so far.
    pub fn best(&self) -> u32 {
        self.best
    }

    pub fn tier(&self) -> StreakTier {
        match self.current {
            n if n >= 5 => StreakTier::High,
            3 | 4 => StreakTier::Medium,
            _ => StreakTier::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streak_sequence_resets_on_miss() {
        let mut tracker = StreakTracker::new();
        let values: Vec<u32> = [true, true, false, true]
            .into_iter()
            .map(|c| tracker.record(c))
            .collect();
        assert_eq!(values, vec![1, 2, 0, 1]);
        assert_eq!(tracker.best(), 2);
    }

    #[test]
    fn tiers_follow_thresholds() {
        let mut tracker = StreakTracker::new();
        let mut tiers = Vec::new();
        for _ in 0..6 {
            tracker.record(true);
            tiers.push(tracker.tier());
        }
        assert_eq!(
            tiers,
            vec![
                StreakTier::None,
                StreakTier::None,
                StreakTier::Medium,
                StreakTier::Medium,
                StreakTier::High,
                StreakTier::High,
            ]
        );
        tracker.record(false);
        assert_eq!(tracker.tier(), StreakTier::None);
        assert_eq!(tracker.best(), 6);
    }
}
