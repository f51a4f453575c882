use serde::{Deserialize, Serialize};

/// Penalty weights and streak thresholds used to grade a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringPolicy {
    pub base_score: u32,
    pub violation_penalty: u32,
    pub dismissal_penalty: u32,
    pub minute_penalty: u32,
    pub min_streak_minutes: u64,
    pub min_streak_score: u8,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            base_score: 100,
            violation_penalty: 5,
            dismissal_penalty: 2,
            minute_penalty: 1,
            min_streak_minutes: 30,
            min_streak_score: 80,
        }
    }
}

impl ScoringPolicy {
    /// Focus score for the aggregate violation statistics of a session.
    ///
    /// Partial minutes of distraction are free. The result is always in `0..=100`.
    pub fn score(&self, violation_count: usize, total_dismissals: u64, total_distracted_seconds: u64) -> u8 {
        let minutes = total_distracted_seconds / 60;

        let deductions = (violation_count as u64)
            .saturating_mul(self.violation_penalty as u64)
            .saturating_add(total_dismissals.saturating_mul(self.dismissal_penalty as u64))
            .saturating_add(minutes.saturating_mul(self.minute_penalty as u64));

        (self.base_score as u64).saturating_sub(deductions).min(100) as u8
    }

    pub fn qualifies_for_streak(&self, completed: bool, actual_duration_seconds: u64, score: u8) -> bool {
        completed
            && actual_duration_seconds / 60 >= self.min_streak_minutes
            && score >= self.min_streak_score
    }
}
