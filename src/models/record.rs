use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::models::scoring::ScoringPolicy;
use crate::models::violation::Violation;

/// Read-only snapshot of a finished session, shaped for serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub date: String, // YYYY-MM-DD
    pub start_time: DateTime<Local>,
    pub planned_duration: u64,
    pub actual_duration: u64,
    pub focus_score: u8,
    pub completed: bool,
    pub blocked_apps: Vec<String>,
    #[serde(default)]
    pub blocked_domains: Vec<String>,
    pub violations: Vec<Violation>,
}

impl SessionRecord {
    pub fn qualifies_for_streak(&self, policy: &ScoringPolicy) -> bool {
        policy.qualifies_for_streak(self.completed, self.actual_duration, self.focus_score)
    }

    pub fn total_distraction_seconds(&self) -> u64 {
        self.violations.iter().map(Violation::duration_seconds).sum()
    }
}

/// Finished sessions in the order they ended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHistory {
    sessions: Vec<SessionRecord>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(sessions: Vec<SessionRecord>) -> Self {
        Self { sessions }
    }

    pub fn add(&mut self, record: SessionRecord) {
        self.sessions.push(record);
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    pub fn sessions(&self) -> &[SessionRecord] {
        &self.sessions
    }

    /// Consecutive qualifying sessions counted back from the most recent one.
    pub fn current_streak(&self, policy: &ScoringPolicy) -> usize {
        self.sessions
            .iter()
            .rev()
            .take_while(|record| record.qualifies_for_streak(policy))
            .count()
    }

    pub fn best_streak(&self, policy: &ScoringPolicy) -> usize {
        let mut best = 0;
        let mut run = 0;
        for record in &self.sessions {
            if record.qualifies_for_streak(policy) {
                run += 1;
                best = best.max(run);
            } else {
                run = 0;
            }
        }
        best
    }

    pub fn total_focus_minutes(&self) -> u64 {
        self.sessions.iter().map(|record| record.actual_duration / 60).sum()
    }

    pub fn average_score(&self) -> Option<f64> {
        if self.sessions.is_empty() {
            return None;
        }
        let total: u64 = self.sessions.iter().map(|record| record.focus_score as u64).sum();
        Some(total as f64 / self.sessions.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(completed: bool, actual_duration: u64, focus_score: u8) -> SessionRecord {
        SessionRecord {
            id: format!("session-{actual_duration}-{focus_score}"),
            date: "2026-10-18".to_string(),
            start_time: Local::now(),
            planned_duration: 3600,
            actual_duration,
            focus_score,
            completed,
            blocked_apps: vec!["Discord".to_string()],
            blocked_domains: Vec::new(),
            violations: Vec::new(),
        }
    }

    #[test]
    fn test_streaks() {
        let policy = ScoringPolicy::default();
        let history = SessionHistory::from_records(vec![
            record(true, 1800, 90),
            record(true, 2400, 85),
            record(true, 3600, 100),
            record(false, 3600, 100),
            record(true, 1800, 80),
            record(true, 1800, 95),
        ]);

        assert_eq!(history.count(), 6);
        assert_eq!(history.current_streak(&policy), 2);
        assert_eq!(history.best_streak(&policy), 3);
    }

    #[test]
    fn test_streak_broken_by_latest_session() {
        let policy = ScoringPolicy::default();
        let mut history = SessionHistory::new();
        history.add(record(true, 1800, 90));
        history.add(record(true, 1500, 100));

        assert_eq!(history.current_streak(&policy), 0);
        assert_eq!(history.best_streak(&policy), 1);
    }

    #[test]
    fn test_totals() {
        let history = SessionHistory::from_records(vec![record(true, 1830, 90), record(false, 600, 70)]);
        assert_eq!(history.total_focus_minutes(), 40);
        assert_eq!(history.average_score(), Some(80.0));
        assert_eq!(SessionHistory::new().average_score(), None);
    }

    #[test]
    fn test_record_json_shape() {
        let json = serde_json::to_value(record(true, 1800, 90)).unwrap();
        assert_eq!(json["plannedDuration"], 3600);
        assert_eq!(json["focusScore"], 90);
        assert_eq!(json["completed"], true);
        assert_eq!(json["blockedApps"][0], "Discord");
    }
}
