use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::SessionError;
use crate::models::record::SessionRecord;
use crate::models::scoring::ScoringPolicy;
use crate::models::violation::Violation;

/// Label reported when a session has no violations.
pub const NO_DISTRACTION: &str = "None";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Running,
    Completed,
    Abandoned,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionState::Running)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Running => "running",
            SessionState::Completed => "completed",
            SessionState::Abandoned => "abandoned",
        };
        f.write_str(label)
    }
}

/// One timed focus session and the violations observed during it.
///
/// Closed violations are kept in chronological order; at most one violation is
/// open at a time. The score is recomputed from the closed history after every
/// mutation. Once completed or abandoned the session only answers queries.
#[derive(Debug, Clone)]
pub struct FocusSession {
    id: String,
    start_time: DateTime<Local>,
    planned_duration: u64,
    actual_duration: Option<u64>,
    violations: Vec<Violation>,
    current_violation: Option<Violation>,
    focus_score: u8,
    state: SessionState,
    blocked_apps: Vec<String>,
    blocked_domains: Vec<String>,
    policy: ScoringPolicy,
}

impl FocusSession {
    pub fn start(planned_duration_seconds: i64, blocked_apps: Vec<String>) -> Result<Self, SessionError> {
        Self::with_policy(planned_duration_seconds, blocked_apps, Vec::new(), ScoringPolicy::default())
    }

    pub fn with_policy(
        planned_duration_seconds: i64,
        blocked_apps: Vec<String>,
        blocked_domains: Vec<String>,
        policy: ScoringPolicy,
    ) -> Result<Self, SessionError> {
        if planned_duration_seconds <= 0 {
            return Err(SessionError::InvalidPlannedDuration {
                seconds: planned_duration_seconds,
            });
        }

        let session = Self {
            id: Uuid::new_v4().to_string(),
            start_time: Local::now(),
            planned_duration: planned_duration_seconds as u64,
            actual_duration: None,
            violations: Vec::new(),
            current_violation: None,
            focus_score: policy.score(0, 0, 0),
            state: SessionState::Running,
            blocked_apps: dedup_targets(blocked_apps),
            blocked_domains: dedup_targets(blocked_domains),
            policy,
        };

        log::info!(
            "Started focus session {} for {}s (apps: {:?}, domains: {:?})",
            session.id,
            session.planned_duration,
            session.blocked_apps,
            session.blocked_domains
        );
        Ok(session)
    }

    /// Rebuilds a finished session from its record. The stored score is kept as-is.
    pub fn from_record(record: SessionRecord, policy: ScoringPolicy) -> Result<Self, SessionError> {
        if record.focus_score > 100 {
            return Err(SessionError::InvalidRecord(format!(
                "focus score {} is out of range",
                record.focus_score
            )));
        }
        if record.planned_duration == 0 {
            return Err(SessionError::InvalidRecord("planned duration is zero".to_string()));
        }

        let state = if record.completed {
            SessionState::Completed
        } else {
            SessionState::Abandoned
        };

        Ok(Self {
            id: record.id,
            start_time: record.start_time,
            planned_duration: record.planned_duration,
            actual_duration: Some(record.actual_duration),
            violations: record.violations,
            current_violation: None,
            focus_score: record.focus_score,
            state,
            blocked_apps: record.blocked_apps,
            blocked_domains: record.blocked_domains,
            policy,
        })
    }

    /// Opens a violation for `target`.
    ///
    /// An open violation for a different target is closed first; one for the
    /// same target is left untouched.
    pub fn start_violation(&mut self, target: &str) -> Result<(), SessionError> {
        self.ensure_running("start a violation")?;

        if let Some(current) = &self.current_violation {
            if current.target() == target {
                return Ok(());
            }
            self.close_current_violation();
        }

        log::debug!("Violation opened: {}", target);
        self.current_violation = Some(Violation::new(target));
        self.recalculate_focus_score();
        Ok(())
    }

    pub fn add_violation_duration(&mut self, seconds: i64) -> Result<(), SessionError> {
        self.ensure_running("add violation time")?;
        if seconds < 0 {
            return Err(SessionError::NegativeDuration { seconds });
        }

        if let Some(current) = self.current_violation.as_mut() {
            current.add_duration(seconds)?;
        }
        self.recalculate_focus_score();
        Ok(())
    }

    pub fn record_dismissal(&mut self) -> Result<(), SessionError> {
        self.ensure_running("record a dismissal")?;

        if let Some(current) = self.current_violation.as_mut() {
            current.record_dismissal();
            log::debug!("Reminder dismissed for {} ({} total)", current.target(), current.dismiss_count());
        }
        self.recalculate_focus_score();
        Ok(())
    }

    pub fn end_current_violation(&mut self) -> Result<(), SessionError> {
        self.ensure_running("end a violation")?;
        self.close_current_violation();
        self.recalculate_focus_score();
        Ok(())
    }

    pub fn complete(&mut self, actual_duration_seconds: i64) -> Result<(), SessionError> {
        self.terminate(SessionState::Completed, actual_duration_seconds, "complete")
    }

    pub fn abandon(&mut self, actual_duration_seconds: i64) -> Result<(), SessionError> {
        self.terminate(SessionState::Abandoned, actual_duration_seconds, "abandon")
    }

    pub fn qualifies_for_streak(&self) -> bool {
        self.policy.qualifies_for_streak(
            self.state == SessionState::Completed,
            self.actual_duration.unwrap_or(0),
            self.focus_score,
        )
    }

    pub fn violation_count(&self) -> usize {
        self.violations.len()
    }

    pub fn total_dismissals(&self) -> u64 {
        self.violations.iter().map(|v| v.dismiss_count() as u64).sum()
    }

    pub fn total_distraction_seconds(&self) -> u64 {
        self.violations.iter().map(Violation::duration_seconds).sum()
    }

    /// Target with the largest summed duration across the closed history.
    /// Ties go to the target seen first.
    pub fn most_distracting_target(&self) -> Option<&str> {
        let mut totals: Vec<(&str, u64)> = Vec::new();
        for violation in &self.violations {
            match totals.iter_mut().find(|(target, _)| *target == violation.target()) {
                Some(entry) => entry.1 += violation.duration_seconds(),
                None => totals.push((violation.target(), violation.duration_seconds())),
            }
        }

        totals
            .into_iter()
            .fold(None, |best: Option<(&str, u64)>, (target, seconds)| match best {
                Some((_, best_seconds)) if best_seconds >= seconds => best,
                _ => Some((target, seconds)),
            })
            .map(|(target, _)| target)
    }

    pub fn most_distracting_label(&self) -> &str {
        self.most_distracting_target().unwrap_or(NO_DISTRACTION)
    }

    /// Snapshot for the persistence layer. Only available once the session ended.
    pub fn to_record(&self) -> Result<SessionRecord, SessionError> {
        if !self.state.is_terminal() {
            return Err(SessionError::InvalidState {
                operation: "build a session record",
                state: self.state,
            });
        }

        Ok(SessionRecord {
            id: self.id.clone(),
            date: self.date(),
            start_time: self.start_time,
            planned_duration: self.planned_duration,
            actual_duration: self.actual_duration.unwrap_or(0),
            focus_score: self.focus_score,
            completed: self.state == SessionState::Completed,
            blocked_apps: self.blocked_apps.clone(),
            blocked_domains: self.blocked_domains.clone(),
            violations: self.violations.clone(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn start_time(&self) -> DateTime<Local> {
        self.start_time
    }

    pub fn date(&self) -> String {
        self.start_time.format("%Y-%m-%d").to_string()
    }

    pub fn planned_duration(&self) -> u64 {
        self.planned_duration
    }

    pub fn planned_duration_minutes(&self) -> u64 {
        self.planned_duration / 60
    }

    pub fn actual_duration(&self) -> Option<u64> {
        self.actual_duration
    }

    pub fn actual_duration_minutes(&self) -> u64 {
        self.actual_duration.unwrap_or(0) / 60
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn current_violation(&self) -> Option<&Violation> {
        self.current_violation.as_ref()
    }

    pub fn has_active_violation(&self) -> bool {
        self.current_violation.is_some()
    }

    pub fn focus_score(&self) -> u8 {
        self.focus_score
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_completed(&self) -> bool {
        self.state == SessionState::Completed
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn blocked_apps(&self) -> &[String] {
        &self.blocked_apps
    }

    pub fn blocked_domains(&self) -> &[String] {
        &self.blocked_domains
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    fn terminate(&mut self, state: SessionState, actual_duration_seconds: i64, operation: &'static str) -> Result<(), SessionError> {
        self.ensure_running(operation)?;
        if actual_duration_seconds < 0 {
            return Err(SessionError::NegativeDuration {
                seconds: actual_duration_seconds,
            });
        }

        self.close_current_violation();
        self.actual_duration = Some(actual_duration_seconds as u64);
        self.state = state;
        self.recalculate_focus_score();

        log::info!(
            "Focus session {} {} after {}s: score {}, {} violations",
            self.id,
            state,
            actual_duration_seconds,
            self.focus_score,
            self.violations.len()
        );
        Ok(())
    }

    fn ensure_running(&self, operation: &'static str) -> Result<(), SessionError> {
        if self.state.is_terminal() {
            return Err(SessionError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    fn close_current_violation(&mut self) {
        if let Some(violation) = self.current_violation.take() {
            log::debug!("Violation closed: {}", violation);
            self.violations.push(violation);
        }
    }

    fn recalculate_focus_score(&mut self) {
        self.focus_score = self.policy.score(
            self.violations.len(),
            self.total_dismissals(),
            self.total_distraction_seconds(),
        );
    }
}

impl fmt::Display for FocusSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FocusSession {} ({}): {}/{} min, score {}, {} violations",
            self.id,
            self.state,
            self.actual_duration_minutes(),
            self.planned_duration_minutes(),
            self.focus_score,
            self.violations.len()
        )
    }
}

fn dedup_targets(targets: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(targets.len());
    for target in targets {
        let trimmed = target.trim();
        if !trimmed.is_empty() && !unique.iter().any(|existing| existing == trimmed) {
            unique.push(trimmed.to_string());
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_session() -> FocusSession {
        FocusSession::start(1500, vec!["Discord".to_string(), "Steam".to_string()]).unwrap()
    }

    #[test]
    fn test_start_initial_state() {
        let session = running_session();
        assert_eq!(session.state(), SessionState::Running);
        assert_eq!(session.focus_score(), 100);
        assert_eq!(session.planned_duration(), 1500);
        assert_eq!(session.actual_duration(), None);
        assert!(session.violations().is_empty());
        assert!(!session.has_active_violation());
    }

    #[test]
    fn test_start_rejects_non_positive_duration() {
        assert_eq!(
            FocusSession::start(0, Vec::new()).unwrap_err(),
            SessionError::InvalidPlannedDuration { seconds: 0 }
        );
        assert_eq!(
            FocusSession::start(-60, Vec::new()).unwrap_err(),
            SessionError::InvalidPlannedDuration { seconds: -60 }
        );
    }

    #[test]
    fn test_blocked_targets_are_deduplicated_in_order() {
        let session = FocusSession::start(
            60,
            vec!["Steam".into(), " Discord ".into(), "Steam".into(), "".into()],
        )
        .unwrap();
        assert_eq!(session.blocked_apps(), ["Steam", "Discord"]);
    }

    #[test]
    fn test_start_violation_is_idempotent() {
        let mut session = running_session();
        session.start_violation("Discord").unwrap();
        session.add_violation_duration(3).unwrap();
        session.start_violation("Discord").unwrap();
        session.add_violation_duration(2).unwrap();

        assert_eq!(session.current_violation().unwrap().duration_seconds(), 5);
        assert_eq!(session.violation_count(), 0);

        session.end_current_violation().unwrap();
        assert_eq!(session.violation_count(), 1);
    }

    #[test]
    fn test_switching_targets_closes_previous_violation() {
        let mut session = running_session();
        session.start_violation("Discord").unwrap();
        session.add_violation_duration(12).unwrap();
        session.record_dismissal().unwrap();

        session.start_violation("Steam").unwrap();

        assert_eq!(session.violation_count(), 1);
        let closed = &session.violations()[0];
        assert_eq!(closed.target(), "Discord");
        assert_eq!(closed.duration_seconds(), 12);
        assert_eq!(closed.dismiss_count(), 1);
        assert_eq!(session.current_violation().unwrap().target(), "Steam");
        // 1 violation, 1 dismissal
        assert_eq!(session.focus_score(), 93);
    }

    #[test]
    fn test_open_violation_not_counted_until_closed() {
        let mut session = running_session();
        session.start_violation("Discord").unwrap();
        session.add_violation_duration(120).unwrap();
        session.record_dismissal().unwrap();

        assert_eq!(session.total_dismissals(), 0);
        assert_eq!(session.total_distraction_seconds(), 0);
        assert_eq!(session.focus_score(), 100);

        session.end_current_violation().unwrap();
        assert_eq!(session.total_dismissals(), 1);
        assert_eq!(session.total_distraction_seconds(), 120);
        assert_eq!(session.focus_score(), 100 - 5 - 2 - 2);
    }

    #[test]
    fn test_mutations_without_open_violation_are_noops() {
        let mut session = running_session();
        session.add_violation_duration(30).unwrap();
        session.record_dismissal().unwrap();
        session.end_current_violation().unwrap();

        assert!(session.violations().is_empty());
        assert_eq!(session.focus_score(), 100);
    }

    #[test]
    fn test_negative_violation_duration_is_rejected() {
        let mut session = running_session();
        session.start_violation("Discord").unwrap();
        session.add_violation_duration(4).unwrap();

        let err = session.add_violation_duration(-1).unwrap_err();
        assert_eq!(err, SessionError::NegativeDuration { seconds: -1 });
        assert_eq!(session.current_violation().unwrap().duration_seconds(), 4);
    }

    #[test]
    fn test_complete_closes_open_violation() {
        let mut session = running_session();
        session.start_violation("Steam").unwrap();
        session.add_violation_duration(90).unwrap();
        session.complete(1500).unwrap();

        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(session.actual_duration(), Some(1500));
        assert!(!session.has_active_violation());
        assert_eq!(session.violation_count(), 1);
        assert_eq!(session.focus_score(), 100 - 5 - 1);
    }

    #[test]
    fn test_terminal_session_rejects_every_mutation() {
        let mut session = running_session();
        session.start_violation("Discord").unwrap();
        session.add_violation_duration(61).unwrap();
        session.complete(1800).unwrap();

        let history = session.violations().to_vec();
        let score = session.focus_score();

        assert!(matches!(session.start_violation("Steam"), Err(SessionError::InvalidState { .. })));
        assert!(matches!(session.add_violation_duration(5), Err(SessionError::InvalidState { .. })));
        assert!(matches!(session.record_dismissal(), Err(SessionError::InvalidState { .. })));
        assert!(matches!(session.end_current_violation(), Err(SessionError::InvalidState { .. })));
        assert!(matches!(session.complete(1800), Err(SessionError::InvalidState { .. })));
        assert!(matches!(session.abandon(10), Err(SessionError::InvalidState { .. })));

        assert_eq!(session.violations(), history.as_slice());
        assert_eq!(session.focus_score(), score);
        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(session.actual_duration(), Some(1800));
    }

    #[test]
    fn test_abandon_then_complete_is_rejected() {
        let mut session = running_session();
        session.abandon(300).unwrap();

        let err = session.complete(1500).unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidState {
                operation: "complete",
                state: SessionState::Abandoned
            }
        );
        assert_eq!(session.actual_duration(), Some(300));
    }

    #[test]
    fn test_negative_actual_duration_keeps_session_running() {
        let mut session = running_session();
        session.start_violation("Discord").unwrap();

        assert!(session.complete(-1).is_err());
        assert_eq!(session.state(), SessionState::Running);
        assert!(session.has_active_violation());
        assert_eq!(session.actual_duration(), None);
    }

    #[test]
    fn test_streak_qualification() {
        let mut session = running_session();
        session.complete(1800).unwrap();
        assert!(session.qualifies_for_streak());

        let mut short = running_session();
        short.complete(1799).unwrap();
        assert!(!short.qualifies_for_streak());

        let mut abandoned = running_session();
        abandoned.abandon(3600).unwrap();
        assert_eq!(abandoned.focus_score(), 100);
        assert!(!abandoned.qualifies_for_streak());
    }

    #[test]
    fn test_streak_requires_minimum_score() {
        let mut session = running_session();
        for _ in 0..5 {
            session.start_violation("Discord").unwrap();
            session.end_current_violation().unwrap();
        }
        session.complete(3600).unwrap();
        // 5 violations => 75
        assert_eq!(session.focus_score(), 75);
        assert!(!session.qualifies_for_streak());
    }

    #[test]
    fn test_most_distracting_target() {
        let mut session = running_session();
        assert_eq!(session.most_distracting_target(), None);
        assert_eq!(session.most_distracting_label(), NO_DISTRACTION);

        session.start_violation("A").unwrap();
        session.add_violation_duration(30).unwrap();
        session.start_violation("B").unwrap();
        session.add_violation_duration(90).unwrap();
        session.start_violation("A").unwrap();
        session.add_violation_duration(10).unwrap();
        session.end_current_violation().unwrap();

        assert_eq!(session.violation_count(), 3);
        assert_eq!(session.most_distracting_target(), Some("B"));
    }

    #[test]
    fn test_most_distracting_tie_goes_to_first_seen() {
        let mut session = running_session();
        session.start_violation("Steam").unwrap();
        session.add_violation_duration(20).unwrap();
        session.start_violation("Discord").unwrap();
        session.add_violation_duration(20).unwrap();
        session.end_current_violation().unwrap();

        assert_eq!(session.most_distracting_target(), Some("Steam"));
    }

    #[test]
    fn test_record_requires_terminal_session() {
        let mut session = running_session();
        assert!(session.to_record().is_err());

        session.start_violation("Discord").unwrap();
        session.add_violation_duration(75).unwrap();
        session.abandon(600).unwrap();

        let record = session.to_record().unwrap();
        assert_eq!(record.id, session.id());
        assert!(!record.completed);
        assert_eq!(record.actual_duration, 600);
        assert_eq!(record.focus_score, session.focus_score());
        assert_eq!(record.violations.len(), 1);
    }
}
