use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SessionError;

/// Label prefix that separates website violations from app violations.
pub const WEBSITE_PREFIX: &str = "Website: ";

/// One continuous distraction episode on a single blocked target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    target: String,
    timestamp: DateTime<Local>,
    duration_seconds: u64,
    dismiss_count: u32,
}

impl Violation {
    pub fn new(target: impl Into<String>) -> Self {
        Self::started_at(target, Local::now())
    }

    pub fn started_at(target: impl Into<String>, timestamp: DateTime<Local>) -> Self {
        Self {
            target: target.into(),
            timestamp,
            duration_seconds: 0,
            dismiss_count: 0,
        }
    }

    /// Adds distracted time to the episode. Negative input is rejected.
    pub fn add_duration(&mut self, seconds: i64) -> Result<(), SessionError> {
        if seconds < 0 {
            return Err(SessionError::NegativeDuration { seconds });
        }
        self.duration_seconds = self.duration_seconds.saturating_add(seconds as u64);
        Ok(())
    }

    pub fn record_dismissal(&mut self) {
        self.dismiss_count = self.dismiss_count.saturating_add(1);
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn duration_seconds(&self) -> u64 {
        self.duration_seconds
    }

    pub fn duration_minutes(&self) -> u64 {
        self.duration_seconds / 60
    }

    pub fn dismiss_count(&self) -> u32 {
        self.dismiss_count
    }

    pub fn is_website(&self) -> bool {
        self.target.starts_with(WEBSITE_PREFIX)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} for {}s ({} dismissals, started {})",
            self.target,
            self.duration_seconds,
            self.dismiss_count,
            self.timestamp.format("%H:%M:%S")
        )
    }
}
