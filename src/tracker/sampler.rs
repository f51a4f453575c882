use serde::Serialize;
use std::time::Duration;

use crate::error::SessionError;
use crate::models::session::FocusSession;
use crate::models::violation::Violation;

use super::matcher::{match_blocked_app, match_blocked_domain, website_label};

/// Sampling cadence and reminder rate limits for the violation tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub tick_seconds: u64,
    /// The website channel is evaluated on every Nth tick.
    pub website_check_every: u64,
    pub reminder_cooldown_ticks: u64,
    pub observer_timeout: Duration,
    pub browser_app: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 1,
            website_check_every: 5,
            reminder_cooldown_ticks: 2,
            observer_timeout: Duration::from_millis(800),
            browser_app: "Google Chrome".to_string(),
        }
    }
}

impl TrackerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_seconds)
    }

    /// Seconds credited per matching app tick.
    pub fn app_credit_seconds(&self) -> i64 {
        self.tick_seconds as i64
    }

    /// Seconds credited per matching website check; one check covers N ticks.
    pub fn website_credit_seconds(&self) -> i64 {
        (self.tick_seconds * self.website_check_every.max(1)) as i64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    App,
    Website,
}

/// Request to show the "return to focus" reminder for `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub target: String,
    pub channel: Channel,
    pub tick: u64,
}

/// What the observers reported for one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSample {
    pub frontmost_app: Option<String>,
    /// Only filled on website ticks while the browser is frontmost.
    pub website_domain: Option<String>,
}

/// Turns per-tick observer samples into violation transitions on a session.
#[derive(Debug, Clone)]
pub struct ViolationTracker {
    config: TrackerConfig,
    tick: u64,
    last_app_reminder: Option<u64>,
    last_website_reminder: Option<u64>,
    last_reminded_target: Option<String>,
}

impl ViolationTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tick: 0,
            last_app_reminder: None,
            last_website_reminder: None,
            last_reminded_target: None,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Number of ticks processed so far.
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    pub fn next_tick_checks_website(&self) -> bool {
        self.is_website_tick(self.tick + 1)
    }

    fn is_website_tick(&self, tick: u64) -> bool {
        tick % self.config.website_check_every.max(1) == 0
    }

    /// Applies one sample to the session.
    ///
    /// The app channel wins when both channels match. With no match the open
    /// violation is closed, except a website violation between website checks.
    /// Returns a reminder when the rate limit allows one.
    pub fn process_tick(&mut self, session: &mut FocusSession, sample: &TickSample) -> Result<Option<Reminder>, SessionError> {
        if session.is_terminal() {
            return Err(SessionError::InvalidState {
                operation: "sample a tick",
                state: session.state(),
            });
        }

        self.tick += 1;
        let tick = self.tick;
        let website_tick = self.is_website_tick(tick);

        let app_match = sample
            .frontmost_app
            .as_deref()
            .and_then(|app| match_blocked_app(app, session.blocked_apps()))
            .map(str::to_string);

        let website_match = if website_tick {
            sample
                .website_domain
                .as_deref()
                .and_then(|host| match_blocked_domain(host, session.blocked_domains()))
                .map(website_label)
        } else {
            None
        };

        let (target, channel, credit) = match (app_match, website_match) {
            (Some(app), _) => (app, Channel::App, self.config.app_credit_seconds()),
            (None, Some(label)) => (label, Channel::Website, self.config.website_credit_seconds()),
            (None, None) => {
                let hold_website = !website_tick && session.current_violation().is_some_and(Violation::is_website);
                if session.has_active_violation() && !hold_website {
                    session.end_current_violation()?;
                }
                return Ok(None);
            }
        };

        session.start_violation(&target)?;
        session.add_violation_duration(credit)?;
        Ok(self.maybe_remind(target, channel, tick))
    }

    fn maybe_remind(&mut self, target: String, channel: Channel, tick: u64) -> Option<Reminder> {
        let cooldown = self.config.reminder_cooldown_ticks;
        let target_changed = self.last_reminded_target.as_deref() != Some(target.as_str());
        let last = match channel {
            Channel::App => &mut self.last_app_reminder,
            Channel::Website => &mut self.last_website_reminder,
        };

        let cooled_down = last.is_none_or(|previous| tick.saturating_sub(previous) >= cooldown);
        if !cooled_down && !target_changed {
            return None;
        }

        *last = Some(tick);
        self.last_reminded_target = Some(target.clone());
        log::info!("Reminder for {} on tick {}", target, tick);
        Some(Reminder { target, channel, tick })
    }
}
