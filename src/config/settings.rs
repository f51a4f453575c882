use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::models::scoring::ScoringPolicy;
use crate::tracker::sampler::TrackerConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub tracker: TrackerConfig,
    pub scoring: ScoringPolicy,
    pub default_minutes: u64,
    pub blocked_apps: Vec<String>,
    pub blocked_domains: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tracker: TrackerConfig::default(),
            scoring: ScoringPolicy::default(),
            default_minutes: 25,
            blocked_apps: Vec::new(),
            blocked_domains: Vec::new(),
        }
    }
}

impl Settings {
    fn get_env_path() -> Result<std::path::PathBuf> {
        Ok(env::current_dir()?.join(".env"))
    }

    /// Loads settings from the process environment, after reading `.env` if present.
    pub fn new() -> Result<Self> {
        let env_path = Self::get_env_path()?;
        if dotenvy::from_path(&env_path).is_ok() {
            log::info!("Loaded settings overrides from {}", env_path.display());
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from any key lookup. Missing keys keep their defaults;
    /// present but malformed values are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Settings::default();
        let tracker_defaults = defaults.tracker;
        let scoring_defaults = defaults.scoring;

        let observer_timeout_ms: u64 = parse_var(
            &lookup,
            "FOCUS_OBSERVER_TIMEOUT_MS",
            tracker_defaults.observer_timeout.as_millis() as u64,
        )?;

        let tracker = TrackerConfig {
            tick_seconds: parse_var(&lookup, "FOCUS_TICK_SECONDS", tracker_defaults.tick_seconds)?,
            website_check_every: parse_var(&lookup, "FOCUS_WEBSITE_CHECK_TICKS", tracker_defaults.website_check_every)?,
            reminder_cooldown_ticks: parse_var(
                &lookup,
                "FOCUS_REMINDER_COOLDOWN_TICKS",
                tracker_defaults.reminder_cooldown_ticks,
            )?,
            observer_timeout: Duration::from_millis(observer_timeout_ms),
            browser_app: lookup("FOCUS_BROWSER_APP")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(tracker_defaults.browser_app),
        };

        let scoring = ScoringPolicy {
            base_score: parse_var(&lookup, "FOCUS_SCORE_BASE", scoring_defaults.base_score)?,
            violation_penalty: parse_var(&lookup, "FOCUS_PENALTY_VIOLATION", scoring_defaults.violation_penalty)?,
            dismissal_penalty: parse_var(&lookup, "FOCUS_PENALTY_DISMISSAL", scoring_defaults.dismissal_penalty)?,
            minute_penalty: parse_var(&lookup, "FOCUS_PENALTY_MINUTE", scoring_defaults.minute_penalty)?,
            min_streak_minutes: parse_var(&lookup, "FOCUS_STREAK_MIN_MINUTES", scoring_defaults.min_streak_minutes)?,
            min_streak_score: parse_var(&lookup, "FOCUS_STREAK_MIN_SCORE", scoring_defaults.min_streak_score)?,
        };

        let settings = Self {
            tracker,
            scoring,
            default_minutes: parse_var(&lookup, "FOCUS_DEFAULT_MINUTES", defaults.default_minutes)?,
            blocked_apps: parse_list(lookup("FOCUS_BLOCKED_APPS")),
            blocked_domains: parse_list(lookup("FOCUS_BLOCKED_DOMAINS")),
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.tracker.tick_seconds == 0 {
            anyhow::bail!("FOCUS_TICK_SECONDS must be at least 1");
        }
        if self.tracker.website_check_every == 0 {
            anyhow::bail!("FOCUS_WEBSITE_CHECK_TICKS must be at least 1");
        }
        if self.tracker.observer_timeout >= self.tracker.tick_interval() {
            anyhow::bail!(
                "FOCUS_OBSERVER_TIMEOUT_MS ({}ms) must be shorter than the tick interval ({}s)",
                self.tracker.observer_timeout.as_millis(),
                self.tracker.tick_seconds
            );
        }
        if self.default_minutes == 0 {
            anyhow::bail!("FOCUS_DEFAULT_MINUTES must be greater than zero");
        }
        if self.scoring.min_streak_score > 100 {
            anyhow::bail!("FOCUS_STREAK_MIN_SCORE must be between 0 and 100");
        }
        Ok(())
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: '{raw}'")),
        _ => Ok(default),
    }
}

fn parse_list(raw: Option<String>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let settings = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.tracker.website_check_every, 5);
        assert_eq!(settings.tracker.reminder_cooldown_ticks, 2);
        assert_eq!(settings.scoring.base_score, 100);
    }

    #[test]
    fn test_overrides_and_lists() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("FOCUS_BLOCKED_APPS", "Discord, Steam,,  Slack "),
            ("FOCUS_BLOCKED_DOMAINS", "youtube.com,reddit.com"),
            ("FOCUS_PENALTY_VIOLATION", "10"),
            ("FOCUS_BROWSER_APP", "Brave Browser"),
            ("FOCUS_DEFAULT_MINUTES", "50"),
        ]))
        .unwrap();

        assert_eq!(settings.blocked_apps, vec!["Discord", "Steam", "Slack"]);
        assert_eq!(settings.blocked_domains, vec!["youtube.com", "reddit.com"]);
        assert_eq!(settings.scoring.violation_penalty, 10);
        assert_eq!(settings.tracker.browser_app, "Brave Browser");
        assert_eq!(settings.default_minutes, 50);
    }

    #[test]
    fn test_malformed_value_is_an_error() {
        let err = Settings::from_lookup(lookup_from(&[("FOCUS_PENALTY_DISMISSAL", "two")])).unwrap_err();
        assert!(err.to_string().contains("FOCUS_PENALTY_DISMISSAL"));
    }

    #[test]
    fn test_observer_timeout_must_fit_in_tick() {
        assert!(Settings::from_lookup(lookup_from(&[("FOCUS_OBSERVER_TIMEOUT_MS", "1000")])).is_err());
        assert!(Settings::from_lookup(lookup_from(&[
            ("FOCUS_OBSERVER_TIMEOUT_MS", "1000"),
            ("FOCUS_TICK_SECONDS", "2"),
        ]))
        .is_ok());
    }

    #[test]
    fn test_zero_tick_rejected() {
        assert!(Settings::from_lookup(lookup_from(&[("FOCUS_TICK_SECONDS", "0")])).is_err());
    }
}
