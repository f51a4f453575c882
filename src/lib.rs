//! Focus sessions that watch for blocked apps and websites, turn what they see
//! into violation episodes, and grade the session with a 0-100 focus score.

pub mod config;
pub mod daemon;
pub mod error;
pub mod models;
pub mod tracker;


pub use config::Settings;
pub use daemon::{SessionHandle, SessionSnapshot};
pub use error::SessionError;
pub use models::{FocusSession, FocusTimer, ScoringPolicy, SessionHistory, SessionRecord, SessionState, Violation};
pub use tracker::{AppMonitor, ChromeWebsiteMonitor, ForegroundObserver, Reminder, TrackerConfig, WebsiteObserver};
