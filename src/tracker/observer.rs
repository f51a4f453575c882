use anyhow::Result;
use std::future::Future;

/// Reports which application is frontmost.
///
/// Best effort: `Ok(None)` when nothing can be detected. Callers bound each call
/// with a timeout, so implementations may block on external commands.
pub trait ForegroundObserver: Send + Sync + 'static {
    fn current_frontmost_application(&self) -> impl Future<Output = Result<Option<String>>> + Send;
}

/// Reports the domain of the active browser tab.
///
/// Only queried while the configured browser is frontmost.
pub trait WebsiteObserver: Send + Sync + 'static {
    fn active_browser_domain(&self) -> impl Future<Output = Result<Option<String>>> + Send;
}
