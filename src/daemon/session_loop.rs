use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::models::session::FocusSession;
use crate::models::timer::FocusTimer;
use crate::tracker::observer::{ForegroundObserver, WebsiteObserver};
use crate::tracker::sampler::{Reminder, TickSample, TrackerConfig, ViolationTracker};

/// Session state shared between the tick loop and user actions.
pub(crate) struct LiveSession {
    pub(crate) session: FocusSession,
    pub(crate) timer: FocusTimer,
}

pub(crate) type SharedSession = Arc<Mutex<LiveSession>>;

pub(crate) async fn session_loop<F, W>(
    shared: SharedSession,
    foreground: F,
    website: W,
    mut tracker: ViolationTracker,
    reminders: mpsc::UnboundedSender<Reminder>,
    cancel_token: CancellationToken,
    finished: CancellationToken,
) where
    F: ForegroundObserver,
    W: WebsiteObserver,
{
    let config = tracker.config().clone();
    let period = config.tick_interval();
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = cancel_token.cancelled() => {
                log::info!("Session loop cancelled");
                break;
            }
        }

        {
            let guard = shared.lock().await;
            if guard.session.is_terminal() {
                break;
            }
            if guard.timer.is_paused() {
                continue;
            }
        }

        let sample = sample_observers(&foreground, &website, &config, tracker.next_tick_checks_website()).await;

        let mut guard = shared.lock().await;
        if cancel_token.is_cancelled() || guard.session.is_terminal() {
            log::debug!("Discarding sample taken after the session ended");
            break;
        }
        if guard.timer.is_paused() {
            continue;
        }

        let LiveSession { session, timer } = &mut *guard;
        match tracker.process_tick(session, &sample) {
            Ok(Some(reminder)) => {
                if reminders.send(reminder).is_err() {
                    log::debug!("Reminder receiver dropped; reminder not delivered");
                }
            }
            Ok(None) => {}
            Err(e) => log::warn!("Failed to apply tick {}: {}", tracker.ticks(), e),
        }

        if timer.tick(config.tick_seconds) {
            let actual = timer.elapsed_seconds() as i64;
            if let Err(e) = session.complete(actual) {
                log::error!("Failed to complete session {}: {}", session.id(), e);
            }
            break;
        }
    }

    finished.cancel();
}

/// Queries both observers within one observer-timeout budget.
///
/// Failures and timeouts count as "no signal" for the tick.
async fn sample_observers<F, W>(foreground: &F, website: &W, config: &TrackerConfig, check_website: bool) -> TickSample
where
    F: ForegroundObserver,
    W: WebsiteObserver,
{
    let deadline = Instant::now() + config.observer_timeout;

    let frontmost_app = match time::timeout_at(deadline, foreground.current_frontmost_application()).await {
        Ok(Ok(app)) => app,
        Ok(Err(e)) => {
            log::warn!("Foreground observer failed: {:#}", e);
            None
        }
        Err(_) => {
            log::warn!("Foreground observer timed out after {:?}", config.observer_timeout);
            None
        }
    };

    let browser_frontmost = frontmost_app
        .as_deref()
        .is_some_and(|app| app.trim().eq_ignore_ascii_case(config.browser_app.trim()));

    let website_domain = if check_website && browser_frontmost {
        match time::timeout_at(deadline, website.active_browser_domain()).await {
            Ok(Ok(domain)) => domain,
            Ok(Err(e)) => {
                log::warn!("Website observer failed: {:#}", e);
                None
            }
            Err(_) => {
                log::warn!("Website observer timed out after {:?}", config.observer_timeout);
                None
            }
        }
    } else {
        None
    };

    TickSample {
        frontmost_app,
        website_domain,
    }
}
