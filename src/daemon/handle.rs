use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::SessionError;
use crate::models::record::SessionRecord;
use crate::models::session::{FocusSession, SessionState};
use crate::models::timer::FocusTimer;
use crate::tracker::observer::{ForegroundObserver, WebsiteObserver};
use crate::tracker::sampler::{Reminder, TrackerConfig, ViolationTracker};

use super::session_loop::{session_loop, LiveSession, SharedSession};

/// Live view of a running session for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: String,
    pub state: SessionState,
    pub paused: bool,
    pub elapsed_seconds: u64,
    pub remaining_seconds: u64,
    pub focus_score: u8,
    pub violation_count: usize,
    pub current_violation: Option<String>,
}

/// Cloneable handle to a session whose tick loop runs on the tokio runtime.
///
/// Every action locks the same mutex as the tick loop, so a tick and a user
/// action never interleave.
#[derive(Clone)]
pub struct SessionHandle {
    shared: SharedSession,
    cancel_token: CancellationToken,
    finished: CancellationToken,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionHandle {
    /// Starts sampling for `session`. Reminders arrive on the returned receiver.
    pub fn spawn<F, W>(
        session: FocusSession,
        foreground: F,
        website: W,
        config: TrackerConfig,
    ) -> (Self, mpsc::UnboundedReceiver<Reminder>)
    where
        F: ForegroundObserver,
        W: WebsiteObserver,
    {
        let timer = FocusTimer::new(session.planned_duration());
        let shared = Arc::new(Mutex::new(LiveSession { session, timer }));
        let cancel_token = CancellationToken::new();
        let finished = CancellationToken::new();
        let (reminder_tx, reminder_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(session_loop(
            shared.clone(),
            foreground,
            website,
            ViolationTracker::new(config),
            reminder_tx,
            cancel_token.clone(),
            finished.clone(),
        ));

        let handle = Self {
            shared,
            cancel_token,
            finished,
            task: Arc::new(Mutex::new(Some(task))),
        };
        (handle, reminder_rx)
    }

    /// Returns false if the session was already paused.
    pub async fn pause(&self) -> Result<bool, SessionError> {
        let mut guard = self.shared.lock().await;
        ensure_running(&guard.session, "pause")?;
        let changed = guard.timer.pause();
        if changed {
            log::info!("Session {} paused at {}s", guard.session.id(), guard.timer.elapsed_seconds());
        }
        Ok(changed)
    }

    /// Returns false if the session was not paused.
    pub async fn resume(&self) -> Result<bool, SessionError> {
        let mut guard = self.shared.lock().await;
        ensure_running(&guard.session, "resume")?;
        let changed = guard.timer.resume();
        if changed {
            log::info!("Session {} resumed", guard.session.id());
        }
        Ok(changed)
    }

    /// Flips between paused and running; returns whether the session is now paused.
    pub async fn toggle_pause(&self) -> Result<bool, SessionError> {
        let mut guard = self.shared.lock().await;
        ensure_running(&guard.session, "pause")?;
        if guard.timer.is_paused() {
            guard.timer.resume();
        } else {
            guard.timer.pause();
        }
        Ok(guard.timer.is_paused())
    }

    /// The user acknowledged a reminder.
    pub async fn dismiss_reminder(&self) -> Result<(), SessionError> {
        let mut guard = self.shared.lock().await;
        guard.session.record_dismissal()
    }

    /// Abandons the session with the time elapsed so far and stops the loop.
    pub async fn stop(&self) -> Result<SessionRecord> {
        {
            let mut guard = self.shared.lock().await;
            let elapsed = guard.timer.elapsed_seconds() as i64;
            guard.session.abandon(elapsed)?;
        }
        self.cancel_token.cancel();
        self.wait().await
    }

    /// Waits for the session to end and returns its record.
    pub async fn wait(&self) -> Result<SessionRecord> {
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            task.await.context("session loop task failed to join")?;
        }
        self.finished.cancelled().await;

        let guard = self.shared.lock().await;
        let record = guard.session.to_record()?;
        Ok(record)
    }

    /// Resolves once the tick loop has exited.
    pub async fn finished(&self) {
        self.finished.cancelled().await;
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_cancelled()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let guard = self.shared.lock().await;
        SessionSnapshot {
            id: guard.session.id().to_string(),
            state: guard.session.state(),
            paused: guard.timer.is_paused(),
            elapsed_seconds: guard.timer.elapsed_seconds(),
            remaining_seconds: guard.timer.remaining_seconds(),
            focus_score: guard.session.focus_score(),
            violation_count: guard.session.violation_count(),
            current_violation: guard.session.current_violation().map(|v| v.target().to_string()),
        }
    }

    /// Runs `f` against the session under the loop's lock.
    pub async fn with_session<T>(&self, f: impl FnOnce(&FocusSession) -> T) -> T {
        let guard = self.shared.lock().await;
        f(&guard.session)
    }
}

fn ensure_running(session: &FocusSession, operation: &'static str) -> Result<(), SessionError> {
    if session.is_terminal() {
        return Err(SessionError::InvalidState {
            operation,
            state: session.state(),
        });
    }
    Ok(())
}
