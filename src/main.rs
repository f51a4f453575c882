use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use dotenvy::dotenv;
use std::env;
use std::fs::OpenOptions;
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use focus_guard::models::timer::format_time;
use focus_guard::{
    AppMonitor, ChromeWebsiteMonitor, FocusSession, ForegroundObserver, Reminder, SessionHandle, SessionRecord,
    Settings,
};

/// A writer that flushes after every write so the log file is always current
struct FlushingWriter {
    inner: Arc<Mutex<std::fs::File>>,
}

impl FlushingWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            inner: Arc::new(Mutex::new(file)),
        }
    }
}

impl Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut file = self
            .inner
            .lock()
            .map_err(|_| std::io::Error::other("log file lock poisoned"))?;
        let result = file.write(buf);
        file.flush()?;
        result
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut file = self
            .inner
            .lock()
            .map_err(|_| std::io::Error::other("log file lock poisoned"))?;
        file.flush()
    }
}

fn init_logging() -> Result<()> {
    let debug_enabled = env::var("DEBUG_LOGS_ENABLED")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    if debug_enabled {
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open("focus_guard.log")
            .context("failed to open focus_guard.log")?;

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("focus_guard=debug"))
            .target(env_logger::Target::Pipe(Box::new(FlushingWriter::new(log_file))))
            .init();

        log::info!("=== DEBUG LOGGING ENABLED ===");
        log::info!("Writing logs to focus_guard.log");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }
    Ok(())
}

fn planned_seconds(minutes: u64) -> Result<i64> {
    minutes
        .checked_mul(60)
        .and_then(|seconds| i64::try_from(seconds).ok())
        .with_context(|| format!("session length of {} minutes is too long", minutes))
}

/// Forwards lines from `reader` on a plain thread.
///
/// A blocked read must not hold up runtime shutdown, so this stays off tokio's
/// blocking pool. The receiver closes at end of input or on a read error.
fn spawn_line_reader<R>(reader: R) -> mpsc::UnboundedReceiver<String>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in reader.lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::warn!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

fn collect_values(matches: &clap::ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("Focus Guard")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Run a timed focus session and score how well you stayed away from blocked apps and sites")
        .arg(
            Arg::new("minutes")
                .long("minutes")
                .short('m')
                .value_parser(clap::value_parser!(u64).range(1..))
                .help("Planned session length in minutes (defaults to FOCUS_DEFAULT_MINUTES)"),
        )
        .arg(
            Arg::new("block-app")
                .long("block-app")
                .action(ArgAction::Append)
                .help("Application to block; repeat for several (defaults to FOCUS_BLOCKED_APPS)"),
        )
        .arg(
            Arg::new("block-domain")
                .long("block-domain")
                .action(ArgAction::Append)
                .help("Website domain to block; repeat for several (defaults to FOCUS_BLOCKED_DOMAINS)"),
        )
        .arg(
            Arg::new("print-frontmost")
                .long("print-frontmost")
                .help("Print the detected frontmost application and exit")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    dotenv().ok();
    init_logging()?;

    if matches.get_flag("print-frontmost") {
        return print_frontmost().await;
    }

    let settings = Settings::new().context("failed to load settings")?;

    let mut blocked_apps = collect_values(&matches, "block-app");
    if blocked_apps.is_empty() {
        blocked_apps = settings.blocked_apps.clone();
    }
    let mut blocked_domains = collect_values(&matches, "block-domain");
    if blocked_domains.is_empty() {
        blocked_domains = settings.blocked_domains.clone();
    }
    let minutes = matches
        .get_one::<u64>("minutes")
        .copied()
        .unwrap_or(settings.default_minutes);

    let session = FocusSession::with_policy(
        planned_seconds(minutes)?,
        blocked_apps,
        blocked_domains,
        settings.scoring,
    )?;

    println!("Focus session started: {} ({})", session.id(), format_time(session.planned_duration()));
    if session.blocked_apps().is_empty() && session.blocked_domains().is_empty() {
        println!("Nothing is blocked; the session will only time you.");
    } else {
        println!("Blocking apps: {:?}", session.blocked_apps());
        println!("Blocking websites: {:?}", session.blocked_domains());
    }
    println!("Commands: <Enter> return to focus, 'p' pause/resume, 's' status, 'q' give up");

    let website = ChromeWebsiteMonitor::new(settings.tracker.browser_app.clone());
    let (handle, reminders) = SessionHandle::spawn(session, AppMonitor::new(), website, settings.tracker.clone());

    let record = drive_session(&handle, reminders).await?;
    print_summary(&record, &settings);
    println!("{}", serde_json::to_string_pretty(&record)?);

    Ok(())
}

async fn drive_session(
    handle: &SessionHandle,
    mut reminders: mpsc::UnboundedReceiver<Reminder>,
) -> Result<SessionRecord> {
    // First SIGINT/SIGTERM gives up on the session, a second one exits immediately
    let shutdown_flag = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGTERM, signal_hook::consts::SIGINT] {
        signal_hook::flag::register_conditional_shutdown(signal, 1, Arc::clone(&shutdown_flag))?;
        signal_hook::flag::register(signal, Arc::clone(&shutdown_flag))?;
    }

    let mut commands = spawn_line_reader(std::io::BufReader::new(std::io::stdin()));
    let mut stdin_open = true;
    let mut shutdown_poll = tokio::time::interval(Duration::from_millis(200));

    loop {
        tokio::select! {
            _ = handle.finished() => break,
            Some(reminder) = reminders.recv() => {
                println!("⚠️  {} is blocked right now. Press Enter to return to focus.", reminder.target);
            }
            command = commands.recv(), if stdin_open => match command {
                Some(command) => {
                    if handle_command(handle, command.trim()).await {
                        break;
                    }
                }
                None => stdin_open = false,
            },
            _ = shutdown_poll.tick() => {
                if shutdown_flag.load(Ordering::Relaxed) {
                    log::info!("Received shutdown signal, abandoning session");
                    give_up(handle).await;
                    break;
                }
            }
        }
    }

    handle.wait().await
}

/// Abandons the session; a session that already ended is left as it is.
async fn give_up(handle: &SessionHandle) {
    if let Err(e) = handle.stop().await {
        log::warn!("Session already ended, keeping its result: {:#}", e);
    }
}

/// Returns true when the session is over and no more commands should be read.
async fn handle_command(handle: &SessionHandle, command: &str) -> bool {
    match command {
        "" => match handle.dismiss_reminder().await {
            Ok(()) => println!("Back to focus."),
            Err(e) => log::warn!("Ignoring dismissal: {}", e),
        },
        "p" => match handle.toggle_pause().await {
            Ok(true) => println!("Paused."),
            Ok(false) => println!("Resumed."),
            Err(e) => log::warn!("Ignoring pause toggle: {}", e),
        },
        "s" => {
            let snapshot = handle.snapshot().await;
            println!(
                "{} left, score {}, {} violations{}",
                format_time(snapshot.remaining_seconds),
                snapshot.focus_score,
                snapshot.violation_count,
                snapshot
                    .current_violation
                    .map(|target| format!(", currently on {}", target))
                    .unwrap_or_default()
            );
        }
        "q" => {
            give_up(handle).await;
            return true;
        }
        other => println!("Unknown command '{}'", other),
    }
    handle.is_finished()
}

fn print_summary(record: &SessionRecord, settings: &Settings) {
    let outcome = if record.completed { "Completed" } else { "Stopped early" };
    println!();
    println!("{} after {}", outcome, format_time(record.actual_duration));
    println!("Focus score: {}", record.focus_score);
    println!("Violations: {}", record.violations.len());
    println!("Time distracted: {}", format_time(record.total_distraction_seconds()));
    if record.qualifies_for_streak(&settings.scoring) {
        println!("This session counts toward your streak.");
    }
}

async fn print_frontmost() -> Result<()> {
    let monitor = AppMonitor::new();
    match monitor.current_frontmost_application().await {
        Ok(Some(app)) => println!("✅ Frontmost application: {}", app),
        Ok(None) => println!("❌ No frontmost application detected"),
        Err(e) => println!("❌ Failed: {}", e),
    }
    Ok(())
}
