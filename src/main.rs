use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};

use studytimer::config::{self, Config};
use studytimer::logging;
use studytimer::session::stats::{format_clock, format_long};
use studytimer::session::{JsonSessionStore, SaveOutcome, SessionRecorder};
use studytimer::timer::{ExamResult, TimerController, TimerObserver, TimerSnapshot};

/// Prints the timer state on a single, continuously rewritten line
struct ConsoleObserver;

impl TimerObserver for ConsoleObserver {
    fn on_tick(&self, snapshot: &TimerSnapshot) {
        let progress = match snapshot.remaining_questions {
            Some(left) => format!("{} questions left", left),
            None => format!("cycle {}", snapshot.cycle_index),
        };
        print!(
            "\r[{:>7}] {}  {}   ",
            snapshot.phase.as_str(),
            format_clock(snapshot.remaining_secs),
            progress
        );
        let _ = std::io::stdout().flush();
    }

    fn on_exam_completed(&self, result: &ExamResult) {
        println!(
            "\nExam finished: {}/{} questions in {}, {} per question",
            result.completed_questions,
            result.total_questions,
            format_clock(result.total_time_secs),
            format_clock(result.average_time_secs)
        );
    }

    fn on_notice(&self, message: &str) {
        println!("\n{}", message);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Ensure config directory exists (creates logs dir too)
    config::ensure_directories()?;
    let config = Config::load()?;

    // Initialize file logging BEFORE any tracing calls
    let (log_file_info, _guard) = logging::init_file_logging(config::logs_dir())?;

    if let Err(e) =
        logging::cleanup_old_logs_with_retention(&config::logs_dir(), config.log_retention_days)
    {
        tracing::warn!("Failed to clean up old logs: {:#}", e);
    }

    tracing::info!("Logging to: {}", log_file_info.path.display());

    let mut args = std::env::args().skip(1);
    let method_id = args.next().unwrap_or_else(|| config.default_method.clone());
    let subject = args.next();

    let catalog = config.catalog()?;
    let method = catalog
        .get(&method_id)
        .with_context(|| {
            let known: Vec<&str> = catalog.methods().map(|m| m.id.as_str()).collect();
            format!("Unknown timer method (available: {})", known.join(", "))
        })?
        .clone();

    let store = Arc::new(JsonSessionStore::with_path(
        config::sessions_file_path(),
        config.session_retention_days,
    ));
    let recorder = Arc::new(
        SessionRecorder::new(store)
            .with_min_session_secs(config.min_session_secs)
            .with_default_subject(config.default_subject.clone()),
    );

    println!("{} - press Ctrl-C to stop and save", method.name);
    let controller = TimerController::builder(method, recorder)
        .observer(Arc::new(ConsoleObserver))
        .tick_interval(config.tick_interval())
        .build();

    if let Some(subject) = subject {
        controller.set_subject(subject).await;
    }
    controller.start().await;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    match controller.stop().await {
        SaveOutcome::Saved(record) => {
            println!("Saved {} of {}", format_long(record.duration_secs), record.subject);
        }
        SaveOutcome::Discarded(reason) => {
            tracing::debug!(?reason, "Session not saved");
        }
    }

    let total = controller.daily_total().await?;
    println!("Studied today: {}", format_long(total));

    Ok(())
}
