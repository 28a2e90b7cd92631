//! `notei` command line entry point.
//!
//! # Responsibility
//! - Expose import/export, quick-add, day layout and the reminder scheduler
//!   over one SQLite document database.
//! - Keep all domain behavior in `notei_core`; this file only wires and prints.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate};
use clap::{Parser, Subcommand};
use log::info;
use notei_core::time::parse_utc_offset;
use notei_core::{
    default_log_level, init_logging, init_stderr_logging, start_scheduler, CalendarService, Clock,
    DeliveryError, DocumentEventRepository, DocumentReminderRepository, Notifier, Permission,
    ReminderScheduler, ReminderService, SchedulerConfig, SharedReminderRepository,
    SqliteDocumentStore, SystemClock,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "notei: calendar and reminder scheduling engine",
    long_about = None
)]
struct Cli {
    /// SQLite database file.
    #[arg(long, global = true, default_value = "notei.db")]
    db: PathBuf,

    /// trace|debug|info|warn|error.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; logs go to stderr otherwise.
    #[arg(long, global = true)]
    log_dir: Option<String>,

    /// Fixed offset for local dates, e.g. `+02:00` or `Z`. Defaults to the host offset.
    #[arg(long, global = true, value_parser = parse_offset_arg, allow_hyphen_values = true)]
    utc_offset: Option<FixedOffset>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import events from an .ics file.
    Import { file: PathBuf },

    /// Export all events as .ics (stdout unless --out).
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Create a reminder from one line of text, e.g. "Call Sam in 30m".
    QuickAdd {
        text: String,
        #[arg(long, default_value = "inbox")]
        list: String,
    },

    /// Print the column layout of one local day (YYYY-MM-DD).
    Day { date: NaiveDate },

    /// Complete a reminder; repeating reminders roll over.
    Complete { id: String },

    /// Run the notification scheduler until Ctrl-C.
    Watch,
}

fn parse_offset_arg(value: &str) -> Result<FixedOffset, String> {
    parse_utc_offset(value).ok_or_else(|| format!("invalid UTC offset `{value}`"))
}

/// Prints notifications to stdout.
struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    async fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    async fn deliver(&self, title: &str, body: Option<&str>) -> Result<(), DeliveryError> {
        match body {
            Some(body) if !body.is_empty() => println!("[reminder] {title}: {body}"),
            _ => println!("[reminder] {title}"),
        }
        Ok(())
    }
}

fn init_cli_logging(cli: &Cli) -> anyhow::Result<()> {
    match &cli.log_dir {
        Some(dir) => {
            let level = cli.log_level.as_deref().unwrap_or(default_log_level());
            init_logging(level, dir).map_err(|err| anyhow!(err))
        }
        None => {
            let level = cli.log_level.as_deref().unwrap_or("warn");
            init_stderr_logging(level).map_err(|err| anyhow!(err))
        }
    }
}

fn open_store(cli: &Cli) -> anyhow::Result<SqliteDocumentStore> {
    SqliteDocumentStore::open(&cli.db)
        .with_context(|| format!("failed to open database `{}`", cli.db.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_cli_logging(&cli)?;

    let clock: Arc<dyn Clock> = Arc::new(match cli.utc_offset {
        Some(offset) => SystemClock::with_offset(offset),
        None => SystemClock::new(),
    });

    match &cli.command {
        Commands::Import { file } => {
            let text = fs::read_to_string(file)
                .with_context(|| format!("failed to read `{}`", file.display()))?;
            let service = CalendarService::new(
                DocumentEventRepository::new(open_store(&cli)?, Arc::clone(&clock)),
                Arc::clone(&clock),
            );
            let summary = service.import_ics(&text)?;
            println!("imported {} event(s)", summary.imported.len());
            for issue in &summary.issues {
                println!("warning: {issue:?}");
            }
        }
        Commands::Export { out } => {
            let service = CalendarService::new(
                DocumentEventRepository::new(open_store(&cli)?, Arc::clone(&clock)),
                Arc::clone(&clock),
            );
            let text = service.export_ics()?;
            match out {
                Some(path) => fs::write(path, text)
                    .with_context(|| format!("failed to write `{}`", path.display()))?,
                None => print!("{text}"),
            }
        }
        Commands::QuickAdd { text, list } => {
            let service = ReminderService::new(
                DocumentReminderRepository::new(open_store(&cli)?, Arc::clone(&clock)),
                Arc::clone(&clock),
            );
            let reminder = service.quick_add(list, text)?;
            let ctx = clock.context();
            match reminder.remind_at {
                Some(at) => println!(
                    "{} \"{}\" at {}",
                    reminder.id,
                    reminder.title,
                    ctx.to_local(at).format("%Y-%m-%d %H:%M")
                ),
                None => println!("{} \"{}\"", reminder.id, reminder.title),
            }
        }
        Commands::Day { date } => {
            let service = CalendarService::new(
                DocumentEventRepository::new(open_store(&cli)?, Arc::clone(&clock)),
                Arc::clone(&clock),
            );
            let ctx = clock.context();
            for placed in service.layout_for_day(*date)? {
                println!(
                    "col {}/{}  {}-{}  {}",
                    placed.column_index + 1,
                    placed.total_columns,
                    ctx.to_local(placed.event.start_at).format("%H:%M"),
                    ctx.to_local(placed.event.end_at).format("%H:%M"),
                    placed.event.title
                );
            }
        }
        Commands::Complete { id } => {
            let service = ReminderService::new(
                DocumentReminderRepository::new(open_store(&cli)?, Arc::clone(&clock)),
                Arc::clone(&clock),
            );
            let outcome = service.complete(id)?;
            println!("completed {}", outcome.completed.id);
            if let Some(next) = outcome.next {
                println!("next occurrence {}", next.id);
            }
        }
        Commands::Watch => {
            let source = SharedReminderRepository::new(DocumentReminderRepository::new(
                open_store(&cli)?,
                Arc::clone(&clock),
            ));
            let scheduler = Arc::new(ReminderScheduler::new(
                Arc::new(source),
                Arc::new(StdoutNotifier),
                Arc::clone(&clock),
                SchedulerConfig::default(),
            ));
            let handle = start_scheduler(scheduler);
            info!("event=watch module=cli status=start db={}", cli.db.display());
            println!("watching reminders, press Ctrl-C to stop");

            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl-C")?;
            handle.stop();
            info!("event=watch module=cli status=stopped");
        }
    }

    Ok(())
}
