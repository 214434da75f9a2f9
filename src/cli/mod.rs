pub mod permission;
pub mod usage;

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use permission::{process_permission_command, PermissionCommand};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter};
use usage::{process_usage_command, UsageCommand};

use crate::{
    channel::server::serve_channel,
    platform::{
        access::GrantFileAccess,
        event_log::EventLog,
        labels::{LabelCatalog, LABELS_FILE},
    },
    stats::UsageStatsService,
    usage::entities::{UsageEvent, UsageEventType},
    utils::{
        clock::{Clock, DefaultClock},
        dir::application_path,
        logging::{enable_logging, CHANNEL_PREFIX, CLI_PREFIX},
        shutdown::detect_shutdown,
    },
};

pub const EVENTS_DIR: &str = "events";

#[derive(Parser, Debug)]
#[command(name = "screentime", version, long_about = None)]
#[command(about = "Per-application foreground time for the current day", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, global = true, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        env = "SCREENTIME_DIR",
        help = "Application directory. By default $XDG_STATE_HOME/screentime or $HOME/.local/state/screentime"
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        env = "SCREENTIME_SETTINGS_COMMAND",
        help = "Command opening the place where usage access is granted"
    )]
    settings_command: Option<String>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Display foreground time per application")]
    Usage {
        #[command(flatten)]
        command: UsageCommand,
    },
    #[command(about = "Inspect or change usage access")]
    Permission {
        #[command(subcommand)]
        command: PermissionCommand,
    },
    #[command(about = "Append an event to the usage event log")]
    Record {
        #[arg(help = "Application identifier")]
        application_id: String,
        #[arg(value_enum)]
        event_type: UsageEventType,
        #[arg(long, help = "Unix timestamp in milliseconds. Defaults to now")]
        at: Option<i64>,
    },
    #[command(about = "Set a display name for an application")]
    Label {
        application_id: String,
        name: String,
    },
    #[command(
        about = "Answer json method calls from stdin on stdout, one per line. Used to embed screentime into another application"
    )]
    Channel {},
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    let app_dir = application_path(args.dir)?;

    match args.commands {
        Commands::Usage { command } => {
            enable_logging(CLI_PREFIX, &app_dir, logging_level, args.log)?;
            let service = create_service(&app_dir, args.settings_command)?;
            process_usage_command(&service, command).await
        }
        Commands::Permission { command } => {
            enable_logging(CLI_PREFIX, &app_dir, logging_level, args.log)?;
            let access = GrantFileAccess::new(&app_dir, args.settings_command);
            process_permission_command(&access, command).await
        }
        Commands::Record {
            application_id,
            event_type,
            at,
        } => {
            enable_logging(CLI_PREFIX, &app_dir, logging_level, args.log)?;
            let timestamp = match at {
                Some(ms) => timestamp_from_millis(ms)?,
                None => DefaultClock.time(),
            };
            let event = UsageEvent::new(application_id, event_type, timestamp);
            info!("Recording {event:?}");
            EventLog::new(app_dir.join(EVENTS_DIR))?
                .append(vec![event])
                .await
        }
        Commands::Label {
            application_id,
            name,
        } => {
            enable_logging(CLI_PREFIX, &app_dir, logging_level, args.log)?;
            LabelCatalog::new(app_dir.join(LABELS_FILE))
                .set_label(&application_id, &name)
                .await
        }
        Commands::Channel {} => {
            enable_logging(CHANNEL_PREFIX, &app_dir, logging_level, args.log)?;
            let service = create_service(&app_dir, args.settings_command)?;
            let shutdown = CancellationToken::new();
            let (_, result) = tokio::join!(detect_shutdown(shutdown.clone()), async {
                let result = serve_channel(
                    &service,
                    BufReader::new(tokio::io::stdin()),
                    tokio::io::stdout(),
                    shutdown.clone(),
                )
                .await;
                shutdown.cancel();
                result
            });
            result
        }
    }
}

/// Wires the file backed platform into a [UsageStatsService].
pub fn create_service(
    app_dir: &Path,
    settings_command: Option<String>,
) -> Result<UsageStatsService> {
    Ok(UsageStatsService::new(
        Box::new(GrantFileAccess::new(app_dir, settings_command)),
        Box::new(EventLog::new(app_dir.join(EVENTS_DIR))?),
        Box::new(LabelCatalog::new(app_dir.join(LABELS_FILE))),
        Box::new(DefaultClock),
    ))
}

fn timestamp_from_millis(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| anyhow::anyhow!("{ms} is not a valid timestamp"))
}
