use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use clap::Parser;

use crate::{stats::UsageStatsService, usage::entities::AppUsage};

#[derive(Debug, Parser)]
pub struct UsageCommand {
    #[arg(
        short,
        long,
        default_value = "",
        help = "Application identifier left out of the statistics, usually the one asking"
    )]
    exclude: String,
    #[arg(
        long,
        value_parser = parse_since,
        help = "Start of the range as RFC 3339, for example 2025-03-15T08:00:00+01:00. Defaults to the start of today"
    )]
    since: Option<DateTime<Utc>>,
    #[arg(long, help = "Print json instead of a table")]
    json: bool,
}

fn parse_since(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|v| v.with_timezone(&Utc))
        .map_err(|e| format!("Can't parse {value}: {e}"))
}

/// Command to process `usage` command. Prints foreground time per application, longest first.
pub async fn process_usage_command(
    service: &UsageStatsService,
    UsageCommand {
        exclude,
        since,
        json,
    }: UsageCommand,
) -> Result<()> {
    if !service.has_permission().await? {
        eprintln!("Usage access is not granted. Run `screentime permission request` first.");
        return Ok(());
    }

    let window = match since {
        Some(start) => service.window_since(start),
        None => service.today_window(),
    };
    let mut usages = service.app_usage(window, &exclude).await;
    sort_by_duration(&mut usages);

    if json {
        println!("{}", serde_json::to_string_pretty(&usages)?);
        return Ok(());
    }

    for entry in usages {
        println!(
            "{}%\t{}\t{}\t{}",
            share_percentage(entry.total_foreground, window.duration()),
            format_duration(entry.total_foreground),
            entry.display_name,
            entry.application_id
        );
    }
    Ok(())
}

fn sort_by_duration(usages: &mut [AppUsage]) {
    usages.sort_by(|a, b| {
        b.total_foreground
            .cmp(&a.total_foreground)
            .then_with(|| a.application_id.cmp(&b.application_id))
    });
}

fn share_percentage(value: Duration, whole: Duration) -> i64 {
    if whole <= Duration::zero() {
        return 0;
    }
    value.num_milliseconds() * 100 / whole.num_milliseconds()
}

fn format_duration(v: Duration) -> String {
    if v.num_hours() > 0 {
        format!(
            "{}h{}m{}s",
            v.num_hours(),
            v.num_minutes() % 60,
            v.num_seconds() % 60
        )
    } else if v.num_minutes() > 0 {
        format!("{}m{}s", v.num_minutes() % 60, v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds() % 60)
    }
}
