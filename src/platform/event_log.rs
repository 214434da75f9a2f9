use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
};
use tracing::{debug, instrument, warn};

use crate::{
    usage::entities::{UsageEvent, UsageWindow},
    utils::time::date_to_record_name,
};

use super::UsageEventSource;

/// Event log kept on disk.
///  - There is a directory with all the events.
///  - Events are stored in files for a UTC day, one json event per line.
///  - Lines within a file are in the order they were appended.
pub struct EventLog {
    event_dir: PathBuf,
}

impl EventLog {
    pub fn new(event_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&event_dir)?;

        Ok(Self { event_dir })
    }

    fn day_path(&self, date: NaiveDate) -> PathBuf {
        self.event_dir.join(date_to_record_name(date))
    }

    /// Retrieves events from the file for a certain day. Missing files are treated as days
    /// without events.
    pub async fn events_for(&self, date: NaiveDate) -> Result<Vec<UsageEvent>> {
        async fn extract(path: &Path) -> std::result::Result<Vec<UsageEvent>, std::io::Error> {
            debug!("Extracting {path:?}");
            let file = File::open(path).await?;
            file.lock_shared()?;
            let mut reader = BufReader::new(file);
            let mut line = Vec::new();
            let mut events = vec![];
            let read = loop {
                line.clear();
                match reader.read_until(b'\n', &mut line).await {
                    Ok(0) => break Ok(()),
                    Ok(_) => {}
                    Err(e) => break Err(e),
                }
                if line.trim_ascii().is_empty() {
                    continue;
                }
                match serde_json::from_slice::<UsageEvent>(&line) {
                    Ok(v) => events.push(v),
                    Err(e) => {
                        // A write cut short by a crash leaves half a line behind.
                        warn!(
                            "During parsing in path {:?} found illegal json string {}:  {e}",
                            path,
                            String::from_utf8_lossy(&line)
                        )
                    }
                }
            };

            reader.into_inner().unlock_async().await?;
            read?;

            Ok(events)
        }

        match extract(&self.day_path(date)).await {
            Ok(events) => Ok(events),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(vec![]),
            Err(e) => Err(e)?,
        }
    }

    /// Appends events to the files of their UTC days.
    pub async fn append(&self, events: Vec<UsageEvent>) -> Result<()> {
        let mut by_day = BTreeMap::<NaiveDate, Vec<u8>>::new();
        for event in events {
            let buffer = by_day.entry(event.timestamp.date_naive()).or_default();
            serde_json::to_writer(&mut *buffer, &event)?;
            buffer.push(b'\n');
        }

        for (date, buffer) in by_day {
            let mut file = File::options()
                .append(true)
                .create(true)
                .open(self.day_path(date))
                .await?;

            file.lock_exclusive()?;
            let written = async {
                file.write_all(&buffer).await?;
                file.flush().await
            }
            .await;
            file.unlock_async().await?;
            written?;
        }
        Ok(())
    }
}

#[async_trait]
impl UsageEventSource for EventLog {
    #[instrument(skip(self))]
    async fn query_events(&self, window: UsageWindow) -> Result<Vec<UsageEvent>> {
        let last_day = window.end.date_naive();
        let mut events = vec![];
        for day in window
            .start
            .date_naive()
            .iter_days()
            .take_while(|day| *day <= last_day)
        {
            events.extend(
                self.events_for(day)
                    .await?
                    .into_iter()
                    .filter(|event| window.contains(event.timestamp)),
            );
        }
        // Separate writers may interleave slightly, the aggregation needs chronological order.
        events.sort_by_key(|event| event.timestamp);
        debug!("Found {} events", events.len());
        Ok(events)
    }
}
