use chrono::DateTime;
use chrono::Duration;
use chrono::Local;
use chrono::TimeZone;
use chrono::Utc;
use clap::ValueEnum;
use now::DateTimeNow;
use serde::Deserialize;
use serde::Serialize;

use std::sync::Arc;

/// Kind of transition an application went through.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize, Clone, Copy, ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum UsageEventType {
    Foreground,
    Background,
    /// Anything the aggregation doesn't care about (screen on/off, configuration changes etc.)
    #[serde(other)]
    Other,
}

/// A single entry of the usage event log. Events are expected to arrive in chronological order.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UsageEvent {
    #[serde(rename = "packageName")]
    pub application_id: Arc<str>,
    pub event_type: UsageEventType,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl UsageEvent {
    pub fn new(
        application_id: impl Into<Arc<str>>,
        event_type: UsageEventType,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            application_id: application_id.into(),
            event_type,
            timestamp,
        }
    }
}

/// Half-open range `[start, end)` usage is computed over.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct UsageWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl UsageWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// From the beginning of the local day containing `now` up to `now`.
    pub fn today(now: DateTime<Utc>) -> Self {
        Self::since_day_start(now, &Local)
    }

    pub fn since_day_start<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> Self {
        let start = now.with_timezone(tz).beginning_of_day().with_timezone(&Utc);
        Self { start, end: now }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, moment: DateTime<Utc>) -> bool {
        self.start <= moment && moment < self.end
    }
}

/// Usage of one application over a window, ready to be shown to a user.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct AppUsage {
    #[serde(rename = "packageName")]
    pub application_id: Arc<str>,
    #[serde(rename = "appName")]
    pub display_name: String,
    #[serde(rename = "totalTimeInForeground", with = "duration_millis")]
    pub total_foreground: Duration,
}

mod duration_millis {
    use chrono::Duration;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_milliseconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = i64::deserialize(deserializer)?;
        Ok(Duration::milliseconds(ms))
    }
}
