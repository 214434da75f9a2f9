//! Caller facing side of the crate. [UsageStatsService] glues the platform collaborators to
//! [aggregate_usage] and turns raw totals into [AppUsage] entries.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};

use crate::{
    platform::{LabelError, LabelResolver, UsageAccess, UsageEventSource},
    usage::{
        aggregator::aggregate_usage,
        entities::{AppUsage, UsageWindow},
    },
    utils::clock::Clock,
};

pub struct UsageStatsService {
    access: Box<dyn UsageAccess>,
    events: Box<dyn UsageEventSource>,
    labels: Box<dyn LabelResolver>,
    clock: Box<dyn Clock>,
}

impl UsageStatsService {
    pub fn new(
        access: Box<dyn UsageAccess>,
        events: Box<dyn UsageEventSource>,
        labels: Box<dyn LabelResolver>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            access,
            events,
            labels,
            clock,
        }
    }

    pub async fn has_permission(&self) -> Result<bool> {
        self.access.has_permission().await
    }

    /// Returns whether the settings surface was launched, not whether access was granted.
    pub async fn request_permission(&self) -> Result<bool> {
        self.access.request_permission().await
    }

    /// Foreground usage of every application since the start of the local day, except
    /// `excluded`.
    pub async fn app_usage_today(&self, excluded: &str) -> Vec<AppUsage> {
        self.app_usage(self.today_window(), excluded).await
    }

    /// From the start of the local day up to now, by the service clock.
    pub fn today_window(&self) -> UsageWindow {
        UsageWindow::today(self.clock.time())
    }

    /// From `start` up to now, by the service clock.
    pub fn window_since(&self, start: DateTime<Utc>) -> UsageWindow {
        UsageWindow::new(start, self.clock.time())
    }

    /// Foreground usage of every application inside `window`, except `excluded`. An empty result
    /// means either nothing was used or usage can't be computed: missing access and failing event
    /// queries are logged and never returned as errors.
    #[instrument(skip(self))]
    pub async fn app_usage(&self, window: UsageWindow, excluded: &str) -> Vec<AppUsage> {
        match self.access.has_permission().await {
            Ok(true) => {}
            Ok(false) => {
                warn!("Usage access is not granted");
                return vec![];
            }
            Err(e) => {
                error!("Failed to check usage access {e:?}");
                return vec![];
            }
        }

        let events = match self.events.query_events(window).await {
            Ok(events) => events,
            Err(e) => {
                error!("Failed to query usage events {e:?}");
                return vec![];
            }
        };

        let totals = aggregate_usage(&events, &window, excluded);
        info!(
            "Aggregated {} events into {} applications",
            events.len(),
            totals.len()
        );

        let mut usages = Vec::with_capacity(totals.len());
        for (application_id, total_foreground) in totals {
            let display_name = self.display_name(&application_id).await;
            usages.push(AppUsage {
                application_id,
                display_name,
                total_foreground,
            });
        }
        usages
    }

    async fn display_name(&self, application_id: &str) -> String {
        match self.labels.resolve_label(application_id).await {
            Ok(name) => name,
            // Usually an application removed after it was used.
            Err(e @ LabelError::NotFound(_)) => {
                warn!("{e}");
                format!("Unknown App ({application_id})")
            }
            Err(e) => {
                error!("Failed to resolve label for {application_id}: {e}");
                format!("Error Getting Name ({application_id})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Result};
    use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

    use crate::{
        platform::{LabelError, MockLabelResolver, MockUsageAccess, MockUsageEventSource},
        usage::entities::{AppUsage, UsageEvent, UsageEventType, UsageWindow},
        utils::{clock::MockClock, logging::TEST_LOGGING},
    };

    use super::UsageStatsService;

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(), NaiveTime::MIN);

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.from_utc_datetime(&TEST_START_DATE) + Duration::seconds(seconds)
    }

    fn granted() -> MockUsageAccess {
        let mut access = MockUsageAccess::new();
        access.expect_has_permission().returning(|| Ok(true));
        access
    }

    fn clock_at(seconds: i64) -> MockClock {
        let mut clock = MockClock::new();
        clock.expect_time().returning(move || at(seconds));
        clock
    }

    fn labels() -> MockLabelResolver {
        let mut labels = MockLabelResolver::new();
        labels.expect_resolve_label().returning(|id| match id {
            "a" => Ok("Alpha".into()),
            "b" => Err(LabelError::NotFound(id.to_owned())),
            _ => Err(LabelError::Catalog {
                message: "broken".into(),
            }),
        });
        labels
    }

    fn sorted(mut usages: Vec<AppUsage>) -> Vec<AppUsage> {
        usages.sort_by(|a, b| a.application_id.cmp(&b.application_id));
        usages
    }

    #[tokio::test]
    async fn test_usage_with_labels_and_fallbacks() -> Result<()> {
        *TEST_LOGGING;
        let mut events = MockUsageEventSource::new();
        events.expect_query_events().times(1).returning(|_| {
            Ok(vec![
                UsageEvent::new("a", UsageEventType::Foreground, at(0)),
                UsageEvent::new("a", UsageEventType::Background, at(60)),
                UsageEvent::new("b", UsageEventType::Foreground, at(60)),
                UsageEvent::new("host", UsageEventType::Foreground, at(70)),
                UsageEvent::new("b", UsageEventType::Background, at(90)),
                UsageEvent::new("c", UsageEventType::Foreground, at(90)),
            ])
        });

        let service = UsageStatsService::new(
            Box::new(granted()),
            Box::new(events),
            Box::new(labels()),
            Box::new(clock_at(100)),
        );

        let usages = sorted(service.app_usage_today("host").await);

        assert_eq!(
            usages,
            vec![
                AppUsage {
                    application_id: "a".into(),
                    display_name: "Alpha".into(),
                    total_foreground: Duration::seconds(60),
                },
                AppUsage {
                    application_id: "b".into(),
                    display_name: "Unknown App (b)".into(),
                    total_foreground: Duration::seconds(30),
                },
                AppUsage {
                    application_id: "c".into(),
                    display_name: "Error Getting Name (c)".into(),
                    total_foreground: Duration::seconds(10),
                },
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_today_window_ends_now() -> Result<()> {
        let mut events = MockUsageEventSource::new();
        events
            .expect_query_events()
            .withf(|window| {
                window.end == at(100)
                    && window.start <= window.end
                    && window.duration() <= Duration::hours(25)
            })
            .times(1)
            .returning(|_| Ok(vec![]));

        let service = UsageStatsService::new(
            Box::new(granted()),
            Box::new(events),
            Box::new(MockLabelResolver::new()),
            Box::new(clock_at(100)),
        );

        assert!(service.app_usage_today("").await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_windows_follow_service_clock() -> Result<()> {
        let mut events = MockUsageEventSource::new();
        events
            .expect_query_events()
            .withf(|window| *window == UsageWindow::new(at(30), at(100)))
            .times(1)
            .returning(|_| {
                Ok(vec![UsageEvent::new("a", UsageEventType::Foreground, at(40))])
            });

        let service = UsageStatsService::new(
            Box::new(granted()),
            Box::new(events),
            Box::new(labels()),
            Box::new(clock_at(100)),
        );

        assert_eq!(service.today_window().end, at(100));
        let window = service.window_since(at(30));
        let usages = service.app_usage(window, "").await;
        assert_eq!(usages.len(), 1);
        assert_eq!(usages[0].total_foreground, Duration::seconds(60));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_permission_skips_query() -> Result<()> {
        let mut access = MockUsageAccess::new();
        access.expect_has_permission().returning(|| Ok(false));
        let mut events = MockUsageEventSource::new();
        events.expect_query_events().never();

        let service = UsageStatsService::new(
            Box::new(access),
            Box::new(events),
            Box::new(MockLabelResolver::new()),
            Box::new(clock_at(100)),
        );

        assert!(service.app_usage_today("").await.is_empty());
        assert!(!service.has_permission().await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_query_failure_gives_empty_result() -> Result<()> {
        let mut events = MockUsageEventSource::new();
        events
            .expect_query_events()
            .returning(|_| Err(anyhow!("event log unavailable")));

        let service = UsageStatsService::new(
            Box::new(granted()),
            Box::new(events),
            Box::new(MockLabelResolver::new()),
            Box::new(clock_at(100)),
        );

        assert!(service
            .app_usage(UsageWindow::new(at(0), at(100)), "")
            .await
            .is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_request_permission_forwards_launch_result() -> Result<()> {
        let mut access = MockUsageAccess::new();
        access
            .expect_request_permission()
            .times(1)
            .returning(|| Ok(true));

        let service = UsageStatsService::new(
            Box::new(access),
            Box::new(MockUsageEventSource::new()),
            Box::new(MockLabelResolver::new()),
            Box::new(clock_at(100)),
        );

        assert!(service.request_permission().await?);
        Ok(())
    }
}
