use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use tracing::trace;

use super::entities::{UsageEvent, UsageEventType, UsageWindow};

pub type UsageTotals = HashMap<Arc<str>, Duration>;

/// Sums foreground time for every application in `events`, skipping `excluded` entirely.
///
/// Events must be in chronological order. A second foreground event for an application that is
/// already in the foreground replaces the open timestamp. Applications still in the foreground
/// once the events run out are counted up to `window.end`. Non-positive durations (clock skew,
/// out of order delivery) are dropped, as are background events without a matching foreground
/// one.
pub fn aggregate_usage<'a>(
    events: impl IntoIterator<Item = &'a UsageEvent>,
    window: &UsageWindow,
    excluded: &str,
) -> UsageTotals {
    let mut open = HashMap::<Arc<str>, DateTime<Utc>>::new();
    let mut totals = UsageTotals::new();

    for event in events {
        if &*event.application_id == excluded {
            continue;
        }

        match event.event_type {
            UsageEventType::Foreground => {
                open.insert(event.application_id.clone(), event.timestamp);
            }
            UsageEventType::Background => {
                if let Some(since) = open.remove(&event.application_id) {
                    add_positive(&mut totals, &event.application_id, event.timestamp - since);
                } else {
                    trace!("Unmatched background event for {}", event.application_id);
                }
            }
            UsageEventType::Other => {}
        }
    }

    for (application_id, since) in open {
        add_positive(&mut totals, &application_id, window.end - since);
    }

    totals
}

fn add_positive(totals: &mut UsageTotals, application_id: &Arc<str>, duration: Duration) {
    if duration <= Duration::zero() {
        return;
    }
    *totals
        .entry(application_id.clone())
        .or_insert_with(Duration::zero) += duration;
}
