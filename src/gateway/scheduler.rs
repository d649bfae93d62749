//! Scheduled outbound delivery — fixed daily messages.

use super::Gateway;
use chrono::NaiveTime;
use std::sync::Arc;
use tracing::{error, info, warn};
use zapbot_core::{
    config::ScheduleEntry,
    message::{MessageMetadata, OutgoingMessage},
    traits::Channel,
};

/// Parse a "HH:MM" schedule time.
fn parse_schedule_time(time: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(time, "%H:%M").ok()
}

/// Whether an entry scheduled for `at` is due at local time `now`.
///
/// Fires on the first poll at or past the scheduled time; the caller's
/// once-per-day guard prevents repeats.
fn is_due(at: NaiveTime, now: NaiveTime) -> bool {
    now >= at
}

impl Gateway {
    /// Background task: deliver each schedule entry once per day at its
    /// configured time. Best-effort — a failed send is logged and retried
    /// on the next day's trigger, not before.
    pub(super) async fn scheduler_loop(
        channel: Arc<dyn Channel>,
        schedule: Vec<ScheduleEntry>,
        poll_secs: u64,
    ) {
        // Validate once up front; bad entries are skipped for the lifetime
        // of the process.
        let entries: Vec<(NaiveTime, ScheduleEntry)> = schedule
            .into_iter()
            .filter_map(|entry| match parse_schedule_time(&entry.time) {
                Some(at) => Some((at, entry)),
                None => {
                    warn!(
                        "scheduler: invalid time '{}' for target {}, skipping entry",
                        entry.time, entry.target
                    );
                    None
                }
            })
            .collect();

        if entries.is_empty() {
            warn!("scheduler: no valid entries, loop not started");
            return;
        }

        info!("scheduler running with {} entries", entries.len());
        let mut last_sent: Vec<Option<chrono::NaiveDate>> = vec![None; entries.len()];

        loop {
            tokio::time::sleep(std::time::Duration::from_secs(poll_secs)).await;

            let now = chrono::Local::now();
            let today = now.date_naive();

            for (i, (at, entry)) in entries.iter().enumerate() {
                if !is_due(*at, now.time()) || last_sent[i] == Some(today) {
                    continue;
                }

                let msg = OutgoingMessage {
                    text: entry.text.clone(),
                    metadata: MessageMetadata::default(),
                    reply_target: Some(entry.target.clone()),
                };

                match channel.send(msg).await {
                    Ok(()) => {
                        info!(
                            "⌛ delivered scheduled message to {} ({})",
                            entry.target, entry.time
                        );
                    }
                    Err(e) => {
                        error!("scheduler: failed to deliver to {}: {e}", entry.target);
                    }
                }

                // Mark even on failure — one attempt per entry per day.
                last_sent[i] = Some(today);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_schedule_time() {
        assert_eq!(
            parse_schedule_time("08:00"),
            NaiveTime::from_hms_opt(8, 0, 0)
        );
        assert_eq!(
            parse_schedule_time("23:59"),
            NaiveTime::from_hms_opt(23, 59, 0)
        );
        assert!(parse_schedule_time("8am").is_none());
        assert!(parse_schedule_time("25:00").is_none());
    }

    #[test]
    fn test_is_due_boundaries() {
        let at = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        assert!(!is_due(at, NaiveTime::from_hms_opt(7, 59, 59).unwrap()));
        assert!(is_due(at, at));
        assert!(is_due(at, NaiveTime::from_hms_opt(8, 1, 0).unwrap()));
        assert!(is_due(at, NaiveTime::from_hms_opt(22, 0, 0).unwrap()));
    }
}
