//! Daily notification scheduler
//!
//! A background task wakes every minute and fires the daily run when the
//! clock is inside the configured window (time of day plus or minus the
//! tolerance). Outside the window the tick is skipped silently. The run
//! itself is idempotent within the dedup cool-down, so overlapping runs are
//! harmless; a per-day latch just avoids the redundant work.

use chrono::{NaiveDate, NaiveTime, Utc};
use std::time::Duration;

use crate::services::notification::NotificationService;
use crate::services::stock::StockService;
use crate::services::trigger::NotificationTriggerService;
use crate::AppState;

const SEND_BATCH_SIZE: i64 = 100;

/// Spawn the scheduler as a background task
pub fn spawn(state: AppState) {
    tokio::spawn(run(state));
}

async fn run(state: AppState) {
    let target = parse_time_of_day(&state.config.notification.time_of_day).unwrap_or_else(|| {
        tracing::warn!(
            "Invalid notification.time_of_day '{}', falling back to 09:00",
            state.config.notification.time_of_day
        );
        NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default()
    });
    let tolerance = state.config.notification.tolerance_minutes;

    let stock = StockService::new(state.db.clone());
    let triggers = NotificationTriggerService::new(state.db.clone(), &state.config);
    let notifications = NotificationService::new(state.db.clone(), &state.config);

    tracing::info!(
        "Notification scheduler started (daily at {} +/- {} min)",
        target.format("%H:%M"),
        tolerance
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(60));
    let mut last_run: Option<NaiveDate> = None;

    loop {
        ticker.tick().await;

        let now = Utc::now();
        let today = now.date_naive();

        if last_run == Some(today) {
            continue;
        }
        if !is_within_run_window(now.time(), target, tolerance) {
            continue;
        }
        last_run = Some(today);

        match stock.expire_overdue_batches().await {
            Ok(n) if n > 0 => tracing::info!("Marked {} overdue batches as expired", n),
            Ok(_) => {}
            Err(e) => tracing::error!("Expired batch sweep failed: {}", e),
        }

        match triggers.run_all_triggers().await {
            Ok(result) => tracing::info!(
                "Trigger run complete: {} medication, {} prescription, {} stock expiry, {} low stock ({} total)",
                result.medication_warnings,
                result.prescription_warnings,
                result.stock_expiry_warnings,
                result.low_stock_warnings,
                result.total
            ),
            Err(e) => tracing::error!("Trigger run failed: {}", e),
        }

        match notifications.send_pending_notifications(SEND_BATCH_SIZE).await {
            Ok(sent) => tracing::info!("Sent {} pending notifications", sent),
            Err(e) => tracing::error!("Sending pending notifications failed: {}", e),
        }
    }
}

/// Parse "HH:MM" into a time of day
pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").ok()
}

/// True when `now` is within `tolerance_minutes` of `target`. The distance
/// is circular, so a window around midnight spans both sides of it.
pub fn is_within_run_window(now: NaiveTime, target: NaiveTime, tolerance_minutes: i64) -> bool {
    const MINUTES_PER_DAY: i64 = 24 * 60;
    let forward = (now - target).num_minutes().rem_euclid(MINUTES_PER_DAY);
    forward.min(MINUTES_PER_DAY - forward) <= tolerance_minutes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn window_includes_edges() {
        let target = time(9, 0);
        assert!(is_within_run_window(time(8, 30), target, 30));
        assert!(is_within_run_window(time(9, 0), target, 30));
        assert!(is_within_run_window(time(9, 30), target, 30));
    }

    #[test]
    fn window_excludes_outside() {
        let target = time(9, 0);
        assert!(!is_within_run_window(time(8, 29), target, 30));
        assert!(!is_within_run_window(time(9, 31), target, 30));
        assert!(!is_within_run_window(time(21, 0), target, 30));
    }

    #[test]
    fn window_wraps_around_midnight() {
        let target = time(0, 10);
        assert!(is_within_run_window(time(23, 50), target, 30));
        assert!(is_within_run_window(time(0, 40), target, 30));
        assert!(!is_within_run_window(time(23, 39), target, 30));
        assert!(!is_within_run_window(time(0, 41), target, 30));

        let late_target = time(23, 55);
        assert!(is_within_run_window(time(0, 15), late_target, 30));
        assert!(!is_within_run_window(time(0, 26), late_target, 30));
    }

    #[test]
    fn parses_valid_times_only() {
        assert_eq!(parse_time_of_day("09:00"), Some(time(9, 0)));
        assert_eq!(parse_time_of_day("23:59"), Some(time(23, 59)));
        assert_eq!(parse_time_of_day("9am"), None);
        assert_eq!(parse_time_of_day(""), None);
    }
}
