//! Expiry policy
//!
//! Pure date math shared by stock batches, medication schedules and
//! prescription validity. A `None` date means "no expiry constraint" and is
//! treated as never expiring and never near expiry.
//!
//! Convention: the day of expiry itself is not "near expiry" — the near
//! window is `0 < days_until <= threshold`. The same rule applies to every
//! entity kind.

use chrono::NaiveDate;

/// True iff `date` lies strictly in the past. The expiry day itself does not
/// count as expired.
pub fn is_expired(today: NaiveDate, date: Option<NaiveDate>) -> bool {
    match date {
        Some(d) => today > d,
        None => false,
    }
}

/// True iff `date` falls within the look-ahead window, excluding today.
pub fn is_near_expiry(today: NaiveDate, date: Option<NaiveDate>, threshold_days: i64) -> bool {
    match date {
        Some(d) => {
            let days = days_until(today, d);
            days > 0 && days <= threshold_days
        }
        None => false,
    }
}

/// Days remaining until `date`, clamped at zero. `None` when there is no
/// expiry constraint.
pub fn remaining_days(today: NaiveDate, date: Option<NaiveDate>) -> Option<i64> {
    date.map(|d| days_until(today, d).max(0))
}

/// Signed day count from `today` to `date` (negative when past)
pub fn days_until(today: NaiveDate, date: NaiveDate) -> i64 {
    (date - today).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn expiry_day_itself_is_not_expired() {
        let today = date(2025, 6, 15);
        assert!(!is_expired(today, Some(today)));
        assert!(is_expired(today, Some(date(2025, 6, 14))));
        assert!(!is_expired(today, Some(date(2025, 6, 16))));
    }

    #[test]
    fn near_expiry_excludes_day_zero() {
        let today = date(2025, 6, 15);
        assert!(!is_near_expiry(today, Some(today), 7));
        assert!(is_near_expiry(today, Some(date(2025, 6, 16)), 7));
        assert!(is_near_expiry(today, Some(date(2025, 6, 22)), 7));
        assert!(!is_near_expiry(today, Some(date(2025, 6, 23)), 7));
    }

    #[test]
    fn missing_date_never_expires() {
        let today = date(2025, 6, 15);
        assert!(!is_expired(today, None));
        assert!(!is_near_expiry(today, None, 365));
        assert_eq!(remaining_days(today, None), None);
    }

    #[test]
    fn remaining_days_clamps_at_zero() {
        let today = date(2025, 6, 15);
        assert_eq!(remaining_days(today, Some(date(2025, 6, 10))), Some(0));
        assert_eq!(remaining_days(today, Some(today)), Some(0));
        assert_eq!(remaining_days(today, Some(date(2025, 6, 20))), Some(5));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    proptest! {
        /// Expired, near-expiry and the day count all agree on the same
        /// date arithmetic: expired iff past, near iff 0 < days <= threshold.
        #[test]
        fn policy_matches_day_arithmetic(offset in -400i64..400, threshold in 0i64..120) {
            let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
            let target = today + Duration::days(offset);

            prop_assert_eq!(is_expired(today, Some(target)), offset < 0);
            prop_assert_eq!(
                is_near_expiry(today, Some(target), threshold),
                offset > 0 && offset <= threshold
            );
            prop_assert_eq!(remaining_days(today, Some(target)), Some(offset.max(0)));
        }

        /// The near window and the expired predicate never overlap.
        #[test]
        fn near_expiry_is_never_expired(offset in -400i64..400, threshold in 0i64..120) {
            let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
            let target = today + Duration::days(offset);
            prop_assert!(
                !(is_near_expiry(today, Some(target), threshold) && is_expired(today, Some(target)))
            );
        }
    }
}
