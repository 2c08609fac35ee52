use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

const SECONDS_PER_HOUR: f64 = 3600.0;
const NANOS_PER_SECOND: i128 = 1_000_000_000;
const NANOS_PER_MINUTE: i128 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: i128 = 60 * NANOS_PER_MINUTE;

/// Time-based exit charge: a free period, then a flat hourly rate on the
/// overage, truncated to whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPolicy {
    pub free_minutes: u32,
    pub hourly_rate: u32,
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            free_minutes: 60,
            hourly_rate: 60,
        }
    }
}

impl BillingPolicy {
    pub fn new(free_minutes: u32, hourly_rate: u32) -> Self {
        Self {
            free_minutes,
            hourly_rate,
        }
    }

    /// Charge for a stay from `entry_time` until `now`.
    ///
    /// Always a non-negative integer, `floor(overage_hours * hourly_rate)`
    /// computed exactly in nanoseconds. An `entry_time` after `now` yields a
    /// negative duration and therefore lands in the free period.
    pub fn charge(&self, entry_time: DateTime<Utc>, now: DateTime<Utc>) -> Decimal {
        let free = i128::from(self.free_minutes) * NANOS_PER_MINUTE;
        let overage = elapsed_nanos(entry_time, now) - free;
        if overage <= 0 {
            return Decimal::ZERO;
        }
        let units = overage * i128::from(self.hourly_rate) / NANOS_PER_HOUR;
        // i64 holds any stay chrono can represent at a u32 rate
        Decimal::from(i64::try_from(units).unwrap_or(i64::MAX))
    }
}

fn elapsed_nanos(entry_time: DateTime<Utc>, now: DateTime<Utc>) -> i128 {
    let delta = now - entry_time;
    i128::from(delta.num_seconds()) * NANOS_PER_SECOND + i128::from(delta.subsec_nanos())
}

/// Elapsed time in fractional hours, for reporting.
pub fn elapsed_hours(entry_time: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let delta = now - entry_time;
    let seconds = delta.num_seconds() as f64
        + f64::from(delta.subsec_nanos()) / 1_000_000_000.0;
    seconds / SECONDS_PER_HOUR
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn charge_after(duration: Duration) -> Decimal {
        let entry = Utc::now();
        BillingPolicy::default().charge(entry, entry + duration)
    }

    #[test]
    fn test_free_first_hour() {
        assert_eq!(charge_after(Duration::zero()), Decimal::ZERO);
        assert_eq!(charge_after(Duration::minutes(30)), Decimal::ZERO);
        assert_eq!(charge_after(Duration::hours(1)), Decimal::ZERO);
    }

    #[test]
    fn test_overage_is_truncated() {
        assert_eq!(charge_after(Duration::hours(2)), dec!(60));
        assert_eq!(charge_after(Duration::minutes(90)), dec!(30));
        // 1h 0m 59s -> 0.98 units, truncated to zero
        assert_eq!(charge_after(Duration::seconds(3659)), Decimal::ZERO);
        assert_eq!(charge_after(Duration::minutes(61) + Duration::seconds(59)), dec!(1));
        assert_eq!(charge_after(Duration::minutes(64)), dec!(4));
    }

    #[test]
    fn test_every_whole_minute_bills_one_unit_per_overage_minute() {
        for minutes in 0..=600 {
            let expected = Decimal::from((minutes - 60).max(0));
            assert_eq!(
                charge_after(Duration::minutes(minutes)),
                expected,
                "stay of {minutes} minutes"
            );
        }
    }

    #[test]
    fn test_sub_second_overage_is_truncated() {
        let just_short = Duration::minutes(61) - Duration::nanoseconds(1);
        assert_eq!(charge_after(just_short), Decimal::ZERO);
        assert_eq!(charge_after(Duration::minutes(61)), dec!(1));
    }

    #[test]
    fn test_entry_in_future_is_free() {
        assert_eq!(charge_after(Duration::hours(-3)), Decimal::ZERO);
    }

    #[test]
    fn test_custom_policy() {
        let entry = Utc::now();
        let policy = BillingPolicy::new(30, 100);
        assert_eq!(policy.charge(entry, entry + Duration::hours(1)), dec!(50));
    }

    #[test]
    fn test_elapsed_hours_fractional() {
        let entry = Utc::now();
        let hours = elapsed_hours(entry, entry + Duration::milliseconds(5_400_500));
        assert!((hours - 1.500_138_9).abs() < 1e-6);
    }
}
