//! Time helpers for the periodic runner.
use std::time::Duration;

/// Time left in `period` after `work`; `None` when the cycle overran.
#[inline]
pub fn remaining(period: Duration, work: Duration) -> Option<Duration> {
    period.checked_sub(work).filter(|d| !d.is_zero())
}

/// Whole microseconds, saturating at `u64::MAX`.
#[inline]
pub fn as_micros_u64(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrun_has_no_remainder() {
        let p = Duration::from_millis(50);
        assert_eq!(
            remaining(p, Duration::from_millis(20)),
            Some(Duration::from_millis(30))
        );
        assert_eq!(remaining(p, p), None);
        assert_eq!(remaining(p, Duration::from_millis(70)), None);
    }
}
