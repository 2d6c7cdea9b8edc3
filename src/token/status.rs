//! Status Deriver
//!
//! A token's activity state is a pure function of its expiry, its
//! server-reported revocation flag and the current time. It is derived on
//! every read and never cached, since "now" keeps moving.

use chrono::{DateTime, Utc};

use crate::core::Clock;
use crate::types::{TokenRecord, TokenStatus};

/// `Expired` iff `now > expires_at`; the boundary instant is still `Active`.
pub fn derive_status(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> TokenStatus {
    if now > expires_at {
        TokenStatus::Expired
    } else {
        TokenStatus::Active
    }
}

/// Status of a record at `now`. A revoked record is never `Active`.
pub fn record_status(record: &TokenRecord, now: DateTime<Utc>) -> TokenStatus {
    if record.revoked {
        TokenStatus::Expired
    } else {
        derive_status(record.expires_at, now)
    }
}

/// Derives statuses against an injected clock.
#[derive(Clone, Copy)]
pub struct StatusDeriver<'a> {
    clock: &'a dyn Clock,
}

impl<'a> StatusDeriver<'a> {
    pub fn new(clock: &'a dyn Clock) -> Self {
        Self { clock }
    }

    pub fn status_of(&self, record: &TokenRecord) -> TokenStatus {
        record_status(record, self.clock.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FixedClock;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 13, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_boundary_is_active() {
        assert_eq!(derive_status(now(), now()), TokenStatus::Active);
    }

    #[test]
    fn test_past_and_future_expiry() {
        let one_ms = Duration::milliseconds(1);
        assert_eq!(derive_status(now() - one_ms, now()), TokenStatus::Expired);
        assert_eq!(derive_status(now() + one_ms, now()), TokenStatus::Active);
    }

    #[test]
    fn test_yesterday_tomorrow_scenario() {
        let records = [
            TokenRecord::new(1, "a", now() - Duration::days(2), now() - Duration::days(1)),
            TokenRecord::new(2, "b", now() - Duration::days(2), now() + Duration::days(1)),
        ];
        let statuses: Vec<_> = records.iter().map(|r| record_status(r, now())).collect();
        assert_eq!(statuses, vec![TokenStatus::Expired, TokenStatus::Active]);
    }

    #[test]
    fn test_revoked_is_expired() {
        let record = TokenRecord::new(1, "a", now(), now() + Duration::days(1)).with_revoked(true);
        assert_eq!(record_status(&record, now()), TokenStatus::Expired);
    }

    #[test]
    fn test_rederived_as_clock_advances() {
        let clock = FixedClock::new(now());
        let record = TokenRecord::new(1, "a", now(), now() + Duration::hours(1));
        let deriver = StatusDeriver::new(&clock);

        assert_eq!(deriver.status_of(&record), TokenStatus::Active);
        clock.advance(Duration::hours(1) + Duration::seconds(1));
        assert_eq!(deriver.status_of(&record), TokenStatus::Expired);
    }
}
