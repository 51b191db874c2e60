//! Fixed US equity trading calendar, evaluated in Eastern time.
//!
//! All checks take an explicit `DateTime<Utc>` so callers can inject a
//! deterministic clock in tests instead of reading the ambient wall clock.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::US::Eastern;

const OPEN_MINUTES: u32 = 9 * 60 + 30;
const CLOSE_MINUTES: u32 = 16 * 60;
/// Broad-ETF 0DTE order cutoff (3:15 PM ET).
const ZERO_DTE_CUTOFF_MINUTES: u32 = 15 * 60 + 15;
/// Forced end-of-day unwind, 5 minutes before the cutoff.
const EOD_UNWIND_MINUTES: u32 = 15 * 60 + 10;

fn eastern_clock(now: DateTime<Utc>) -> (Weekday, u32) {
    let et = now.with_timezone(&Eastern);
    (et.weekday(), et.hour() * 60 + et.minute())
}

fn is_weekday(day: Weekday) -> bool {
    !matches!(day, Weekday::Sat | Weekday::Sun)
}

/// True during regular trading hours (9:30 to 16:00 ET, Monday to Friday).
pub fn is_market_open(now: DateTime<Utc>) -> bool {
    let (day, minutes) = eastern_clock(now);
    is_weekday(day) && (OPEN_MINUTES..=CLOSE_MINUTES).contains(&minutes)
}

/// True while same-day-expiry orders on broad ETFs may still be submitted.
pub fn can_submit_zero_dte(now: DateTime<Utc>) -> bool {
    let (day, minutes) = eastern_clock(now);
    is_weekday(day) && minutes < ZERO_DTE_CUTOFF_MINUTES
}

/// Seconds remaining until the 0DTE order cutoff, or `None` if past it.
pub fn secs_to_cutoff(now: DateTime<Utc>) -> Option<i64> {
    let et = now.with_timezone(&Eastern);
    let cutoff_secs = i64::from(ZERO_DTE_CUTOFF_MINUTES) * 60;
    let now_secs =
        i64::from(et.hour()) * 3600 + i64::from(et.minute()) * 60 + i64::from(et.second());
    if now_secs >= cutoff_secs {
        return None;
    }
    Some(cutoff_secs - now_secs)
}

/// The UTC instant of today's forced end-of-day unwind (3:10 PM ET).
///
/// May already be in the past, in which case a timer armed on it fires
/// immediately.
pub fn eod_unwind_at(now: DateTime<Utc>) -> DateTime<Utc> {
    let et = now.with_timezone(&Eastern);
    let Some(naive) = et
        .date_naive()
        .and_hms_opt(EOD_UNWIND_MINUTES / 60, EOD_UNWIND_MINUTES % 60, 0)
    else {
        return now;
    };
    use chrono::TimeZone;
    match Eastern.from_local_datetime(&naive).earliest() {
        Some(t) => t.with_timezone(&Utc),
        None => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // 2025-06-10 is a Tuesday; ET is UTC-4 in June.
    fn summer(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, h, m, 0).unwrap()
    }

    #[test]
    fn open_midday() {
        // 14:00 ET
        assert!(is_market_open(summer(18, 0)));
    }

    #[test]
    fn closed_before_open_and_after_close() {
        // 9:00 ET
        assert!(!is_market_open(summer(13, 0)));
        // 16:30 ET
        assert!(!is_market_open(summer(20, 30)));
    }

    #[test]
    fn closed_on_weekend() {
        // 2025-06-08 is a Sunday, 14:00 ET
        let sunday = Utc.with_ymd_and_hms(2025, 6, 8, 18, 0, 0).unwrap();
        assert!(!is_market_open(sunday));
    }

    #[test]
    fn cutoff_blocks_after_315_et() {
        // 15:00 ET, still allowed
        assert!(can_submit_zero_dte(summer(19, 0)));
        // 15:20 ET, past cutoff
        assert!(!can_submit_zero_dte(summer(19, 20)));
    }

    #[test]
    fn secs_to_cutoff_counts_down() {
        // 15:14 ET → 60 seconds left
        assert_eq!(secs_to_cutoff(summer(19, 14)), Some(60));
        // 15:16 ET → past
        assert_eq!(secs_to_cutoff(summer(19, 16)), None);
    }

    #[test]
    fn eod_unwind_is_310_et() {
        let at = eod_unwind_at(summer(14, 0));
        // 15:10 ET == 19:10 UTC in June
        assert_eq!(at, Utc.with_ymd_and_hms(2025, 6, 10, 19, 10, 0).unwrap());
    }

    #[test]
    fn eod_unwind_handles_winter_offset() {
        // 2025-01-15 is a Wednesday; ET is UTC-5 in January.
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 15, 0, 0).unwrap();
        let at = eod_unwind_at(now);
        assert_eq!(at, Utc.with_ymd_and_hms(2025, 1, 15, 20, 10, 0).unwrap());
    }
}
