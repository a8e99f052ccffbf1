//! Wall-clock bookkeeping for a device that only learns the time from an
//! external sync command and counts forward on its monotonic timer.

use sdcard::DateTime;

const SECONDS_PER_DAY: u64 = 86_400;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeSync {
    pub unix_epoch_utc_seconds: u64,
    pub tz_offset_minutes: i32,
    /// Monotonic milliseconds at which the sync was applied.
    pub synced_at_ms: u64,
}

impl TimeSync {
    pub fn local_seconds(&self, now_ms: u64) -> u64 {
        let elapsed = now_ms.saturating_sub(self.synced_at_ms) / 1_000;
        let utc_now = self.unix_epoch_utc_seconds.saturating_add(elapsed);
        (utc_now as i64 + (self.tz_offset_minutes as i64) * 60).max(0) as u64
    }

    pub fn local_datetime(&self, now_ms: u64) -> DateTime {
        datetime_from_unix(self.local_seconds(now_ms))
    }
}

/// Splits seconds since 1970-01-01 into a proleptic Gregorian date and time.
pub fn datetime_from_unix(seconds: u64) -> DateTime {
    let days = (seconds / SECONDS_PER_DAY) as i64;
    let of_day = seconds % SECONDS_PER_DAY;

    // Shift the epoch to 0000-03-01 so leap days fall at the end of a year.
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);

    DateTime {
        year: year.clamp(0, u16::MAX as i64) as u16,
        month: month as u8,
        day: day as u8,
        hour: (of_day / 3_600) as u8,
        minute: (of_day / 60 % 60) as u8,
        second: (of_day % 60) as u8,
    }
}

#[cfg(test)]
mod tests;
