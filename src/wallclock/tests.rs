use super::*;

fn date(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> DateTime {
    DateTime {
        year,
        month,
        day,
        hour,
        minute,
        second,
    }
}

#[test]
fn epoch_start_is_first_of_january_1970() {
    assert_eq!(datetime_from_unix(0), date(1970, 1, 1, 0, 0, 0));
}

#[test]
fn converts_dates_around_leap_days() {
    assert_eq!(datetime_from_unix(951_782_400), date(2000, 2, 29, 0, 0, 0));
    assert_eq!(datetime_from_unix(1_709_251_199), date(2024, 2, 29, 23, 59, 59));
    assert_eq!(datetime_from_unix(1_709_251_200), date(2024, 3, 1, 0, 0, 0));
    assert_eq!(datetime_from_unix(1_715_927_400), date(2024, 5, 17, 6, 30, 0));
}

#[test]
fn sync_counts_forward_and_applies_offset() {
    let sync = TimeSync {
        unix_epoch_utc_seconds: 1_715_927_400,
        tz_offset_minutes: 120,
        synced_at_ms: 5_000,
    };
    assert_eq!(sync.local_datetime(5_000), date(2024, 5, 17, 8, 30, 0));
    assert_eq!(sync.local_datetime(66_999), date(2024, 5, 17, 8, 31, 1));
    // Monotonic time before the sync point never runs the clock backwards.
    assert_eq!(sync.local_datetime(0), date(2024, 5, 17, 8, 30, 0));
}

#[test]
fn negative_offset_clamps_at_epoch() {
    let sync = TimeSync {
        unix_epoch_utc_seconds: 60,
        tz_offset_minutes: -300,
        synced_at_ms: 0,
    };
    assert_eq!(sync.local_seconds(0), 0);
}
