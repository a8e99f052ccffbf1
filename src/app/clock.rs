use embassy_time::Instant;
use navlogger::wallclock::TimeSync;
use sdcard::{DateTime, TimeSource};

use super::config::WALL_CLOCK;

/// Reads the wall clock last set over the console.
pub(crate) struct GpsWallClock;

impl TimeSource for GpsWallClock {
    fn now(&mut self) -> Option<DateTime> {
        let sync = WALL_CLOCK.lock(|cell| cell.get())?;
        Some(sync.local_datetime(Instant::now().as_millis()))
    }
}

pub(crate) fn apply_time_sync(unix_epoch_utc_seconds: u64, tz_offset_minutes: i32) {
    let sync = TimeSync {
        unix_epoch_utc_seconds,
        tz_offset_minutes,
        synced_at_ms: Instant::now().as_millis(),
    };
    WALL_CLOCK.lock(|cell| cell.set(Some(sync)));
    log::info!(
        "clock: synced unix={} tz_min={}",
        unix_epoch_utc_seconds,
        tz_offset_minutes
    );
}
