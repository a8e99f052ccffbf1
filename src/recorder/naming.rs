use core::fmt::Write as _;

use sdcard::{DateTime, SD_PATH_MAX};

pub type LogPath = heapless::String<SD_PATH_MAX>;

const MAX_DAILY_FILES: u32 = 100_000;

/// Generates `PREFIX/YYYYMMDD/GPSnnnnn.EXT` names. The counter restarts
/// whenever the calendar day changes.
#[derive(Clone, Debug)]
pub struct LogNamer {
    prefix: &'static str,
    extension: &'static str,
    day: Option<(u16, u8, u8)>,
    counter: u32,
}

impl LogNamer {
    pub fn new(prefix: &'static str, extension: &'static str) -> Self {
        Self {
            prefix,
            extension,
            day: None,
            counter: 0,
        }
    }

    /// Next name in sequence, or `None` without a valid clock or once the
    /// day's counter is used up.
    pub fn candidate(&mut self, now: Option<DateTime>) -> Option<LogPath> {
        let now = now?;
        let day = (now.year, now.month, now.day);
        if self.day != Some(day) {
            self.day = Some(day);
            self.counter = 0;
        }
        if self.counter >= MAX_DAILY_FILES {
            return None;
        }

        let mut path = LogPath::new();
        write!(
            path,
            "{}/{:04}{:02}{:02}/GPS{:05}.{}",
            self.prefix, now.year, now.month, now.day, self.counter, self.extension
        )
        .ok()?;
        self.counter += 1;
        Some(path)
    }

    /// First candidate for which `exists` reports false.
    pub fn next_unused(
        &mut self,
        now: Option<DateTime>,
        mut exists: impl FnMut(&str) -> bool,
    ) -> Option<LogPath> {
        while let Some(path) = self.candidate(now) {
            if !exists(&path) {
                return Some(path);
            }
        }
        None
    }
}
