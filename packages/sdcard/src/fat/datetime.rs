/// Wall-clock time as reported by the GPS receiver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DateTime {
    /// Packs into the directory-entry time/date pair (time in the low half).
    pub fn to_dos(&self) -> u32 {
        let mut packed = (0x7F & self.year.saturating_sub(1980) as u32) << 25;
        packed |= (0x0F & self.month as u32) << 21;
        packed |= (0x1F & self.day as u32) << 16;
        packed |= (0x1F & self.hour as u32) << 11;
        packed |= (0x3F & self.minute as u32) << 5;
        packed |= 0x1F & (self.second / 2) as u32;
        packed
    }

    pub fn from_dos(packed: u32) -> Self {
        Self {
            year: 1980 + ((packed >> 25) & 0x7F) as u16,
            month: ((packed >> 21) & 0x0F) as u8,
            day: ((packed >> 16) & 0x1F) as u8,
            hour: ((packed >> 11) & 0x1F) as u8,
            minute: ((packed >> 5) & 0x3F) as u8,
            second: ((packed & 0x1F) * 2) as u8,
        }
    }
}

pub trait TimeSource {
    /// `None` while no valid fix has set the clock.
    fn now(&mut self) -> Option<DateTime>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoClock;

impl TimeSource for NoClock {
    fn now(&mut self) -> Option<DateTime> {
        None
    }
}

pub(crate) fn dos_timestamp(time: Option<DateTime>) -> u32 {
    time.map_or(0, |t| t.to_dos())
}
