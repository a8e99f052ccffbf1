use esp_hal::{gpio::Output, spi::master::Spi, uart::Uart, Async, Blocking};
use navlogger::recorder::{RecorderPhase, RecorderStats};
use sdcard::{EmbassyClock, SdCard, StorageSession, SD_PATH_MAX};

use super::{clock::GpsWallClock, config::CONSOLE_LINE_MAX};

pub(crate) type SerialUart = Uart<'static, Async>;
pub(crate) type SdDriver = SdCard<Spi<'static, Blocking>, Output<'static>, EmbassyClock>;
pub(crate) type Storage = StorageSession<SdDriver, GpsWallClock>;
pub(crate) type LogLine = heapless::Vec<u8, CONSOLE_LINE_MAX>;

pub(crate) enum StorageCommand {
    Start,
    Stop,
    Status,
    Record(LogLine),
}

pub(crate) struct StorageStatus {
    pub(crate) phase: RecorderPhase,
    pub(crate) mounted: bool,
    pub(crate) stats: RecorderStats,
    pub(crate) path: heapless::String<SD_PATH_MAX>,
}
