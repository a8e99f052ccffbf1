use core::cell::Cell;

use embassy_sync::{
    blocking_mutex::{raw::CriticalSectionRawMutex, Mutex},
    channel::Channel,
};
use navlogger::{recorder::RecorderConfig, wallclock::TimeSync};
use sdcard::{FatConfig, SdConfig};

use super::types::{StorageCommand, StorageStatus};

pub(crate) const UART_BAUD: u32 = 115_200;
pub(crate) const SD_SPI_KHZ: u32 = 400;
pub(crate) const CONSOLE_LINE_MAX: usize = 160;
pub(crate) const STORAGE_TICK_MS: u64 = 10;
pub(crate) const CONSOLE_POLL_MS: u64 = 10;

pub(crate) const SD_CONFIG: SdConfig = SdConfig::default_const();
pub(crate) const FAT_CONFIG: FatConfig = FatConfig::default_const();
pub(crate) const RECORDER_CONFIG: RecorderConfig = RecorderConfig::default_const();

pub(crate) static STORAGE_COMMANDS: Channel<CriticalSectionRawMutex, StorageCommand, 16> =
    Channel::new();
pub(crate) static STORAGE_STATUS: Channel<CriticalSectionRawMutex, StorageStatus, 2> =
    Channel::new();
pub(crate) static WALL_CLOCK: Mutex<CriticalSectionRawMutex, Cell<Option<TimeSync>>> =
    Mutex::new(Cell::new(None));
