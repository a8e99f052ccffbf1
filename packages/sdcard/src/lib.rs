#![cfg_attr(not(test), no_std)]

#[cfg(any(test, feature = "test-util"))]
extern crate alloc;

pub mod block;
pub mod clock;
pub mod config;
pub mod fat;
pub mod probe;
#[cfg(any(test, feature = "test-util"))]
pub mod ramdisk;

pub use block::BlockDevice;
pub use clock::{Clock, Deadline};
#[cfg(feature = "embassy")]
pub use clock::EmbassyClock;
pub use config::{FatConfig, SdConfig};
pub use fat::{
    DateTime, DirEntryInfo, FatError, FileHandle, NoClock, OpenMode, PartitionInfo, SeekOrigin,
    StorageSession, TimeSource,
};
pub use probe::{CardId, CardInfo, CardVersion, SdCard, SdError, SECTOR_SIZE};

pub const SD_PATH_MAX: usize = 64;
pub const MAX_OPEN_FILES: usize = 3;
