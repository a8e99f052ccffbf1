//! FAT16 on top of a [`BlockDevice`](crate::block::BlockDevice): 8.3 names,
//! one FAT copy set, a fixed root directory and a small handle pool.

mod cache;
mod cluster_utils;
mod core;
mod datetime;
mod dir_ops;
mod dir_scan;
mod file_io;
mod mount;
mod names;
mod session;
mod volume;


pub use self::core::{
    DirEntryInfo, FatError, FileHandle, OpenMode, PartitionInfo, SeekOrigin, ATTR_ARCHIVE,
    ATTR_HIDDEN, ATTR_LONG_NAME, ATTR_NONE, ATTR_READONLY, ATTR_SUBDIRECTORY, ATTR_SYSTEM,
    ATTR_VOLUME,
};
pub use datetime::{DateTime, NoClock, TimeSource};
pub use names::{separate_dir_name, ShortName};
pub use session::StorageSession;
