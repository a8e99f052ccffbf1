use crate::probe::{SdError, SECTOR_SIZE};

use super::names::ShortName;

pub(crate) const DIR_ENTRY_SIZE: usize = 32;
pub(crate) const DIR_ENTRIES_PER_SECTOR: usize = SECTOR_SIZE / DIR_ENTRY_SIZE;
pub(crate) const FAT16_ENTRIES_PER_SECTOR: u32 = (SECTOR_SIZE / 2) as u32;

pub const ATTR_NONE: u8 = 0x00;
pub const ATTR_READONLY: u8 = 0x01;
pub const ATTR_HIDDEN: u8 = 0x02;
pub const ATTR_SYSTEM: u8 = 0x04;
pub const ATTR_VOLUME: u8 = 0x08;
pub const ATTR_LONG_NAME: u8 = 0x0F;
pub const ATTR_SUBDIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;

pub(crate) const SLOT_EMPTY: u8 = 0x00;
pub(crate) const SLOT_DELETED: u8 = 0xE5;
/// Stored in place of a leading 0xE5 name byte.
pub(crate) const SLOT_E5_ESCAPE: u8 = 0x05;

pub(crate) const FAT16_FREE: u16 = 0x0000;
pub(crate) const FAT16_USED_MIN: u16 = 0x0002;
pub(crate) const FAT16_USED_MAX: u16 = 0xFFEF;
pub(crate) const FAT16_BAD: u16 = 0xFFF7;
pub(crate) const FAT16_EOC_MIN: u16 = 0xFFF8;
pub(crate) const FAT16_EOC_WRITE: u16 = 0xFFFF;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FatError {
    Sd(SdError),
    NotMounted,
    BadSectorSize(u16),
    NotFat16,
    BadSectorCount,
    BadGeometry,
    InvalidName,
    NotFound,
    NotDirectory,
    IsDirectory,
    AlreadyExists,
    ReadOnly,
    InUse,
    DirectoryFull,
    NoFreeCluster,
    BadCluster(u16),
    NoFreeHandle,
    StaleHandle,
    WrongMode,
    UnsupportedMode,
    SeekOutOfRange,
}

impl From<SdError> for FatError {
    fn from(value: SdError) -> Self {
        Self::Sd(value)
    }
}

/// Geometry of the mounted volume. All sector numbers are absolute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartitionInfo {
    pub start_sector: u32,
    pub sectors_per_cluster: u8,
    pub fat_copies: u8,
    pub max_root_entries: u16,
    pub sectors_per_fat: u16,
    pub first_fat_sector: u32,
    pub first_root_dir_sector: u32,
    pub first_data_sector: u32,
    pub last_data_sector: u32,
}

impl PartitionInfo {
    /// First sector of `cluster`. Clusters below 2 map onto the first data
    /// cluster; anything past `max_cluster` is rejected.
    pub fn cluster_to_sector(&self, cluster: u16) -> Result<u32, FatError> {
        if cluster > self.max_cluster() {
            return Err(FatError::BadCluster(cluster));
        }
        let index = cluster.max(2) as u32 - 2;
        index
            .checked_mul(self.sectors_per_cluster as u32)
            .and_then(|offset| self.first_data_sector.checked_add(offset))
            .filter(|sector| *sector <= self.last_data_sector)
            .ok_or(FatError::BadCluster(cluster))
    }

    pub fn sector_to_cluster(&self, sector: u32) -> u16 {
        let offset = sector.saturating_sub(self.first_data_sector);
        (offset / self.sectors_per_cluster as u32 + 2) as u16
    }

    pub fn root_dir_sectors(&self) -> u32 {
        (self.max_root_entries as u32 * DIR_ENTRY_SIZE as u32).div_ceil(SECTOR_SIZE as u32)
    }

    pub fn cluster_count(&self) -> u32 {
        (self.last_data_sector - self.first_data_sector + 1) / self.sectors_per_cluster as u32
    }

    /// Highest cluster index the FAT and the data area can both address.
    pub fn max_cluster(&self) -> u16 {
        let by_area = self.cluster_count() + 1;
        let by_table = self.sectors_per_fat as u32 * FAT16_ENTRIES_PER_SECTOR - 1;
        by_area.min(by_table).min(FAT16_USED_MAX as u32) as u16
    }

    pub fn cluster_bytes(&self) -> u32 {
        self.sectors_per_cluster as u32 * SECTOR_SIZE as u32
    }

    pub fn is_data_sector(&self, sector: u32) -> bool {
        (self.first_data_sector..=self.last_data_sector).contains(&sector)
    }

    pub(crate) fn fat_location(&self, cluster: u16) -> (u32, usize) {
        let byte_offset = cluster as u32 * 2;
        (
            self.first_fat_sector + byte_offset / SECTOR_SIZE as u32,
            (byte_offset % SECTOR_SIZE as u32) as usize,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Append,
    /// Truncates an existing file.
    Write,
}

impl OpenMode {
    pub fn from_char(mode: char) -> Result<Self, FatError> {
        match mode {
            'r' => Ok(Self::Read),
            'a' => Ok(Self::Append),
            'w' => Ok(Self::Write),
            _ => Err(FatError::UnsupportedMode),
        }
    }

    pub fn is_writing(self) -> bool {
        !matches!(self, Self::Read)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekOrigin {
    Start,
    Current,
    End,
}

/// Lease on one slot of the session's handle pool. Only `open` hands these
/// out and `close` takes them back by value.
#[derive(Debug, PartialEq, Eq)]
pub struct FileHandle {
    pub(crate) slot: u8,
    pub(crate) serial: u32,
}

impl FileHandle {
    pub fn slot(&self) -> usize {
        self.slot as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: ShortName,
    pub attributes: u8,
    pub first_cluster: u16,
    pub size: u32,
    pub datetime: u32,
}

impl DirEntryInfo {
    pub const EMPTY: Self = Self {
        name: ShortName::BLANK,
        attributes: 0,
        first_cluster: 0,
        size: 0,
        datetime: 0,
    };

    pub fn is_dir(&self) -> bool {
        (self.attributes & ATTR_SUBDIRECTORY) != 0
    }
}
