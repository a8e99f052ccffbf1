use crate::block::BlockDevice;
use crate::config::FatConfig;
use crate::probe::SECTOR_SIZE;

use super::cache::SectorCache;
use super::core::{FatError, OpenMode, PartitionInfo};
use super::dir_scan::{DirMatch, DirSlot};

/// Borrowed view of a mounted volume: the device, its geometry and the
/// shared FAT/directory sector cache.
pub(crate) struct Volume<'a, B> {
    pub(crate) dev: &'a mut B,
    pub(crate) part: PartitionInfo,
    pub(crate) meta: &'a mut SectorCache,
    pub(crate) config: FatConfig,
    /// DOS timestamp applied to entries written during this call.
    pub(crate) stamp: u32,
}

impl<'a, B: BlockDevice> Volume<'a, B> {
    pub(crate) fn new(
        dev: &'a mut B,
        part: PartitionInfo,
        meta: &'a mut SectorCache,
        config: FatConfig,
        stamp: u32,
    ) -> Self {
        Self {
            dev,
            part,
            meta,
            config,
            stamp,
        }
    }
}

/// Cursor and cache of one open file.
#[derive(Clone)]
pub(crate) struct FileState {
    pub(crate) in_use: bool,
    pub(crate) serial: u32,
    pub(crate) mode: OpenMode,
    pub(crate) attribute: u8,
    pub(crate) first_sector_of_first_cluster: u32,
    pub(crate) first_sector_of_curr_cluster: u32,
    pub(crate) sector_of_curr_cluster: u32,
    /// 0..=512; 512 means parked after the last byte of the allocated chain.
    pub(crate) byte_of_curr_sector: u32,
    pub(crate) size: u32,
    pub(crate) position: u32,
    pub(crate) dir_slot: DirSlot,
    pub(crate) cache: SectorCache,
}

impl FileState {
    pub(crate) const fn new() -> Self {
        Self {
            in_use: false,
            serial: 0,
            mode: OpenMode::Read,
            attribute: 0,
            first_sector_of_first_cluster: 0,
            first_sector_of_curr_cluster: 0,
            sector_of_curr_cluster: 0,
            byte_of_curr_sector: 0,
            size: 0,
            position: 0,
            dir_slot: DirSlot { sector: 0, index: 0 },
            cache: SectorCache::new(),
        }
    }

    pub(crate) fn lock(&mut self, serial: u32, mode: OpenMode) {
        *self = Self::new();
        self.in_use = true;
        self.serial = serial;
        self.mode = mode;
    }

    /// Zeroes every field so a later lock starts from a clean slot.
    pub(crate) fn unlock(&mut self) {
        *self = Self::new();
    }

    pub(crate) fn attach(
        &mut self,
        found: &DirMatch,
        part: &PartitionInfo,
    ) -> Result<(), FatError> {
        self.first_sector_of_first_cluster = part.cluster_to_sector(found.record.first_cluster)?;
        self.attribute = found.record.attributes;
        self.size = found.record.size;
        self.dir_slot = found.slot;
        self.rewind();
        Ok(())
    }

    pub(crate) fn rewind(&mut self) {
        self.first_sector_of_curr_cluster = self.first_sector_of_first_cluster;
        self.sector_of_curr_cluster = 0;
        self.byte_of_curr_sector = 0;
        self.position = 0;
    }

    pub(crate) fn current_sector(&self) -> u32 {
        self.first_sector_of_curr_cluster + self.sector_of_curr_cluster
    }

    pub(crate) fn at_sector_end(&self) -> bool {
        self.byte_of_curr_sector >= SECTOR_SIZE as u32
    }
}
