//! In-memory [`BlockDevice`] with a FAT16 formatter and fault injection.

use alloc::vec;
use alloc::vec::Vec;

use crate::block::BlockDevice;
use crate::probe::{CardInfo, CardVersion, SdError, SECTOR_SIZE};

/// Layout handed to [`format_fat16`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub total_sectors: u32,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub fat_copies: u8,
    pub root_entries: u16,
    /// When set, sector 0 holds an MBR with one FAT16 partition starting here.
    pub partition_start: Option<u32>,
}

impl Geometry {
    /// 2 MiB volume, 2 KiB clusters, two FATs, 512 root entries.
    pub const fn small() -> Self {
        Self {
            total_sectors: 4096,
            sectors_per_cluster: 4,
            reserved_sectors: 1,
            fat_copies: 2,
            root_entries: 512,
            partition_start: None,
        }
    }

    pub const fn with_sectors_per_cluster(mut self, spc: u8) -> Self {
        self.sectors_per_cluster = spc;
        self
    }

    pub const fn with_root_entries(mut self, entries: u16) -> Self {
        self.root_entries = entries;
        self
    }

    pub const fn with_total_sectors(mut self, total: u32) -> Self {
        self.total_sectors = total;
        self
    }

    pub const fn with_partition_start(mut self, start: u32) -> Self {
        self.partition_start = Some(start);
        self
    }

    fn sectors_per_fat(&self) -> u16 {
        let entries = self.total_sectors / self.sectors_per_cluster as u32 + 2;
        (entries * 2).div_ceil(SECTOR_SIZE as u32) as u16
    }
}

pub struct RamDisk {
    sectors: Vec<[u8; SECTOR_SIZE]>,
    initialized: bool,
    fat_start: u32,
    sectors_per_fat: u16,
    /// Every read fails with `CrcData` while set.
    pub fail_reads: bool,
    /// Writes succeed this many more times, then fail with `CrcData`.
    pub fail_writes_after: Option<u32>,
    pub init_error: Option<SdError>,
    pub reads: u32,
    pub writes: u32,
    pub write_log: Vec<u32>,
    pub init_calls: u32,
    pub deinit_calls: u32,
}

impl RamDisk {
    pub fn blank(sector_count: u32) -> Self {
        Self {
            sectors: vec![[0u8; SECTOR_SIZE]; sector_count as usize],
            initialized: false,
            fat_start: 0,
            sectors_per_fat: 0,
            fail_reads: false,
            fail_writes_after: None,
            init_error: None,
            reads: 0,
            writes: 0,
            write_log: Vec::new(),
            init_calls: 0,
            deinit_calls: 0,
        }
    }

    pub fn sector(&self, sector: u32) -> &[u8; SECTOR_SIZE] {
        &self.sectors[sector as usize]
    }

    pub fn sector_mut(&mut self, sector: u32) -> &mut [u8; SECTOR_SIZE] {
        &mut self.sectors[sector as usize]
    }

    pub fn io_count(&self) -> u32 {
        self.reads + self.writes
    }

    /// Raw FAT entry from copy `copy` of a formatted image.
    pub fn fat_entry(&self, copy: u8, cluster: u16) -> u16 {
        let offset = cluster as u32 * 2;
        let sector = self.fat_start
            + copy as u32 * self.sectors_per_fat as u32
            + offset / SECTOR_SIZE as u32;
        let byte = (offset % SECTOR_SIZE as u32) as usize;
        let data = self.sector(sector);
        u16::from_le_bytes([data[byte], data[byte + 1]])
    }

    /// Number of clusters currently marked in use in the first FAT copy.
    pub fn used_clusters(&self, max_cluster: u16) -> usize {
        (2..=max_cluster).filter(|c| self.fat_entry(0, *c) != 0).count()
    }
}

impl BlockDevice for RamDisk {
    fn init(&mut self) -> Result<CardInfo, SdError> {
        self.init_calls += 1;
        if let Some(err) = self.init_error {
            return Err(err);
        }
        self.initialized = true;
        Ok(CardInfo {
            version: CardVersion::V2,
            high_capacity: false,
            capacity_bytes: self.sectors.len() as u64 * SECTOR_SIZE as u64,
            cid: [0; 16],
            csd: [0; 16],
        })
    }

    fn get_sector(&mut self, sector: u32, out: &mut [u8; SECTOR_SIZE]) -> Result<(), SdError> {
        if !self.initialized {
            return Err(SdError::NotInitialized);
        }
        self.reads += 1;
        if self.fail_reads {
            return Err(SdError::CrcData);
        }
        let data = self.sectors.get(sector as usize).ok_or(SdError::ReadData)?;
        out.copy_from_slice(data);
        Ok(())
    }

    fn put_sector(&mut self, sector: u32, data: &[u8; SECTOR_SIZE]) -> Result<(), SdError> {
        if !self.initialized {
            return Err(SdError::NotInitialized);
        }
        self.writes += 1;
        match self.fail_writes_after {
            Some(0) => return Err(SdError::CrcData),
            Some(ref mut left) => *left -= 1,
            None => {}
        }
        let target = self.sectors.get_mut(sector as usize).ok_or(SdError::WriteData)?;
        target.copy_from_slice(data);
        self.write_log.push(sector);
        Ok(())
    }

    fn deinit(&mut self) {
        self.deinit_calls += 1;
        self.initialized = false;
    }
}

fn put_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Builds an empty FAT16 volume, optionally behind an MBR.
pub fn format_fat16(geometry: Geometry) -> RamDisk {
    let start = geometry.partition_start.unwrap_or(0);
    let mut disk = RamDisk::blank(start + geometry.total_sectors);
    let spf = geometry.sectors_per_fat();

    if let Some(start) = geometry.partition_start {
        let mbr = disk.sector_mut(0);
        mbr[446 + 4] = 0x06;
        put_u32(mbr, 446 + 8, start);
        put_u32(mbr, 446 + 12, geometry.total_sectors);
        mbr[510] = 0x55;
        mbr[511] = 0xAA;
    }

    let boot = disk.sector_mut(start);
    boot[..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
    boot[3..11].copy_from_slice(b"NAVLOG  ");
    put_u16(boot, 11, SECTOR_SIZE as u16);
    boot[13] = geometry.sectors_per_cluster;
    put_u16(boot, 14, geometry.reserved_sectors);
    boot[16] = geometry.fat_copies;
    put_u16(boot, 17, geometry.root_entries);
    if geometry.total_sectors < 0x1_0000 {
        put_u16(boot, 19, geometry.total_sectors as u16);
    } else {
        put_u32(boot, 32, geometry.total_sectors);
    }
    boot[21] = 0xF8;
    put_u16(boot, 22, spf);
    boot[38] = 0x29;
    boot[43..54].copy_from_slice(b"NO NAME    ");
    boot[54..62].copy_from_slice(b"FAT16   ");
    boot[510] = 0x55;
    boot[511] = 0xAA;

    disk.fat_start = start + geometry.reserved_sectors as u32;
    disk.sectors_per_fat = spf;
    for copy in 0..geometry.fat_copies as u32 {
        let fat = disk.sector_mut(disk.fat_start + copy * spf as u32);
        put_u16(fat, 0, 0xFFF8);
        put_u16(fat, 2, 0xFFFF);
    }
    disk
}

/// A FAT32 boot sector, which the FAT16 mount must refuse.
pub fn fat32_image() -> RamDisk {
    let mut disk = RamDisk::blank(1024);
    let boot = disk.sector_mut(0);
    boot[..3].copy_from_slice(&[0xEB, 0x58, 0x90]);
    put_u16(boot, 11, SECTOR_SIZE as u16);
    boot[13] = 1;
    put_u16(boot, 14, 32);
    boot[16] = 2;
    put_u32(boot, 32, 1024);
    put_u32(boot, 36, 8);
    put_u32(boot, 44, 2);
    boot[82..90].copy_from_slice(b"FAT32   ");
    boot[510] = 0x55;
    boot[511] = 0xAA;
    disk
}
