use crate::block::BlockDevice;
use crate::probe::SECTOR_SIZE;

use super::core::{FatError, PartitionInfo};

const MBR_FIRST_ENTRY: usize = 446;
const MBR_TYPE_OFFSET: usize = 4;
const MBR_START_OFFSET: usize = 8;
/// FAT16 <32M, FAT16B and FAT16 LBA partition types.
const FAT16_PARTITION_TYPES: [u8; 3] = [0x04, 0x06, 0x0E];
const FS_TYPE_OFFSET: usize = 54;
const FS_TYPE_FAT16: &[u8; 5] = b"FAT16";

fn u16_le(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

fn u32_le(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

/// Locates and validates the FAT16 boot sector, following a partition
/// table in sector 0 when one is present.
pub(crate) fn mount_fat16<B: BlockDevice>(
    dev: &mut B,
    sector: &mut [u8; SECTOR_SIZE],
) -> Result<PartitionInfo, FatError> {
    dev.get_sector(0, sector)?;
    let partition_type = sector[MBR_FIRST_ENTRY + MBR_TYPE_OFFSET];
    let start = if FAT16_PARTITION_TYPES.contains(&partition_type) {
        let start = u32_le(sector, MBR_FIRST_ENTRY + MBR_START_OFFSET);
        dev.get_sector(start, sector)?;
        start
    } else {
        0
    };
    let part = parse_boot_sector(sector, start)?;
    log::info!(
        "fat16: mount start={} spc={} fats={} root_entries={} data={}..={}",
        part.start_sector,
        part.sectors_per_cluster,
        part.fat_copies,
        part.max_root_entries,
        part.first_data_sector,
        part.last_data_sector
    );
    Ok(part)
}

pub(crate) fn parse_boot_sector(
    boot: &[u8; SECTOR_SIZE],
    start: u32,
) -> Result<PartitionInfo, FatError> {
    let bytes_per_sector = u16_le(boot, 11);
    if bytes_per_sector as usize != SECTOR_SIZE {
        return Err(FatError::BadSectorSize(bytes_per_sector));
    }
    if &boot[FS_TYPE_OFFSET..FS_TYPE_OFFSET + FS_TYPE_FAT16.len()] != FS_TYPE_FAT16 {
        return Err(FatError::NotFat16);
    }

    let sectors_per_cluster = boot[13];
    let reserved = u16_le(boot, 14);
    let fat_copies = boot[16];
    let max_root_entries = u16_le(boot, 17);
    let sectors_per_fat = u16_le(boot, 22);
    if sectors_per_cluster == 0 || fat_copies == 0 || max_root_entries == 0 || sectors_per_fat == 0
    {
        return Err(FatError::BadGeometry);
    }

    let total_sectors = match u16_le(boot, 19) {
        0 => u32_le(boot, 32),
        small => small as u32,
    };
    if total_sectors == 0 {
        return Err(FatError::BadSectorCount);
    }

    let mut part = PartitionInfo {
        start_sector: start,
        sectors_per_cluster,
        fat_copies,
        max_root_entries,
        sectors_per_fat,
        first_fat_sector: 0,
        first_root_dir_sector: 0,
        first_data_sector: 0,
        last_data_sector: 0,
    };
    let root_dir_sectors = part.root_dir_sectors();
    let layout = (|| {
        let first_fat = start.checked_add(reserved as u32)?;
        let first_root = first_fat.checked_add(sectors_per_fat as u32 * fat_copies as u32)?;
        let first_data = first_root.checked_add(root_dir_sectors)?;
        let last_data = start.checked_add(total_sectors - 1)?;
        Some((first_fat, first_root, first_data, last_data))
    })();
    let Some((first_fat, first_root, first_data, last_data)) = layout else {
        return Err(FatError::BadSectorCount);
    };
    if last_data < first_data {
        return Err(FatError::BadSectorCount);
    }
    if last_data - first_data + 1 < sectors_per_cluster as u32 {
        return Err(FatError::BadSectorCount);
    }

    part.first_fat_sector = first_fat;
    part.first_root_dir_sector = first_root;
    part.first_data_sector = first_data;
    part.last_data_sector = last_data;
    Ok(part)
}
