use crate::block::BlockDevice;
use crate::probe::SECTOR_SIZE;

use super::core::{FatError, DIR_ENTRY_SIZE};

/// One sector of buffered medium content, tagged with its address.
#[derive(Clone)]
pub(crate) struct SectorCache {
    sector: Option<u32>,
    dirty: bool,
    pub(crate) data: [u8; SECTOR_SIZE],
}

impl SectorCache {
    pub(crate) const fn new() -> Self {
        Self {
            sector: None,
            dirty: false,
            data: [0; SECTOR_SIZE],
        }
    }

    pub(crate) fn sector(&self) -> Option<u32> {
        self.sector
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Makes `sector` the cached one, writing back pending changes to the
    /// previous sector first. No I/O when it is already cached.
    pub(crate) fn load<B: BlockDevice>(
        &mut self,
        dev: &mut B,
        sector: u32,
    ) -> Result<(), FatError> {
        if self.sector == Some(sector) {
            return Ok(());
        }
        self.write_back(dev)?;
        self.sector = None;
        dev.get_sector(sector, &mut self.data)?;
        self.sector = Some(sector);
        Ok(())
    }

    /// Like `load` for a sector whose old content is irrelevant.
    pub(crate) fn load_zeroed<B: BlockDevice>(
        &mut self,
        dev: &mut B,
        sector: u32,
    ) -> Result<(), FatError> {
        if self.sector != Some(sector) {
            self.write_back(dev)?;
        }
        self.data.fill(0);
        self.sector = Some(sector);
        Ok(())
    }

    pub(crate) fn write_back<B: BlockDevice>(&mut self, dev: &mut B) -> Result<(), FatError> {
        if self.dirty {
            if let Some(sector) = self.sector {
                dev.put_sector(sector, &self.data)?;
            }
            self.dirty = false;
        }
        Ok(())
    }

    /// Writes the cached sector now, dirty or not.
    pub(crate) fn store<B: BlockDevice>(&mut self, dev: &mut B) -> Result<(), FatError> {
        if let Some(sector) = self.sector {
            dev.put_sector(sector, &self.data)?;
        }
        self.dirty = false;
        Ok(())
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn invalidate(&mut self) {
        self.sector = None;
        self.dirty = false;
    }

    pub(crate) fn u16_at(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.data[offset], self.data[offset + 1]])
    }

    pub(crate) fn set_u16_at(&mut self, offset: usize, value: u16) {
        self.data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn entry(&self, index: usize) -> &[u8] {
        &self.data[index * DIR_ENTRY_SIZE..(index + 1) * DIR_ENTRY_SIZE]
    }

    pub(crate) fn entry_mut(&mut self, index: usize) -> &mut [u8] {
        &mut self.data[index * DIR_ENTRY_SIZE..(index + 1) * DIR_ENTRY_SIZE]
    }
}
