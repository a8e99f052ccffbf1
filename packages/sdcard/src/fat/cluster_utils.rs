use crate::block::BlockDevice;
use crate::probe::SECTOR_SIZE;

use super::core::*;
use super::volume::{FileState, Volume};

static ZERO_SECTOR: [u8; SECTOR_SIZE] = [0; SECTOR_SIZE];

impl<B: BlockDevice> Volume<'_, B> {
    pub(crate) fn read_fat_entry(&mut self, cluster: u16) -> Result<u16, FatError> {
        let (sector, offset) = self.part.fat_location(cluster);
        self.meta.load(self.dev, sector)?;
        Ok(self.meta.u16_at(offset))
    }

    /// Updates the cached FAT sector without writing it out.
    fn stage_fat_entry(&mut self, cluster: u16, value: u16) -> Result<(), FatError> {
        let (sector, offset) = self.part.fat_location(cluster);
        self.meta.load(self.dev, sector)?;
        self.meta.set_u16_at(offset, value);
        Ok(())
    }

    /// Writes the cached FAT sector to every FAT copy.
    fn commit_fat_sector(&mut self) -> Result<(), FatError> {
        let Some(sector) = self.meta.sector() else {
            return Ok(());
        };
        for copy in 0..self.part.fat_copies as u32 {
            let target = sector + copy * self.part.sectors_per_fat as u32;
            self.dev.put_sector(target, &self.meta.data)?;
        }
        Ok(())
    }

    pub(crate) fn write_fat_entry(&mut self, cluster: u16, value: u16) -> Result<(), FatError> {
        self.stage_fat_entry(cluster, value)?;
        self.commit_fat_sector()
    }

    /// Successor of `cluster`, or `None` at end of chain.
    pub(crate) fn next_in_chain(&mut self, cluster: u16) -> Result<Option<u16>, FatError> {
        let value = self.read_fat_entry(cluster)?;
        if value >= FAT16_EOC_MIN {
            return Ok(None);
        }
        if value < FAT16_USED_MIN || value == FAT16_BAD || value > self.part.max_cluster() {
            return Err(FatError::BadCluster(value));
        }
        Ok(Some(value))
    }

    /// Moves the file cursor to the start of the next cluster in its chain.
    /// Returns `None` and leaves the cursor alone at end of chain.
    pub(crate) fn get_next_cluster(
        &mut self,
        file: &mut FileState,
    ) -> Result<Option<u16>, FatError> {
        let sector = file.first_sector_of_curr_cluster;
        let cluster = self.part.sector_to_cluster(sector);
        if !self.part.is_data_sector(sector) {
            return Err(FatError::BadCluster(cluster));
        }
        let Some(next) = self.next_in_chain(cluster)? else {
            return Ok(None);
        };
        file.first_sector_of_curr_cluster = self.part.cluster_to_sector(next)?;
        file.sector_of_curr_cluster = 0;
        file.byte_of_curr_sector = 0;
        Ok(Some(next))
    }

    /// Claims the lowest free cluster by stamping it end-of-chain on the
    /// medium before returning it.
    pub(crate) fn find_next_free_cluster(&mut self) -> Result<u16, FatError> {
        let max_cluster = self.part.max_cluster() as u32;
        for fat_sector in 0..self.part.sectors_per_fat as u32 {
            self.meta.load(self.dev, self.part.first_fat_sector + fat_sector)?;
            for entry in 0..FAT16_ENTRIES_PER_SECTOR {
                let cluster = fat_sector * FAT16_ENTRIES_PER_SECTOR + entry;
                if cluster < 2 {
                    continue;
                }
                if cluster > max_cluster {
                    return Err(FatError::NoFreeCluster);
                }
                let offset = entry as usize * 2;
                if self.meta.u16_at(offset) == FAT16_FREE {
                    self.meta.set_u16_at(offset, FAT16_EOC_WRITE);
                    self.commit_fat_sector()?;
                    log::debug!("fat16: cluster_alloc cluster={}", cluster);
                    return Ok(cluster as u16);
                }
            }
        }
        Err(FatError::NoFreeCluster)
    }

    /// Frees every cluster of the chain starting at `start`. FAT sectors are
    /// written once per run of entries that share a sector.
    pub(crate) fn delete_cluster_chain(&mut self, start: u16) -> Result<(), FatError> {
        let max_cluster = self.part.max_cluster();
        if start < FAT16_USED_MIN || start > max_cluster {
            return Ok(());
        }
        let limit = self.part.cluster_count();
        let mut cluster = start;
        let mut visited = 0u32;
        loop {
            let (sector, offset) = self.part.fat_location(cluster);
            self.meta.load(self.dev, sector)?;
            let next = self.meta.u16_at(offset);
            self.meta.set_u16_at(offset, FAT16_FREE);
            visited += 1;

            let continues = (FAT16_USED_MIN..=FAT16_USED_MAX).contains(&next)
                && next <= max_cluster
                && visited < limit;
            if !continues || self.part.fat_location(next).0 != sector {
                self.commit_fat_sector()?;
            }
            if !continues {
                log::debug!("fat16: chain_freed start={} clusters={}", start, visited);
                return Ok(());
            }
            cluster = next;
        }
    }

    /// Last cluster of the chain starting at `first`.
    pub(crate) fn last_in_chain(&mut self, first: u16) -> Result<u16, FatError> {
        let limit = self.part.cluster_count();
        let mut cluster = first;
        let mut visited = 0u32;
        while let Some(next) = self.next_in_chain(cluster)? {
            visited += 1;
            if visited > limit {
                return Err(FatError::BadCluster(next));
            }
            cluster = next;
        }
        Ok(cluster)
    }

    /// Links a fresh cluster behind the file's last cluster and moves the
    /// cursor onto it.
    pub(crate) fn append_cluster(&mut self, file: &mut FileState) -> Result<u16, FatError> {
        let first = self.part.sector_to_cluster(file.first_sector_of_first_cluster);
        let last = self.last_in_chain(first)?;
        let new = self.find_next_free_cluster()?;
        self.write_fat_entry(last, new)?;
        file.first_sector_of_curr_cluster = self.part.cluster_to_sector(new)?;
        file.sector_of_curr_cluster = 0;
        file.byte_of_curr_sector = 0;
        Ok(new)
    }

    pub(crate) fn clear_cluster(&mut self, cluster: u16) -> Result<(), FatError> {
        let first = self.part.cluster_to_sector(cluster)?;
        for sector in first..first + self.part.sectors_per_cluster as u32 {
            self.dev.put_sector(sector, &ZERO_SECTOR)?;
            if self.meta.sector() == Some(sector) {
                self.meta.invalidate();
            }
        }
        Ok(())
    }
}
