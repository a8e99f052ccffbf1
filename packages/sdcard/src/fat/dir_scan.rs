use crate::block::BlockDevice;

use super::core::*;
use super::names::ShortName;
use super::volume::Volume;

/// Absolute location of one 32-byte directory slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct DirSlot {
    pub(crate) sector: u32,
    pub(crate) index: u16,
}

/// Decoded short-name directory record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct DirRecord {
    pub(crate) name: ShortName,
    pub(crate) attributes: u8,
    /// DOS time in the low half, date in the high half.
    pub(crate) datetime: u32,
    pub(crate) first_cluster: u16,
    pub(crate) size: u32,
}

impl DirRecord {
    pub(crate) fn decode(raw: &[u8]) -> Self {
        let mut name = [0u8; 11];
        name.copy_from_slice(&raw[..11]);
        Self {
            name: ShortName::from_raw(name),
            attributes: raw[11],
            datetime: u32::from_le_bytes([raw[22], raw[23], raw[24], raw[25]]),
            first_cluster: u16::from_le_bytes([raw[26], raw[27]]),
            size: u32::from_le_bytes([raw[28], raw[29], raw[30], raw[31]]),
        }
    }

    /// Writes the full record. Creation time and FAT32 high-cluster fields
    /// are zeroed.
    pub(crate) fn encode(&self, raw: &mut [u8]) {
        raw[..11].copy_from_slice(self.name.as_bytes());
        raw[11] = self.attributes;
        raw[12..22].fill(0);
        raw[22..26].copy_from_slice(&self.datetime.to_le_bytes());
        raw[26..28].copy_from_slice(&self.first_cluster.to_le_bytes());
        raw[28..32].copy_from_slice(&self.size.to_le_bytes());
    }

    pub(crate) fn is_dir(&self) -> bool {
        (self.attributes & ATTR_SUBDIRECTORY) != 0
    }

    /// Rejects a start cluster the volume cannot hold. Zero is accepted for
    /// an empty regular file and for a ".." pointing at the root.
    pub(crate) fn check_cluster(&self, part: &PartitionInfo) -> Result<(), FatError> {
        let cluster = self.first_cluster;
        let valid = if cluster < FAT16_USED_MIN {
            cluster == 0
                && if self.is_dir() {
                    self.name == ShortName::DOT_DOT
                } else {
                    self.size == 0
                }
        } else {
            cluster <= part.max_cluster()
        };
        if valid {
            Ok(())
        } else {
            Err(FatError::BadCluster(cluster))
        }
    }

    pub(crate) fn info(&self) -> DirEntryInfo {
        DirEntryInfo {
            name: self.name,
            attributes: self.attributes,
            first_cluster: self.first_cluster,
            size: self.size,
            datetime: self.datetime,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct DirMatch {
    pub(crate) slot: DirSlot,
    pub(crate) record: DirRecord,
}

/// Where a directory's slots live.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DirRegion {
    /// Fixed-size area between the FATs and the data area.
    Root,
    /// Cluster chain of a subdirectory, by first cluster.
    Chain(u16),
}

impl DirRegion {
    /// ".." entries store cluster 0 for the root.
    pub(crate) fn from_cluster(cluster: u16) -> Self {
        if cluster < FAT16_USED_MIN {
            Self::Root
        } else {
            Self::Chain(cluster)
        }
    }

    pub(crate) fn cluster(self) -> u16 {
        match self {
            Self::Root => 0,
            Self::Chain(cluster) => cluster,
        }
    }
}

/// Sector-by-sector walk over a directory region.
pub(crate) struct RegionCursor {
    region: DirRegion,
    cluster: u16,
    next_sector: u32,
    clusters_seen: u32,
}

impl RegionCursor {
    pub(crate) fn new(region: DirRegion) -> Self {
        Self {
            region,
            cluster: region.cluster(),
            next_sector: 0,
            clusters_seen: 1,
        }
    }
}

impl<B: BlockDevice> Volume<'_, B> {
    /// Next absolute sector of the region, `None` past its end.
    pub(crate) fn next_region_sector(
        &mut self,
        cursor: &mut RegionCursor,
    ) -> Result<Option<u32>, FatError> {
        match cursor.region {
            DirRegion::Root => {
                if cursor.next_sector >= self.part.root_dir_sectors() {
                    return Ok(None);
                }
                let sector = self.part.first_root_dir_sector + cursor.next_sector;
                cursor.next_sector += 1;
                Ok(Some(sector))
            }
            DirRegion::Chain(_) => {
                if cursor.next_sector >= self.part.sectors_per_cluster as u32 {
                    let Some(next) = self.next_in_chain(cursor.cluster)? else {
                        return Ok(None);
                    };
                    cursor.clusters_seen += 1;
                    if cursor.clusters_seen > self.part.cluster_count() {
                        return Err(FatError::BadCluster(next));
                    }
                    cursor.cluster = next;
                    cursor.next_sector = 0;
                }
                let sector = self.part.cluster_to_sector(cursor.cluster)? + cursor.next_sector;
                cursor.next_sector += 1;
                Ok(Some(sector))
            }
        }
    }

    fn name_matches(&self, stored: &[u8], wanted: &ShortName) -> bool {
        let compared = if self.config.strict_name_match { 11 } else { 10 };
        stored[..compared] == wanted.as_bytes()[..compared]
    }

    /// Finds a live entry named `name` whose attributes satisfy
    /// `attributes & mask == filter`.
    pub(crate) fn find_entry(
        &mut self,
        region: DirRegion,
        name: &ShortName,
        filter: u8,
        mask: u8,
    ) -> Result<Option<DirMatch>, FatError> {
        let mut cursor = RegionCursor::new(region);
        while let Some(sector) = self.next_region_sector(&mut cursor)? {
            self.meta.load(self.dev, sector)?;
            for index in 0..DIR_ENTRIES_PER_SECTOR {
                let raw = self.meta.entry(index);
                if raw[0] == SLOT_EMPTY || raw[0] == SLOT_DELETED {
                    continue;
                }
                if (raw[11] & mask) != filter || !self.name_matches(raw, name) {
                    continue;
                }
                let record = DirRecord::decode(raw);
                record.check_cluster(&self.part)?;
                return Ok(Some(DirMatch {
                    slot: DirSlot {
                        sector,
                        index: index as u16,
                    },
                    record,
                }));
            }
        }
        Ok(None)
    }

    /// First empty or deleted slot of the region.
    pub(crate) fn find_free_slot(
        &mut self,
        region: DirRegion,
    ) -> Result<Option<DirSlot>, FatError> {
        let mut cursor = RegionCursor::new(region);
        while let Some(sector) = self.next_region_sector(&mut cursor)? {
            self.meta.load(self.dev, sector)?;
            for index in 0..DIR_ENTRIES_PER_SECTOR {
                let first = self.meta.entry(index)[0];
                if first == SLOT_EMPTY || first == SLOT_DELETED {
                    return Ok(Some(DirSlot {
                        sector,
                        index: index as u16,
                    }));
                }
            }
        }
        Ok(None)
    }

    /// Visits every live short-name record of the region in on-disk order.
    pub(crate) fn for_each_record(
        &mut self,
        region: DirRegion,
        mut visit: impl FnMut(DirRecord) -> bool,
    ) -> Result<(), FatError> {
        let mut cursor = RegionCursor::new(region);
        while let Some(sector) = self.next_region_sector(&mut cursor)? {
            self.meta.load(self.dev, sector)?;
            for index in 0..DIR_ENTRIES_PER_SECTOR {
                let raw = self.meta.entry(index);
                if raw[0] == SLOT_EMPTY || raw[0] == SLOT_DELETED {
                    continue;
                }
                if (raw[11] & ATTR_VOLUME) != 0 {
                    continue;
                }
                let record = DirRecord::decode(raw);
                if record.name == ShortName::DOT || record.name == ShortName::DOT_DOT {
                    continue;
                }
                if !visit(record) {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    pub(crate) fn write_record(
        &mut self,
        slot: DirSlot,
        record: &DirRecord,
    ) -> Result<(), FatError> {
        self.meta.load(self.dev, slot.sector)?;
        record.encode(self.meta.entry_mut(slot.index as usize));
        self.meta.store(self.dev)
    }

    pub(crate) fn read_record(&mut self, slot: DirSlot) -> Result<DirRecord, FatError> {
        self.meta.load(self.dev, slot.sector)?;
        Ok(DirRecord::decode(self.meta.entry(slot.index as usize)))
    }

    pub(crate) fn mark_deleted(&mut self, slot: DirSlot) -> Result<(), FatError> {
        self.meta.load(self.dev, slot.sector)?;
        self.meta.entry_mut(slot.index as usize)[0] = SLOT_DELETED;
        self.meta.store(self.dev)
    }
}
