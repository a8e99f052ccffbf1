use crate::block::BlockDevice;

use super::core::*;
use super::dir_scan::{DirMatch, DirRecord, DirRegion, DirSlot};
use super::names::{is_path_end, separate_dir_name, ShortName};
use super::volume::Volume;

const DIR_FILTER: u8 = ATTR_SUBDIRECTORY;
const DIR_MASK: u8 = ATTR_SUBDIRECTORY | ATTR_VOLUME;
const FILE_FILTER: u8 = ATTR_NONE;
const ANY_MASK: u8 = ATTR_VOLUME;

/// Directory holding the final path segment, plus that segment's name.
pub(crate) struct ParentDir {
    pub(crate) region: DirRegion,
    pub(crate) name: ShortName,
}

impl<B: BlockDevice> Volume<'_, B> {
    /// Walks every intermediate segment of `path`. Missing directories are
    /// created when `create_missing` is set.
    pub(crate) fn resolve_parent(
        &mut self,
        path: &[u8],
        create_missing: bool,
    ) -> Result<ParentDir, FatError> {
        let mut region = DirRegion::Root;
        let mut rest = path;
        loop {
            let (name, tail) = separate_dir_name(rest)?;
            if is_path_end(tail) {
                return Ok(ParentDir { region, name });
            }
            rest = tail;

            if let Some(found) = self.find_entry(region, &name, DIR_FILTER, DIR_MASK)? {
                region = DirRegion::from_cluster(found.record.first_cluster);
                continue;
            }
            if self.find_entry(region, &name, FILE_FILTER, DIR_MASK)?.is_some() {
                return Err(FatError::NotDirectory);
            }
            if !create_missing {
                return Err(FatError::NotFound);
            }
            let created = self.create_directory_entry(region, name, ATTR_SUBDIRECTORY)?;
            region = DirRegion::Chain(created.record.first_cluster);
        }
    }

    /// Looks up `path` with the final segment restricted by `filter`/`mask`.
    pub(crate) fn file_exist(
        &mut self,
        path: &[u8],
        filter: u8,
        mask: u8,
    ) -> Result<Option<DirMatch>, FatError> {
        let parent = match self.resolve_parent(path, false) {
            Ok(parent) => parent,
            Err(FatError::NotFound) => return Ok(None),
            Err(err) => return Err(err),
        };
        self.find_entry(parent.region, &parent.name, filter, mask)
    }

    pub(crate) fn find_file(&mut self, path: &[u8]) -> Result<Option<DirMatch>, FatError> {
        self.file_exist(path, FILE_FILTER, DIR_MASK)
    }

    /// Any live entry, file or directory.
    pub(crate) fn find_any(&mut self, path: &[u8]) -> Result<Option<DirMatch>, FatError> {
        self.file_exist(path, ATTR_NONE, ANY_MASK)
    }

    /// Creates `path` (and its missing parents) with `attributes`. Fails
    /// when the name is already taken.
    pub(crate) fn file_create(
        &mut self,
        path: &[u8],
        attributes: u8,
    ) -> Result<DirMatch, FatError> {
        let parent = self.resolve_parent(path, true)?;
        if let Some(existing) = self.find_entry(parent.region, &parent.name, ATTR_NONE, ANY_MASK)? {
            let wants_file = (attributes & ATTR_SUBDIRECTORY) == 0;
            return Err(if existing.record.is_dir() && wants_file {
                FatError::IsDirectory
            } else {
                FatError::AlreadyExists
            });
        }
        self.create_directory_entry(parent.region, parent.name, attributes)
    }

    /// Allocates the entry's first cluster, then a slot in `region`. A
    /// subdirectory gets a zeroed cluster seeded with "." and "..".
    pub(crate) fn create_directory_entry(
        &mut self,
        region: DirRegion,
        name: ShortName,
        attributes: u8,
    ) -> Result<DirMatch, FatError> {
        let cluster = self.find_next_free_cluster()?;
        let slot = match self.free_or_extended_slot(region) {
            Ok(slot) => slot,
            Err(err) => {
                if !matches!(err, FatError::Sd(_)) {
                    self.delete_cluster_chain(cluster)?;
                }
                return Err(err);
            }
        };

        let record = DirRecord {
            name,
            attributes,
            datetime: self.stamp,
            first_cluster: cluster,
            size: 0,
        };
        if record.is_dir() {
            self.seed_directory(cluster, region.cluster())?;
        }
        self.write_record(slot, &record)?;
        log::debug!(
            "fat16: entry_created name={} cluster={} dir={}",
            name.display(),
            cluster,
            record.is_dir()
        );
        Ok(DirMatch { slot, record })
    }

    fn free_or_extended_slot(&mut self, region: DirRegion) -> Result<DirSlot, FatError> {
        if let Some(slot) = self.find_free_slot(region)? {
            return Ok(slot);
        }
        match region {
            DirRegion::Root => Err(FatError::DirectoryFull),
            DirRegion::Chain(first) => self.extend_directory(first),
        }
    }

    /// Appends a zeroed cluster to a subdirectory chain and returns its
    /// first slot.
    pub(crate) fn extend_directory(&mut self, first: u16) -> Result<DirSlot, FatError> {
        let last = self.last_in_chain(first)?;
        let new = self.find_next_free_cluster()?;
        self.clear_cluster(new)?;
        self.write_fat_entry(last, new)?;
        log::debug!("fat16: dir_extended first={} new={}", first, new);
        Ok(DirSlot {
            sector: self.part.cluster_to_sector(new)?,
            index: 0,
        })
    }

    fn seed_directory(&mut self, cluster: u16, parent: u16) -> Result<(), FatError> {
        self.clear_cluster(cluster)?;
        let sector = self.part.cluster_to_sector(cluster)?;
        let dot = DirRecord {
            name: ShortName::DOT,
            attributes: ATTR_SUBDIRECTORY,
            datetime: self.stamp,
            first_cluster: cluster,
            size: 0,
        };
        let dot_dot = DirRecord {
            name: ShortName::DOT_DOT,
            first_cluster: parent,
            ..dot
        };
        self.write_record(DirSlot { sector, index: 0 }, &dot)?;
        self.write_record(DirSlot { sector, index: 1 }, &dot_dot)
    }

    /// Rewrites the allocation fields of an existing entry.
    pub(crate) fn update_entry(
        &mut self,
        slot: DirSlot,
        first_cluster: u16,
        size: u32,
    ) -> Result<(), FatError> {
        let mut record = self.read_record(slot)?;
        record.first_cluster = first_cluster;
        record.size = size;
        record.datetime = self.stamp;
        self.write_record(slot, &record)
    }

    /// Frees a file's chain and marks its entry deleted.
    pub(crate) fn remove_file(&mut self, found: &DirMatch) -> Result<(), FatError> {
        if found.record.is_dir() {
            return Err(FatError::IsDirectory);
        }
        if (found.record.attributes & ATTR_READONLY) != 0 {
            return Err(FatError::ReadOnly);
        }
        self.delete_cluster_chain(found.record.first_cluster)?;
        self.mark_deleted(found.slot)?;
        log::debug!("fat16: removed name={}", found.record.name.display());
        Ok(())
    }

    /// Creates `path` as a directory along with its missing parents.
    pub(crate) fn make_dir(&mut self, path: &[u8]) -> Result<DirMatch, FatError> {
        self.file_create(path, ATTR_SUBDIRECTORY)
    }

    /// Fills `out` with the live entries of the directory at `path`; an
    /// empty path or "/" lists the root.
    pub(crate) fn list_dir(
        &mut self,
        path: &[u8],
        out: &mut [DirEntryInfo],
    ) -> Result<usize, FatError> {
        let region = if is_path_end(path) {
            DirRegion::Root
        } else {
            match self.file_exist(path, DIR_FILTER, DIR_MASK)? {
                Some(found) => DirRegion::from_cluster(found.record.first_cluster),
                None if self.find_file(path)?.is_some() => return Err(FatError::NotDirectory),
                None => return Err(FatError::NotFound),
            }
        };

        let mut filled = 0usize;
        self.for_each_record(region, |record| {
            if filled >= out.len() {
                return false;
            }
            out[filled] = record.info();
            filled += 1;
            filled < out.len()
        })?;
        Ok(filled)
    }
}
