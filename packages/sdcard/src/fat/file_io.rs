use crate::block::BlockDevice;
use crate::probe::SECTOR_SIZE;

use super::core::*;
use super::dir_scan::DirMatch;
use super::volume::{FileState, Volume};

impl<B: BlockDevice> Volume<'_, B> {
    /// Attaches a freshly locked `file` to `path` according to `mode`.
    pub(crate) fn open_file(
        &mut self,
        path: &[u8],
        mode: OpenMode,
        file: &mut FileState,
    ) -> Result<(), FatError> {
        let Some(mut found) = self.find_any(path)? else {
            if mode == OpenMode::Read {
                return Err(FatError::NotFound);
            }
            let created = self.file_create(path, ATTR_ARCHIVE)?;
            file.attach(&created, &self.part)?;
            return Ok(());
        };
        if found.record.is_dir() {
            return Err(FatError::IsDirectory);
        }
        if mode.is_writing() && (found.record.attributes & ATTR_READONLY) != 0 {
            return Err(FatError::ReadOnly);
        }

        match mode {
            OpenMode::Read => file.attach(&found, &self.part)?,
            OpenMode::Append => {
                if found.record.first_cluster < FAT16_USED_MIN {
                    self.replace_chain(&mut found)?;
                }
                file.attach(&found, &self.part)?;
                self.seek_to(file, found.record.size)?;
            }
            OpenMode::Write => {
                self.delete_cluster_chain(found.record.first_cluster)?;
                self.replace_chain(&mut found)?;
                file.attach(&found, &self.part)?;
            }
        }
        Ok(())
    }

    /// Points the entry at a fresh single-cluster chain with size 0.
    fn replace_chain(&mut self, found: &mut DirMatch) -> Result<(), FatError> {
        let cluster = self.find_next_free_cluster()?;
        self.update_entry(found.slot, cluster, 0)?;
        found.record.first_cluster = cluster;
        found.record.size = 0;
        Ok(())
    }

    /// Places the cursor on byte `target`, which must not exceed the size.
    pub(crate) fn seek_to(&mut self, file: &mut FileState, target: u32) -> Result<(), FatError> {
        file.rewind();
        let cluster_bytes = self.part.cluster_bytes();
        let mut remaining = target;
        while remaining >= cluster_bytes {
            if self.get_next_cluster(file)?.is_none() {
                if remaining != cluster_bytes {
                    let cluster = self.part.sector_to_cluster(file.first_sector_of_curr_cluster);
                    return Err(FatError::BadCluster(cluster));
                }
                file.sector_of_curr_cluster = self.part.sectors_per_cluster as u32 - 1;
                file.byte_of_curr_sector = SECTOR_SIZE as u32;
                file.position = target;
                return Ok(());
            }
            remaining -= cluster_bytes;
        }
        file.sector_of_curr_cluster = remaining / SECTOR_SIZE as u32;
        file.byte_of_curr_sector = remaining % SECTOR_SIZE as u32;
        file.position = target;
        Ok(())
    }

    pub(crate) fn seek(
        &mut self,
        file: &mut FileState,
        offset: i32,
        origin: SeekOrigin,
    ) -> Result<(), FatError> {
        let base = match origin {
            SeekOrigin::Start => 0,
            SeekOrigin::Current => file.position as i64,
            SeekOrigin::End => file.size as i64,
        };
        let target = base + offset as i64;
        if target < 0 {
            return Err(FatError::SeekOutOfRange);
        }
        if target > file.size as i64 {
            self.seek_to(file, file.size)?;
            return Err(FatError::SeekOutOfRange);
        }
        self.seek_to(file, target as u32)
    }

    /// Moves past a fully consumed sector. At the end of the chain the
    /// cursor stays parked on byte 512 of the last sector.
    fn step_cursor(&mut self, file: &mut FileState) -> Result<(), FatError> {
        if file.sector_of_curr_cluster + 1 < self.part.sectors_per_cluster as u32 {
            file.sector_of_curr_cluster += 1;
            file.byte_of_curr_sector = 0;
            return Ok(());
        }
        self.get_next_cluster(file)?;
        Ok(())
    }

    pub(crate) fn read_byte(&mut self, file: &mut FileState) -> Result<Option<u8>, FatError> {
        if file.position >= file.size {
            return Ok(None);
        }
        if file.at_sector_end() {
            let cluster = self.part.sector_to_cluster(file.first_sector_of_curr_cluster);
            return Err(FatError::BadCluster(cluster));
        }
        file.cache.load(self.dev, file.current_sector())?;
        let byte = file.cache.data[file.byte_of_curr_sector as usize];
        file.byte_of_curr_sector += 1;
        file.position += 1;
        if file.at_sector_end() {
            self.step_cursor(file)?;
        }
        Ok(Some(byte))
    }

    pub(crate) fn write_byte(&mut self, file: &mut FileState, byte: u8) -> Result<(), FatError> {
        if !file.mode.is_writing() {
            return Err(FatError::WrongMode);
        }
        if file.at_sector_end() {
            self.append_cluster(file)?;
        }
        let sector = file.current_sector();
        if file.position >= file.size && file.byte_of_curr_sector == 0 {
            file.cache.load_zeroed(self.dev, sector)?;
        } else {
            file.cache.load(self.dev, sector)?;
        }
        file.cache.data[file.byte_of_curr_sector as usize] = byte;
        file.cache.mark_dirty();
        file.byte_of_curr_sector += 1;
        file.position += 1;
        file.size = file.size.max(file.position);
        if file.at_sector_end() {
            self.step_cursor(file)?;
        }
        Ok(())
    }

    /// Reads until `buf` is full or the file ends. Returns the byte count
    /// together with the error that stopped it early, if any.
    pub(crate) fn read_bytes(
        &mut self,
        file: &mut FileState,
        buf: &mut [u8],
    ) -> (usize, Result<(), FatError>) {
        for (done, slot) in buf.iter_mut().enumerate() {
            match self.read_byte(file) {
                Ok(Some(byte)) => *slot = byte,
                Ok(None) => return (done, Ok(())),
                Err(err) => return (done, Err(err)),
            }
        }
        (buf.len(), Ok(()))
    }

    pub(crate) fn write_bytes(
        &mut self,
        file: &mut FileState,
        data: &[u8],
    ) -> (usize, Result<(), FatError>) {
        for (done, &byte) in data.iter().enumerate() {
            if let Err(err) = self.write_byte(file, byte) {
                return (done, Err(err));
            }
        }
        (data.len(), Ok(()))
    }

    /// Persists buffered data, then the entry's size and timestamp.
    pub(crate) fn flush(&mut self, file: &mut FileState) -> Result<(), FatError> {
        if !file.mode.is_writing() {
            return Err(FatError::WrongMode);
        }
        file.cache.write_back(self.dev)?;
        let first_cluster = self.part.sector_to_cluster(file.first_sector_of_first_cluster);
        self.update_entry(file.dir_slot, first_cluster, file.size)
    }
}
