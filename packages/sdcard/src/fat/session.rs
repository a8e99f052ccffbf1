use crate::block::BlockDevice;
use crate::config::FatConfig;
use crate::probe::{CardInfo, SdError};
use crate::{MAX_OPEN_FILES, SD_PATH_MAX};

use super::cache::SectorCache;
use super::core::*;
use super::datetime::{dos_timestamp, NoClock, TimeSource};
use super::mount::mount_fat16;
use super::volume::{FileState, Volume};

/// Mounted FAT16 volume plus its pool of `N` file handles.
///
/// Any block-device failure during an operation unmounts the volume: open
/// handles are dropped without touching the medium and every later call
/// fails with [`FatError::NotMounted`] until [`StorageSession::mount`]
/// succeeds again.
pub struct StorageSession<B, T = NoClock, const N: usize = MAX_OPEN_FILES> {
    device: B,
    time: T,
    config: FatConfig,
    card: Option<CardInfo>,
    partition: Option<PartitionInfo>,
    meta: SectorCache,
    files: [FileState; N],
    next_serial: u32,
}

impl<B: BlockDevice, T: TimeSource, const N: usize> StorageSession<B, T, N> {
    pub fn new(device: B, time: T, config: FatConfig) -> Self {
        Self {
            device,
            time,
            config,
            card: None,
            partition: None,
            meta: SectorCache::new(),
            files: core::array::from_fn(|_| FileState::new()),
            next_serial: 0,
        }
    }

    /// Initializes the card and mounts its FAT16 volume. A mounted session
    /// is unmounted first; if that flush fails the error is returned and
    /// the session stays unmounted.
    pub fn mount(&mut self) -> Result<PartitionInfo, FatError> {
        if self.partition.is_some() {
            if let Err(err) = self.unmount() {
                log::warn!("fat16: remount_aborted err={:?}", err);
                return Err(err);
            }
        }
        let result = self.try_mount();
        if let Err(err) = result {
            log::warn!("fat16: mount_failed err={:?}", err);
            self.drop_state();
            self.device.deinit();
        }
        result
    }

    fn try_mount(&mut self) -> Result<PartitionInfo, FatError> {
        let card = self.device.init()?;
        self.card = Some(card);
        self.meta.invalidate();
        let part = mount_fat16(&mut self.device, &mut self.meta.data)?;
        self.meta.invalidate();
        self.partition = Some(part);
        Ok(part)
    }

    /// Flushes and closes every open handle, then releases the card. The
    /// first flush error is returned after the session is torn down.
    pub fn unmount(&mut self) -> Result<(), FatError> {
        let mut first_err = None;
        if let Some(part) = self.partition {
            let stamp = dos_timestamp(self.time.now());
            let mut vol = Volume::new(&mut self.device, part, &mut self.meta, self.config, stamp);
            for file in self.files.iter_mut().filter(|f| f.in_use) {
                if file.mode.is_writing() {
                    if let Err(err) = vol.flush(file) {
                        first_err.get_or_insert(err);
                    }
                }
                file.unlock();
            }
            log::info!("fat16: unmount reason=request");
        }
        self.drop_state();
        self.device.deinit();
        first_err.map_or(Ok(()), Err)
    }

    fn drop_state(&mut self) {
        self.partition = None;
        self.card = None;
        self.meta.invalidate();
        for file in self.files.iter_mut() {
            file.unlock();
        }
    }

    fn fail_fast(&mut self, err: SdError) {
        log::warn!("fat16: unmount reason=io_failure err={:?}", err);
        self.drop_state();
        self.device.deinit();
    }

    fn guard<R>(&mut self, result: Result<R, FatError>) -> Result<R, FatError> {
        if let Err(FatError::Sd(err)) = result {
            self.fail_fast(err);
        }
        result
    }

    fn volume(&mut self) -> Result<(Volume<'_, B>, &mut [FileState; N]), FatError> {
        let part = self.partition.ok_or(FatError::NotMounted)?;
        let stamp = dos_timestamp(self.time.now());
        let vol = Volume::new(&mut self.device, part, &mut self.meta, self.config, stamp);
        Ok((vol, &mut self.files))
    }

    fn slot_of(&self, handle: &FileHandle) -> Result<usize, FatError> {
        if self.partition.is_none() {
            return Err(FatError::NotMounted);
        }
        let slot = handle.slot();
        match self.files.get(slot) {
            Some(file) if file.in_use && file.serial == handle.serial => Ok(slot),
            _ => Err(FatError::StaleHandle),
        }
    }

    fn with_file<R>(
        &mut self,
        handle: &FileHandle,
        op: impl FnOnce(&mut Volume<'_, B>, &mut FileState) -> Result<R, FatError>,
    ) -> Result<R, FatError> {
        let slot = self.slot_of(handle)?;
        let result = {
            let (mut vol, files) = self.volume()?;
            op(&mut vol, &mut files[slot])
        };
        self.guard(result)
    }

    pub fn is_valid(&self) -> bool {
        self.partition.is_some()
    }

    pub fn card_info(&self) -> Option<&CardInfo> {
        self.card.as_ref()
    }

    pub fn partition(&self) -> Option<PartitionInfo> {
        self.partition
    }

    pub fn config(&self) -> FatConfig {
        self.config
    }

    pub fn device(&self) -> &B {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut B {
        &mut self.device
    }

    pub fn time_source_mut(&mut self) -> &mut T {
        &mut self.time
    }

    pub fn open_count(&self) -> usize {
        self.files.iter().filter(|f| f.in_use).count()
    }

    /// Opens `path`. Writing modes create the file and any missing parent
    /// directories.
    pub fn open(&mut self, path: &str, mode: OpenMode) -> Result<FileHandle, FatError> {
        if self.partition.is_none() {
            return Err(FatError::NotMounted);
        }
        if path.len() > SD_PATH_MAX {
            return Err(FatError::InvalidName);
        }
        self.next_serial = self.next_serial.wrapping_add(1);
        let serial = self.next_serial;
        let result = {
            let (mut vol, files) = self.volume()?;
            open_in(&mut vol, files, path.as_bytes(), mode, serial)
        };
        let slot = self.guard(result)?;
        log::debug!("fat16: open path={} mode={:?} slot={}", path, mode, slot);
        Ok(FileHandle {
            slot: slot as u8,
            serial,
        })
    }

    /// Flushes a writing handle and returns its slot to the pool. The handle
    /// is consumed even when this fails.
    pub fn close(&mut self, handle: FileHandle) -> Result<(), FatError> {
        self.with_file(&handle, |vol, file| {
            let result = if file.mode.is_writing() {
                vol.flush(file)
            } else {
                Ok(())
            };
            file.unlock();
            result
        })
    }

    /// True when `path` names an existing regular file.
    pub fn exists(&mut self, path: &str) -> bool {
        let result = match self.volume() {
            Ok((mut vol, _)) => vol.find_file(path.as_bytes()),
            Err(_) => return false,
        };
        matches!(self.guard(result), Ok(Some(_)))
    }

    pub fn flush(&mut self, handle: &FileHandle) -> Result<(), FatError> {
        self.with_file(handle, |vol, file| vol.flush(file))
    }

    pub fn seek(
        &mut self,
        handle: &FileHandle,
        offset: i32,
        origin: SeekOrigin,
    ) -> Result<(), FatError> {
        self.with_file(handle, |vol, file| vol.seek(file, offset, origin))
    }

    /// Next byte, or `None` at end of file.
    pub fn read_byte(&mut self, handle: &FileHandle) -> Result<Option<u8>, FatError> {
        self.with_file(handle, |vol, file| vol.read_byte(file))
    }

    pub fn write_byte(&mut self, handle: &FileHandle, byte: u8) -> Result<(), FatError> {
        self.with_file(handle, |vol, file| vol.write_byte(file, byte))
    }

    /// Reads up to `count` objects of `elem_size` bytes into `buf` and
    /// returns how many whole objects were read.
    pub fn read(
        &mut self,
        handle: &FileHandle,
        buf: &mut [u8],
        elem_size: usize,
        count: usize,
    ) -> usize {
        let Some(total) = object_bytes(buf.len(), elem_size, count) else {
            return 0;
        };
        match self.with_file(handle, |vol, file| Ok(vol.read_bytes(file, &mut buf[..total]))) {
            Ok((done, result)) => {
                let _ = self.guard(result);
                done / elem_size
            }
            Err(_) => 0,
        }
    }

    /// Writes up to `count` objects of `elem_size` bytes from `buf` and
    /// returns how many whole objects were written.
    pub fn write(
        &mut self,
        handle: &FileHandle,
        buf: &[u8],
        elem_size: usize,
        count: usize,
    ) -> usize {
        let Some(total) = object_bytes(buf.len(), elem_size, count) else {
            return 0;
        };
        match self.with_file(handle, |vol, file| Ok(vol.write_bytes(file, &buf[..total]))) {
            Ok((done, result)) => {
                let _ = self.guard(result);
                done / elem_size
            }
            Err(_) => 0,
        }
    }

    /// Writes all of `data` or reports the error that stopped it.
    pub fn write_all(&mut self, handle: &FileHandle, data: &[u8]) -> Result<(), FatError> {
        self.with_file(handle, |vol, file| vol.write_bytes(file, data).1)
    }

    pub fn write_str(&mut self, handle: &FileHandle, text: &str) -> Result<(), FatError> {
        self.write_all(handle, text.as_bytes())
    }

    /// Reads one line into `buf`, dropping the newline and NUL-terminating
    /// the buffer. At most `buf.len() - 1` bytes are stored. Returns `None`
    /// when the file ended before any byte was read.
    pub fn read_line<'b>(
        &mut self,
        handle: &FileHandle,
        buf: &'b mut [u8],
    ) -> Result<Option<&'b [u8]>, FatError> {
        let Some(limit) = buf.len().checked_sub(1) else {
            return Ok(None);
        };
        let mut len = 0usize;
        let mut read_any = false;
        while len < limit {
            match self.read_byte(handle)? {
                None => break,
                Some(b'\n') => {
                    read_any = true;
                    break;
                }
                Some(byte) => {
                    buf[len] = byte;
                    len += 1;
                    read_any = true;
                }
            }
        }
        buf[len] = 0;
        Ok(read_any.then_some(&buf[..len]))
    }

    pub fn is_eof(&self, handle: &FileHandle) -> Result<bool, FatError> {
        let file = &self.files[self.slot_of(handle)?];
        Ok(file.position + 1 >= file.size)
    }

    pub fn position(&self, handle: &FileHandle) -> Result<u32, FatError> {
        Ok(self.files[self.slot_of(handle)?].position)
    }

    pub fn size(&self, handle: &FileHandle) -> Result<u32, FatError> {
        Ok(self.files[self.slot_of(handle)?].size)
    }

    pub fn mode(&self, handle: &FileHandle) -> Result<OpenMode, FatError> {
        Ok(self.files[self.slot_of(handle)?].mode)
    }

    /// Deletes a regular file that is not currently open.
    pub fn remove(&mut self, path: &str) -> Result<(), FatError> {
        let result = {
            let (mut vol, files) = self.volume()?;
            match vol.find_any(path.as_bytes()) {
                Ok(Some(found)) if files.iter().any(|f| f.in_use && f.dir_slot == found.slot) => {
                    Err(FatError::InUse)
                }
                Ok(Some(found)) => vol.remove_file(&found),
                Ok(None) => Err(FatError::NotFound),
                Err(err) => Err(err),
            }
        };
        self.guard(result)
    }

    /// Creates a directory and any missing parents.
    pub fn mkdir(&mut self, path: &str) -> Result<(), FatError> {
        let result = {
            let (mut vol, _) = self.volume()?;
            vol.make_dir(path.as_bytes()).map(|_| ())
        };
        self.guard(result)
    }

    /// Lists the entries of the directory at `path` ("/" for the root) into
    /// `out` and returns how many were filled.
    pub fn read_dir(&mut self, path: &str, out: &mut [DirEntryInfo]) -> Result<usize, FatError> {
        let result = {
            let (mut vol, _) = self.volume()?;
            vol.list_dir(path.as_bytes(), out)
        };
        self.guard(result)
    }
}

fn object_bytes(available: usize, elem_size: usize, count: usize) -> Option<usize> {
    if elem_size == 0 {
        return None;
    }
    let wanted = elem_size.checked_mul(count).unwrap_or(usize::MAX);
    let whole = available / elem_size * elem_size;
    Some(wanted.min(whole))
}

fn open_in<B: BlockDevice>(
    vol: &mut Volume<'_, B>,
    files: &mut [FileState],
    path: &[u8],
    mode: OpenMode,
    serial: u32,
) -> Result<usize, FatError> {
    let slot = files
        .iter()
        .position(|f| !f.in_use)
        .ok_or(FatError::NoFreeHandle)?;
    if let Some(found) = vol.find_any(path)? {
        let conflict = files.iter().any(|f| {
            f.in_use && f.dir_slot == found.slot && (mode.is_writing() || f.mode.is_writing())
        });
        if conflict {
            return Err(FatError::InUse);
        }
    }

    let file = &mut files[slot];
    file.lock(serial, mode);
    if let Err(err) = vol.open_file(path, mode, file) {
        file.unlock();
        return Err(err);
    }
    Ok(slot)
}
