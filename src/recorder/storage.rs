use sdcard::{
    BlockDevice, DateTime, FatError, FileHandle, OpenMode, StorageSession, TimeSource,
};

/// File operations the recorder needs from the storage stack.
pub trait LogStorage {
    type Handle;

    fn is_valid(&self) -> bool;
    fn mount(&mut self) -> Result<(), FatError>;
    fn wall_clock(&mut self) -> Option<DateTime>;
    fn exists(&mut self, path: &str) -> bool;
    /// Opens for appending, creating the file and its directories.
    fn open_append(&mut self, path: &str) -> Result<Self::Handle, FatError>;
    fn append(&mut self, handle: &Self::Handle, data: &[u8]) -> Result<(), FatError>;
    fn flush(&mut self, handle: &Self::Handle) -> Result<(), FatError>;
    fn close(&mut self, handle: Self::Handle) -> Result<(), FatError>;
}

impl<B: BlockDevice, T: TimeSource, const N: usize> LogStorage for StorageSession<B, T, N> {
    type Handle = FileHandle;

    fn is_valid(&self) -> bool {
        StorageSession::is_valid(self)
    }

    fn mount(&mut self) -> Result<(), FatError> {
        StorageSession::mount(self).map(|_| ())
    }

    fn wall_clock(&mut self) -> Option<DateTime> {
        self.time_source_mut().now()
    }

    fn exists(&mut self, path: &str) -> bool {
        StorageSession::exists(self, path)
    }

    fn open_append(&mut self, path: &str) -> Result<FileHandle, FatError> {
        self.open(path, OpenMode::Append)
    }

    fn append(&mut self, handle: &FileHandle, data: &[u8]) -> Result<(), FatError> {
        self.write_all(handle, data)
    }

    fn flush(&mut self, handle: &FileHandle) -> Result<(), FatError> {
        StorageSession::flush(self, handle)
    }

    fn close(&mut self, handle: FileHandle) -> Result<(), FatError> {
        StorageSession::close(self, handle)
    }
}
