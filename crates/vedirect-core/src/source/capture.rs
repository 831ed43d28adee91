use std::fs::File;
use std::path::Path;

use super::{ByteSource, ReaderSource, SourceError};

/// Raw byte capture of a VE.Direct link stored on disk.
pub struct CaptureFileSource {
    inner: ReaderSource<File>,
    len: u64,
}

impl CaptureFileSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            inner: ReaderSource::new(file),
            len,
        })
    }

    /// Capture size in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl ByteSource for CaptureFileSource {
    fn next_byte(&mut self) -> Result<Option<u8>, SourceError> {
        self.inner.next_byte()
    }
}
