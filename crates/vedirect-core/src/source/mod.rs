mod capture;
mod reader;

pub use capture::CaptureFileSource;
pub use reader::ReaderSource;

use thiserror::Error;

/// Supplies the decoder with bytes, one at a time.
///
/// `Ok(None)` means the source has nothing more for this read attempt: end of
/// file for captures, a read timeout for live ports.
pub trait ByteSource {
    fn next_byte(&mut self) -> Result<Option<u8>, SourceError>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn next_byte(&mut self) -> Result<Option<u8>, SourceError> {
        (**self).next_byte()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn next_byte(&mut self) -> Result<Option<u8>, SourceError> {
        (**self).next_byte()
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
