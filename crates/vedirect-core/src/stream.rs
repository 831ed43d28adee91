use serde::{Deserialize, Serialize};

use crate::protocols::vedirect::{Frame, FrameDecoder};
use crate::source::{ByteSource, SourceError};

/// A frame together with the stream offset of the byte that completed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedFrame {
    /// Zero-based offset of the checksum byte that closed the frame.
    pub end_offset: u64,
    /// Decoded fields in arrival order.
    pub fields: Frame,
}

/// Pulls bytes from a [`ByteSource`] through a [`FrameDecoder`].
///
/// # Examples
/// ```
/// use std::io::Cursor;
///
/// use vedirect_core::{FrameReader, ReaderSource};
///
/// let mut reader = FrameReader::new(ReaderSource::new(Cursor::new(b"\r\nV\t1".to_vec())));
/// assert!(reader.next_frame()?.is_none());
/// assert_eq!(reader.offset(), 5);
/// # Ok::<(), vedirect_core::SourceError>(())
/// ```
pub struct FrameReader<S> {
    source: S,
    decoder: FrameDecoder,
    offset: u64,
}

impl<S: ByteSource> FrameReader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            decoder: FrameDecoder::new(),
            offset: 0,
        }
    }

    /// Reads until a frame completes or the source has nothing more to give.
    ///
    /// Decoder state survives a `None`, so a frame split across two read
    /// attempts is still recovered on the next call.
    pub fn next_frame(&mut self) -> Result<Option<DecodedFrame>, SourceError> {
        while let Some(byte) = self.source.next_byte()? {
            let end_offset = self.offset;
            self.offset += 1;
            if let Some(fields) = self.decoder.feed(byte) {
                return Ok(Some(DecodedFrame { end_offset, fields }));
            }
        }
        Ok(None)
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }
}

impl<S: ByteSource> Iterator for FrameReader<S> {
    type Item = Result<DecodedFrame, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}
