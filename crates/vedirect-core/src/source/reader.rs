use std::io::{BufReader, ErrorKind, Read};

use super::{ByteSource, SourceError};

const BUFFER_SIZE: usize = 4 * 1024;

/// Byte source over any `Read`, such as a file or an open serial port.
///
/// Timeouts end the current read attempt (`Ok(None)`) rather than failing, so
/// a quiet link looks the same as an exhausted one to the caller.
pub struct ReaderSource<R: Read> {
    inner: BufReader<R>,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::with_capacity(BUFFER_SIZE, inner),
        }
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn next_byte(&mut self) -> Result<Option<u8>, SourceError> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return Ok(None);
                }
                Err(err) => return Err(SourceError::Io(err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor, Read};

    use super::ReaderSource;
    use crate::source::{ByteSource, SourceError};

    struct Scripted {
        steps: Vec<io::Result<u8>>,
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.steps.is_empty() {
                return Ok(0);
            }
            match self.steps.remove(0) {
                Ok(byte) => {
                    buf[0] = byte;
                    Ok(1)
                }
                Err(err) => Err(err),
            }
        }
    }

    #[test]
    fn reads_bytes_then_end() {
        let mut source = ReaderSource::new(Cursor::new(b"V\t".to_vec()));
        assert_eq!(source.next_byte().unwrap(), Some(b'V'));
        assert_eq!(source.next_byte().unwrap(), Some(b'\t'));
        assert_eq!(source.next_byte().unwrap(), None);
    }

    #[test]
    fn timeout_ends_attempt_and_interrupt_retries() {
        let mut source = ReaderSource::new(Scripted {
            steps: vec![
                Err(io::Error::from(io::ErrorKind::Interrupted)),
                Ok(b'\r'),
                Err(io::Error::from(io::ErrorKind::TimedOut)),
                Ok(b'\n'),
            ],
        });
        assert_eq!(source.next_byte().unwrap(), Some(b'\r'));
        assert_eq!(source.next_byte().unwrap(), None);
        assert_eq!(source.next_byte().unwrap(), Some(b'\n'));
    }

    #[test]
    fn other_errors_propagate() {
        let mut source = ReaderSource::new(Scripted {
            steps: vec![Err(io::Error::from(io::ErrorKind::BrokenPipe))],
        });
        let err = source.next_byte().unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
    }
}
