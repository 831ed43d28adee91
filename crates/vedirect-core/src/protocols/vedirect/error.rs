use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("checksum mismatch: byte sum {sum} mod 256, dropped {discarded_fields} pending fields")]
    ChecksumMismatch { sum: u8, discarded_fields: usize },
    #[error("field longer than {limit} bytes, dropped {discarded_fields} pending fields")]
    FieldTooLong { limit: usize, discarded_fields: usize },
}
