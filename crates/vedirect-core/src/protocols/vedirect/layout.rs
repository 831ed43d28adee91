pub const HEADER_CR: u8 = b'\r';
pub const HEADER_LF: u8 = b'\n';
pub const DELIMITER: u8 = b'\t';
pub const HEX_MARKER: u8 = b':';

/// Longest key or value kept before the cycle is treated as line noise.
pub const MAX_FIELD_LEN: usize = 128;

pub const CHECKSUM_KEY: &[u8] = b"Checksum";
pub const CHECKSUM_MODULUS: u16 = 256;
