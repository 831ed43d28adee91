use super::layout;

/// Running byte sum over a checksum cycle, kept reduced mod 256.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ByteSum {
    sum: u16,
}

impl ByteSum {
    pub fn add(&mut self, byte: u8) {
        self.sum = (self.sum + byte as u16) % layout::CHECKSUM_MODULUS;
    }

    pub fn value(&self) -> u8 {
        self.sum as u8
    }

    pub fn is_valid(&self) -> bool {
        self.sum == 0
    }

    pub fn reset(&mut self) {
        self.sum = 0;
    }
}

/// Byte buffer for an in-progress key or value.
#[derive(Debug, Default, Clone)]
pub struct FieldBuffer {
    bytes: Vec<u8>,
}

impl FieldBuffer {
    pub fn push(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_full(&self) -> bool {
        self.bytes.len() >= layout::MAX_FIELD_LEN
    }

    pub fn is_checksum_key(&self) -> bool {
        self.bytes == layout::CHECKSUM_KEY
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Takes the buffered bytes as text; non-ASCII noise is replaced, never rejected.
    pub fn take_string(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.bytes).into_owned();
        self.bytes.clear();
        text
    }
}

pub(crate) fn is_hex_marker(byte: u8) -> bool {
    byte == layout::HEX_MARKER
}
