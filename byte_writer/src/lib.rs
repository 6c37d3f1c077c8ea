//! Append-only byte buffer for building sprite blocks.
//!
//! Sprite headers are single bytes and palette words are big-endian, so
//! unlike a general purpose writer this one only knows about `u8` and
//! big-endian `u16`.

pub struct ByteWriter {
    pub data: Vec<u8>,
    offset: usize,
}

impl Default for ByteWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteWriter {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            offset: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            offset: 0,
        }
    }

    fn offset(&mut self, offset: usize) {
        self.offset += offset;
    }

    pub fn append_u8(&mut self, i: u8) {
        self.data.push(i);
        self.offset(1);
    }

    pub fn append_be_u16(&mut self, i: u16) {
        self.data.extend(i.to_be_bytes());
        self.offset(2);
    }

    pub fn append_u8_slice(&mut self, i: &[u8]) {
        self.data.extend_from_slice(i);
        self.offset(i.len());
    }

    /// Pads with `value` until `len` bytes have been written.
    pub fn pad_to(&mut self, len: usize, value: u8) {
        if self.offset < len {
            let missing = len - self.offset;
            self.data.resize(self.data.len() + missing, value);
            self.offset(missing);
        }
    }
}
