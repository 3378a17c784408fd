//! The fixed-size index record persisted in the meta file.
//!
//! Eight big-endian `u32` fields, 32 bytes total, no padding. See
//! [`Block::encode`]/[`Block::decode`] for the exact layout.

use bytes::{Buf, BufMut};

pub(crate) const BLOCK_VERSION: u32 = 0x0102_0304;
pub(crate) const BLOCK_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub version: u32,
    pub key_offset: u32,
    pub key_length: u32,
    pub key_crc32: u32,
    pub value_offset: u32,
    pub value_length: u32,
    pub value_crc32: u32,
    pub crc32: u32,
}

impl Block {
    pub fn new(
        key_offset: u32,
        key_length: u32,
        key_crc32: u32,
        value_offset: u32,
        value_length: u32,
        value_crc32: u32,
    ) -> Self {
        let mut b = Self {
            version: BLOCK_VERSION,
            key_offset,
            key_length,
            key_crc32,
            value_offset,
            value_length,
            value_crc32,
            crc32: 0,
        };
        b.crc32 = b.calculate_crc32();
        b
    }

    /// CRC32 over the 32-byte encoding with the `crc32` field zeroed.
    pub fn calculate_crc32(&self) -> u32 {
        let mut zeroed = *self;
        zeroed.crc32 = 0;
        crc32fast::hash(&zeroed.encode())
    }

    pub fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = Vec::with_capacity(BLOCK_SIZE);
        buf.put_u32(self.version);
        buf.put_u32(self.key_offset);
        buf.put_u32(self.key_length);
        buf.put_u32(self.key_crc32);
        buf.put_u32(self.value_offset);
        buf.put_u32(self.value_length);
        buf.put_u32(self.value_crc32);
        buf.put_u32(self.crc32);
        buf.try_into().expect("block encodes to exactly 32 bytes")
    }

    pub fn decode(mut data: &[u8]) -> Self {
        assert_eq!(data.len(), BLOCK_SIZE, "block must be exactly 32 bytes");
        Self {
            version: data.get_u32(),
            key_offset: data.get_u32(),
            key_length: data.get_u32(),
            key_crc32: data.get_u32(),
            value_offset: data.get_u32(),
            value_length: data.get_u32(),
            value_crc32: data.get_u32(),
            crc32: data.get_u32(),
        }
    }
}
