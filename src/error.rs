use thiserror::Error;

/// The closed set of error kinds surfaced from the miss-path of `Get`.
///
/// `NotFound` is surfaced straight to callers. The other variants are
/// raised only during cache hydration and carry the mismatched checksums so
/// that the wrapped message downstream reads like
/// `incorrect key crc32 (0xAAAAAAAA != 0xBBBBBBBB)`. I/O failures during
/// `Set`/`Delete` are handled separately: the data and meta stores wrap them
/// with `anyhow::Context` and the worker swallows and retries them rather
/// than surfacing a typed kind to the caller.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found")]
    NotFound,

    #[error("incorrect block crc32 (0x{stored:08X} != 0x{expected:08X})")]
    CorruptBlockCrc { stored: u32, expected: u32 },

    #[error("incorrect key crc32 (0x{actual:08X} != 0x{stored:08X})")]
    CorruptKeyCrc { actual: u32, stored: u32 },

    #[error("incorrect value crc32 (0x{actual:08X} != 0x{stored:08X})")]
    CorruptValueCrc { actual: u32, stored: u32 },

    #[error("short or failed read: {0}")]
    CorruptRead(String),
}
