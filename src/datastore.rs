//! Append-only byte log holding raw key and value payloads.
//!
//! Framing lives entirely in the meta store; the data file is an
//! unstructured stream. A single mutex serializes the seek/write/seek/write
//! sequence of `write_key_value` against other writers and against readers,
//! since both share the file cursor.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use anyhow::{Context, Result};
use parking_lot::Mutex;

pub struct DataStore {
    file: Mutex<File>,
}

impl DataStore {
    pub fn new(file: File) -> Self {
        Self {
            file: Mutex::new(file),
        }
    }

    /// Appends `key` then `value`, fsyncs, and returns their byte offsets.
    ///
    /// No rollback is attempted on a mid-sequence failure: the next
    /// successful append simply creates a new trailing record and any
    /// partial bytes already written become unreferenced.
    pub fn write_key_value(&self, key: &str, value: &str) -> Result<(u32, u32)> {
        let mut file = self.file.lock();

        let key_offset = file.seek(SeekFrom::End(0)).context("seek (key)")?;
        file.write_all(key.as_bytes()).context("write (key)")?;

        let value_offset = file.seek(SeekFrom::Current(0)).context("seek (value)")?;
        file.write_all(value.as_bytes()).context("write (value)")?;

        file.sync_all().context("sync")?;

        Ok((key_offset as u32, value_offset as u32))
    }

    /// Reads exactly `length` bytes starting at `offset`.
    pub fn read_data(&self, offset: u32, length: u32) -> Result<Vec<u8>> {
        let mut file = self.file.lock();

        file.seek(SeekFrom::Start(offset as u64))
            .context("seek")?;

        let mut data = vec![0u8; length as usize];
        file.read_exact(&mut data).context("read full")?;

        Ok(data)
    }
}
