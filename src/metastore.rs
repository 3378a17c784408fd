//! Append log of fixed-size [`Block`] index records, plus delete-by-CRC
//! support via whole-file rewrite.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use parking_lot::Mutex;

use crate::block::{Block, BLOCK_SIZE};

struct Inner {
    file: File,
    path: PathBuf,
}

pub struct MetaStore {
    inner: Mutex<Inner>,
}

impl MetaStore {
    pub fn new(file: File, path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                file,
                path: path.into(),
            }),
        }
    }

    /// Builds a block from the supplied key/value and offsets, computes its
    /// checksums, and appends its 32-byte encoding to the meta file.
    pub fn write(&self, key: &str, value: &str, key_offset: u32, value_offset: u32) -> Result<()> {
        let block = Block::new(
            key_offset,
            key.len() as u32,
            crc32fast::hash(key.as_bytes()),
            value_offset,
            value.len() as u32,
            crc32fast::hash(value.as_bytes()),
        );

        let mut inner = self.inner.lock();
        inner
            .file
            .seek(SeekFrom::End(0))
            .context("seek to end")?;
        inner
            .file
            .write_all(&block.encode())
            .context("write block")?;

        Ok(())
    }

    /// Iterates every block from offset 0 in file order, invoking `visit`
    /// for each. A clean EOF ends iteration successfully; a partial block
    /// at the tail is a hard failure.
    pub fn for_each_block(&self, mut visit: impl FnMut(Block) -> Result<()>) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.file.seek(SeekFrom::Start(0)).context("seek to beginning")?;

        let mut buf = [0u8; BLOCK_SIZE];
        loop {
            let read = read_up_to(&mut inner.file, &mut buf)?;
            if read == 0 {
                break;
            }
            if read != BLOCK_SIZE {
                bail!("truncated block at tail ({read} of {BLOCK_SIZE} bytes)");
            }

            let block = Block::decode(&buf);
            visit(block).map_err(|e| anyhow!("block handler: {e}"))?;
        }

        Ok(())
    }

    /// Removes every block whose `key_crc32` matches `key`'s CRC32 by
    /// rewriting the meta file to a temporary path and renaming it over
    /// the original. Reopens the file handle afterwards so subsequent
    /// operations observe the replacement.
    pub fn delete_block(&self, key: &str) -> Result<()> {
        let target_crc = crc32fast::hash(key.as_bytes());

        let mut inner = self.inner.lock();
        inner.file.seek(SeekFrom::Start(0)).context("seek to beginning")?;

        let tmp_path = tmp_path_for(&inner.path);
        let mut tmp = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)
            .context("open temp meta file")?;

        let mut buf = [0u8; BLOCK_SIZE];
        loop {
            let read = read_up_to(&mut inner.file, &mut buf)?;
            if read == 0 {
                break;
            }
            if read != BLOCK_SIZE {
                bail!("truncated block at tail ({read} of {BLOCK_SIZE} bytes)");
            }

            let block = Block::decode(&buf);
            if block.key_crc32 != target_crc {
                tmp.write_all(&buf).context("write retained block")?;
            }
        }
        tmp.sync_all().context("sync temp meta file")?;
        drop(tmp);

        fs::rename(&tmp_path, &inner.path).context("rename temp meta file over original")?;

        let reopened = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&inner.path)
            .context("reopen meta file")?;
        inner.file = reopened;

        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Like `Read::read`, but loops until `buf` is full or EOF is reached, so a
/// short read never masquerades as a short `read()` syscall.
fn read_up_to(file: &mut File, buf: &mut [u8]) -> Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match file.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) => return Err(e).context("read block"),
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_meta(dir: &Path) -> (MetaStore, PathBuf) {
        let path = dir.join("meta.bin");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .unwrap();
        (MetaStore::new(file, path.clone()), path)
    }

    #[test]
    fn write_then_iterate_sees_one_block() {
        let dir = tempdir().unwrap();
        let (ms, _) = open_meta(dir.path());

        ms.write("k", "v", 0, 1).unwrap();

        let mut seen = Vec::new();
        ms.for_each_block(|b| {
            seen.push(b);
            Ok(())
        })
        .unwrap();

        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].key_crc32, crc32fast::hash(b"k"));
    }

    #[test]
    fn delete_removes_only_matching_blocks() {
        let dir = tempdir().unwrap();
        let (ms, _) = open_meta(dir.path());

        ms.write("a", "1", 0, 1).unwrap();
        ms.write("b", "2", 2, 3).unwrap();
        ms.write("a", "11", 4, 5).unwrap();

        ms.delete_block("a").unwrap();

        let mut seen = Vec::new();
        ms.for_each_block(|b| {
            seen.push(b);
            Ok(())
        })
        .unwrap();

        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].key_crc32, crc32fast::hash(b"b"));
    }

    #[test]
    fn meta_file_length_is_a_multiple_of_block_size() {
        let dir = tempdir().unwrap();
        let (ms, path) = open_meta(dir.path());

        ms.write("a", "1", 0, 1).unwrap();
        ms.write("b", "2", 2, 3).unwrap();
        ms.delete_block("a").unwrap();

        let len = fs::metadata(&path).unwrap().len();
        assert_eq!(len % BLOCK_SIZE as u64, 0);
    }

    #[test]
    fn truncated_tail_block_is_a_hard_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("meta.bin");
        {
            let mut file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(&path)
                .unwrap();
            file.write_all(&[0u8; 10]).unwrap();
        }
        let file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
        let ms = MetaStore::new(file, path);

        let err = ms.for_each_block(|_| Ok(())).unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }
}
