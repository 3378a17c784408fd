//! `ferrokv-storereader` — a debugging aid that hex-dumps the data and meta
//! files in a store directory and decodes every meta block in file order,
//! without touching the cache or write worker.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ferrokv::engine::{DATA_FILE_NAME, META_FILE_NAME};
use ferrokv::metastore::MetaStore;

#[derive(Parser, Debug)]
#[command(
    name = "ferrokv-storereader",
    about = "Dump the raw contents of a ferrokv store directory"
)]
struct Args {
    /// Directory holding the data and meta files.
    store_dir: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    dump_file(&args.store_dir.join(DATA_FILE_NAME))?;

    let meta_path = args.store_dir.join(META_FILE_NAME);
    dump_file(&meta_path)?;

    let meta_file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(&meta_path)
        .context("open meta file")?;
    let meta = MetaStore::new(meta_file, meta_path);

    meta.for_each_block(|block| {
        println!("{block:?}");
        Ok(())
    })
    .context("for each block")?;

    Ok(())
}

fn dump_file(path: &std::path::Path) -> Result<()> {
    println!("file: {}", path.display());

    let bytes = fs::read(path).unwrap_or_default();
    println!("{}", pretty_hex(&bytes));
    println!();

    Ok(())
}

/// A minimal `hexdump -C`-style render: 16 bytes per line, hex then ASCII.
fn pretty_hex(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        out.push_str(&format!("{:08x}  ", i * 16));
        out.push_str(&hex::encode(chunk));
        out.push_str("  ");
        for &b in chunk {
            let c = b as char;
            out.push(if c.is_ascii_graphic() || c == ' ' { c } else { '.' });
        }
        out.push('\n');
    }
    out
}
