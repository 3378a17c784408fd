//! `ferrokv-storewriter` — a load-generation aid that writes synthetic
//! `key-N => value-N` pairs straight through the engine (bypassing the RPC
//! front end entirely), syncing periodically. Useful for exercising
//! durability and restart behavior at scale.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ferrokv::engine::Engine;

#[derive(Parser, Debug)]
#[command(
    name = "ferrokv-storewriter",
    about = "Write synthetic key/value pairs directly through the engine"
)]
struct Args {
    /// Directory holding the data and meta files.
    store_dir: PathBuf,

    /// Number of synthetic keys to write.
    key_count: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let engine = Engine::open(&args.store_dir).context("open engine")?;

    for i in 0..args.key_count {
        engine
            .set(&format!("key-{i}"), &format!("value-{i}"))
            .with_context(|| format!("set key-{i}"))?;

        if i > 0 && i % 100 == 0 {
            println!("count: {i}");
            engine.sync().context("sync")?;
        }
    }

    engine.sync().context("final sync")?;

    Ok(())
}
