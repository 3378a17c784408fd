//! `ferrokv-server` — opens the store directory, builds the engine, and
//! serves the wire protocol over TCP, one thread per connection.

use std::fs::File;
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use ferrokv::engine::Engine;
use ferrokv::rpc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ferrokv-server", about = "A durable key/value store server")]
struct Args {
    /// Directory holding the data and meta files.
    #[arg(long = "storedir", default_value = "/tmp")]
    store_dir: PathBuf,

    /// TCP port to listen on.
    #[arg(long = "port", default_value_t = 8080)]
    port: u16,

    /// Path to a file to write logs to; defaults to stderr.
    #[arg(long = "logfile")]
    log_file: Option<PathBuf>,

    /// tracing-compatible log level filter, e.g. "info", "debug", "trace".
    #[arg(long = "loglevel", default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.log_file.as_deref())?;

    info!("start");
    info!(store_dir = %args.store_dir.display(), "store dir");

    let engine = Arc::new(Engine::open(&args.store_dir).context("open engine")?);

    let address = format!("0.0.0.0:{}", args.port);
    let listener = TcpListener::bind(&address).context("listen")?;
    info!(%address, "listening");

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "failed to accept connection");
                continue;
            }
        };

        let engine = engine.clone();
        std::thread::spawn(move || {
            stream.set_nodelay(true).ok();
            if let Err(e) = rpc::serve_connection(&stream, engine.as_ref()) {
                warn!(error = %e, "connection ended with an error");
            }
        });
    }

    Ok(())
}

fn init_logging(level: &str, log_file: Option<&std::path::Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file {
        Some(path) => {
            let file = File::create(path).context("create log file")?;
            builder.with_writer(move || file.try_clone().expect("clone log file")).init();
        }
        None => {
            builder.init();
        }
    }

    Ok(())
}
