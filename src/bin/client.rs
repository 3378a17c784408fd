//! `ferrokv-client` — a thin CLI over the wire protocol: dial, send one
//! request, print the response, exit non-zero on any error.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ferrokv::wire::{self, Request, Response, OK_STATUS};

#[derive(Parser, Debug)]
#[command(name = "ferrokv-client", about = "A client for the ferrokv server")]
struct Args {
    /// Address the server is listening on.
    #[arg(long = "address", default_value = "127.0.0.1:8080")]
    address: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the value for a key.
    Get { key: String },
    /// Store a value for a key.
    Set { key: String, value: String },
    /// Remove a key.
    Delete { key: String },
    /// Block until all pending durable writes have landed.
    Sync,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let stream = TcpStream::connect(&args.address)
        .with_context(|| format!("cannot dial server at address {}", args.address))?;
    let mut reader = BufReader::new(stream.try_clone().context("clone stream")?);
    let mut writer = BufWriter::new(stream);

    let request = match args.command {
        Command::Get { key } => Request::Get { key },
        Command::Set { key, value } => Request::Set { key, value },
        Command::Delete { key } => Request::Delete { key },
        Command::Sync => Request::Sync,
    };

    wire::write_request(&mut writer, &request).context("send request")?;
    let response = wire::read_response(&mut reader).context("read response")?;

    match response {
        Response::Get { status, value } => {
            if status != OK_STATUS {
                bail!(status);
            }
            println!("{value}");
        }
        Response::Set { status } | Response::Delete { status } | Response::Sync { status } => {
            if status != OK_STATUS {
                bail!(status);
            }
        }
    }

    Ok(())
}
