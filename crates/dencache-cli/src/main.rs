//! dencache — demo CLI over the dencache-core engine.
//!
//! Exercises the cache against a real directory: store bytes from a file
//! or stdin, read them back, probe and remove keys, and print the engine's
//! counters. Each invocation opens the cache (running journal recovery),
//! performs one operation, and closes it.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use dencache_core::{Config, DenCache, SerialWorker};

#[derive(Parser)]
#[command(name = "dencache", about = "Bounded, journaled, LRU disk cache")]
struct Cli {
    /// Cache directory (created if missing)
    dir: PathBuf,

    /// Byte budget for the cache
    #[arg(long, default_value_t = dencache_core::DEFAULT_MAX_BYTES)]
    max_bytes: u64,

    /// Entry-count budget for the cache
    #[arg(long, default_value_t = dencache_core::DEFAULT_MAX_COUNT)]
    max_count: usize,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store bytes under a key
    Put {
        key: String,
        /// Read the payload from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print a cached payload
    Get {
        key: String,
        /// Write the payload to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Report whether a key is cached
    Has { key: String },
    /// Remove a key
    Rm { key: String },
    /// Print cache counters
    Stat,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let executor = Arc::new(SerialWorker::new("dencache-journal")?);
    let mut config = Config::new(&cli.dir, executor);
    config.max_bytes = cli.max_bytes;
    config.max_count = cli.max_count;

    let cache = DenCache::open(config).context("failed to open cache")?;
    let result = run(&cache, cli.command);
    cache.close().context("failed to close cache")?;
    result
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(cache: &DenCache, command: Command) -> Result<()> {
    match command {
        Command::Put { key, file } => {
            let payload = read_payload(file.as_deref())?;
            let Some(mut writer) = cache.edit(&key)? else {
                bail!("cache is unavailable (stub mode)");
            };
            writer.write(&payload)?;
            if !writer.commit()? {
                bail!("write failed, entry discarded");
            }
            debug!(key, bytes = payload.len(), "stored");
            Ok(())
        }

        Command::Get { key, out } => {
            let Some(reader) = cache.get(&key)? else {
                bail!("no entry for key {:?}", key);
            };
            let bytes = reader.read_to_vec().context("failed to read entry")?;
            match out {
                Some(path) => std::fs::write(&path, &bytes)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => std::io::stdout().write_all(&bytes)?,
            }
            Ok(())
        }

        Command::Has { key } => {
            println!("{}", cache.has(&key)?);
            Ok(())
        }

        Command::Rm { key } => {
            cache.remove(&key)?;
            Ok(())
        }

        Command::Stat => {
            println!("{}", cache.stats());
            println!(
                "entries: {} / {}  bytes: {} / {}",
                cache.count(),
                cache.max_count(),
                cache.size_bytes(),
                cache.max_bytes()
            );
            Ok(())
        }
    }
}

fn read_payload(file: Option<&std::path::Path>) -> Result<Vec<u8>> {
    match file {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}
