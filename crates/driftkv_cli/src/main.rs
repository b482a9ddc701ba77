//! DriftKV CLI
//!
//! Command-line tools for the DriftKV store and balancer.
//!
//! # Commands
//!
//! - `serve` - Run the load balancer
//! - `inspect` - Display store statistics and segment layout
//! - `verify` - Verify store integrity
//! - `compact` - Force a compaction cycle
//! - `get` / `put` - Single-shot store operations

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// DriftKV command-line tools.
#[derive(Parser)]
#[command(name = "driftkv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long)]
    dir: Option<PathBuf>,

    /// Maximum segment file size in bytes
    #[arg(global = true, short, long, default_value_t = 64 * 1024 * 1024)]
    segment_size: u64,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the load balancer
    Serve {
        /// Load balancer port
        #[arg(short, long, default_value_t = 8090)]
        port: u16,

        /// Request timeout in seconds
        #[arg(short, long, default_value_t = 3)]
        timeout_sec: u64,

        /// Whether backends support HTTPS
        #[arg(long)]
        https: bool,

        /// Whether to include tracing information into responses
        #[arg(long)]
        trace: bool,
    },

    /// Display store statistics and segment layout
    Inspect,

    /// Verify store integrity by decoding every entry
    Verify,

    /// Force a compaction cycle
    Compact,

    /// Read the most recent value for a key
    Get {
        /// The key to look up
        key: String,
    },

    /// Write a value for a key
    Put {
        /// The key to write
        key: String,
        /// The value to store
        value: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve {
            port,
            timeout_sec,
            https,
            trace,
        } => {
            commands::serve::run(port, timeout_sec, https, trace)?;
        }
        Commands::Inspect => {
            let dir = cli.dir.ok_or("Store directory required for inspect")?;
            commands::inspect::run(&dir, cli.segment_size)?;
        }
        Commands::Verify => {
            let dir = cli.dir.ok_or("Store directory required for verify")?;
            commands::verify::run(&dir, cli.segment_size)?;
        }
        Commands::Compact => {
            let dir = cli.dir.ok_or("Store directory required for compact")?;
            commands::compact::run(&dir, cli.segment_size)?;
        }
        Commands::Get { key } => {
            let dir = cli.dir.ok_or("Store directory required for get")?;
            commands::store_ops::get(&dir, cli.segment_size, &key)?;
        }
        Commands::Put { key, value } => {
            let dir = cli.dir.ok_or("Store directory required for put")?;
            commands::store_ops::put(&dir, cli.segment_size, &key, &value)?;
        }
        Commands::Version => {
            println!("DriftKV CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("DriftKV Core v{}", driftkv_core::VERSION);
        }
    }

    Ok(())
}
