use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "datalayer-cache")]
#[command(about = "Read-through cache for a remote data layer")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Storage root (overrides DATALAYER_ROOT)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// RPC endpoint (overrides DATALAYER_RPC_URL)
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    /// Per-request timeout in milliseconds (overrides DATALAYER_RPC_TIMEOUT_MS)
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the value of a key
    Get {
        /// Store id
        store: String,
        /// Entry key
        key: String,
    },
    /// Print the keys of a store
    Keys {
        /// Store id
        store: String,
    },
    /// Drop a key, or a whole store, from the cache
    Invalidate {
        /// Store id
        store: String,
        /// Entry key (omit to drop the whole store)
        key: Option<String>,
    },
    /// Drop everything from the cache
    Clear,
    /// Print the cache directory
    Path,
    /// List stores with cached files
    Stores,
}
