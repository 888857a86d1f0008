use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "regidx")]
#[command(about = "Build and query offline package registry snapshots", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a snapshot from per-package registry descriptors
    Build {
        /// Registry root containing registry.json and index/ (located
        /// automatically when omitted)
        #[arg(long)]
        root: Option<PathBuf>,
        /// Remote to shallow-clone when no local registry resolves
        #[arg(long)]
        remote: Option<String>,
        #[arg(short, long, default_value = "public/registry/index/all.min.json")]
        out: PathBuf,
    },
    /// Fetch a snapshot cache-first from a registry URL
    Load {
        url: String,
        /// Cache directory (defaults to the per-user cache)
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// Run one search or browse query against a snapshot file
    Search {
        /// Query text; omit to browse everything newest-first
        query: Option<String>,
        #[arg(short, long)]
        snapshot: PathBuf,
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
        #[arg(long, default_value = "0")]
        offset: usize,
        /// Result ordering: score or latest
        #[arg(long, default_value = "score")]
        sort: String,
        /// Print the raw response envelope as JSON
        #[arg(long)]
        json: bool,
    },
    /// Look up one package by exact id (namespace/name)
    Get {
        id: String,
        #[arg(short, long)]
        snapshot: PathBuf,
    },
    /// Print a snapshot's meta block
    Show { snapshot: PathBuf },
}
