//! CLI definitions for durq.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// durq CLI.
#[derive(Parser)]
#[command(name = "durq")]
#[command(about = "Durable single-consumer FIFO job queue")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "durq.toml", global = true)]
    pub config: PathBuf,

    /// Queue database path (empty for an in-memory queue)
    #[arg(long, env = "DURQ_DB", global = true)]
    pub db: Option<String>,

    /// Number of jobs held in memory at once
    #[arg(long, env = "DURQ_BATCH_SIZE", global = true)]
    pub batch_size: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Append a job
    Add {
        /// Job payload as JSON
        payload: String,
    },

    /// Print the number of pending jobs
    Len,

    /// Check whether a job is pending
    Has {
        /// Job ID
        id: i64,
    },

    /// Find jobs by payload
    Find {
        /// Payload to match, as JSON
        payload: String,

        /// Only print the oldest match
        #[arg(long)]
        first: bool,
    },

    /// Remove a job by ID
    Delete {
        /// Job ID
        id: i64,
    },

    /// Consume jobs in order, printing each one
    Drain {
        /// Stop after this many jobs
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Check the stored job count against a full table scan
    Verify,
}
