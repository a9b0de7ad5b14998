use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Aureus - a federated-voting currency node
#[derive(Parser)]
#[command(name = "aureus")]
#[command(about = "Aureus node and utilities")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run an Aureus node
    Run {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
    },

    /// Initialize a new node configuration
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Generate a new keypair
    Keygen {
        /// Output file for secret key
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify a signed operation file
    Verify {
        /// Operation JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List stored ledger chunks, verifying their integrity
    Chunks {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
    },
}
