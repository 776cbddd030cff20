use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "obsidian", about = "Firmware secret provisioning and update bundling")]
pub struct Cli {
    /// Configuration file (defaults to ./obsidian.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the lineage secret store
    #[arg(long, global = true)]
    pub crypto_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a new lineage: symmetric key, lineage nonce and signing keypair
    Provision {
        /// Replace an existing lineage
        #[arg(long)]
        force: bool,
    },
    /// Encrypt and sign a firmware image into an update bundle
    Protect {
        /// Raw firmware image
        #[arg(long)]
        infile: PathBuf,
        /// Bundle to write
        #[arg(long)]
        outfile: PathBuf,
        /// Release version (0-65535)
        #[arg(long)]
        version: u64,
        /// Release message (UTF-8, at most 1024 bytes)
        #[arg(long)]
        message: String,
    },
    /// Show a bundle's header fields without any keys
    Inspect {
        /// Bundle file
        bundle: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Verify and decrypt a bundle with the provisioned lineage
    Verify {
        /// Bundle file
        bundle: PathBuf,
        /// Write the recovered firmware image here
        #[arg(long)]
        extract: Option<PathBuf>,
    },
}
