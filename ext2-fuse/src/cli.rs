use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
pub struct Cli {
    /// Disk image
    #[arg(long, short, default_value = "fs.img")]
    pub image: PathBuf,

    /// First sector of the partition inside the image
    #[arg(long, default_value_t = 0)]
    pub start: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a fresh image and format it
    Format {
        /// Image size in MiB
        #[arg(long, short, default_value_t = 64)]
        size: u64,

        /// Block size as log2(size / 1024)
        #[arg(long, default_value_t = 0)]
        log_block_size: u32,

        /// Volume label
        #[arg(long, default_value = "krnel")]
        label: String,
    },

    /// Copy host executables into /bin
    Pack {
        /// Executable source directory
        #[arg(long, short)]
        source: PathBuf,

        /// Executable target directory
        #[arg(long, short)]
        target: PathBuf,
    },

    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },

    /// Print a file to stdout
    Cat { path: String },

    /// Recount the bitmaps and report mismatching free counts
    Check,
}
