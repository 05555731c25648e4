use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use reqwest::Url;
use tracing::Level;

use crate::batch::TranscriptOrder;
use crate::executor::DEFAULT_BASE_URL;
use crate::session::DEFAULT_STORE_PATH;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct DiskCmdCli {
    /// Base URL of the disk management API
    #[arg(long, env = "DISKCMD_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    pub base_url: Url,

    /// File where the logged in user and the created disks are kept
    #[arg(long, env = "DISKCMD_STORE", default_value = DEFAULT_STORE_PATH, global = true)]
    pub store: PathBuf,

    /// Log more, repeat for even more detail
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub action: Action,
}

impl DiskCmdCli {
    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Action {
    /// Run every command of a script as one batch
    Run {
        /// Script to run, stdin when missing or `-`
        file: Option<PathBuf>,
        /// Order in which results are printed
        #[arg(long, value_enum, default_value_t = TranscriptOrder::Arrival)]
        order: TranscriptOrder,
    },
    /// Type commands one at a time
    Repl,
    /// List the disks created so far
    Disks {
        /// Also read each disk's partition table from the server
        #[arg(short, long)]
        partitions: bool,
    },
}
