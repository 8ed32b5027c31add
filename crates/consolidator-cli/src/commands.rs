use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "consolidator")]
#[command(about = "Merge or compress several folders into one", long_about = None)]
pub struct Cli {
    /// Log more detail (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Source folders, in the order they are processed
    #[arg(required = true)]
    pub sources: Vec<PathBuf>,
    /// Folder that receives the result
    #[arg(short, long)]
    pub dest: PathBuf,
    /// Delete the source folders after a successful run
    #[arg(long)]
    pub delete_originals: bool,
    /// Do not ask for confirmation before deleting
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Copy all files from the sources into one folder, renaming collisions
    Merge {
        #[command(flatten)]
        run: RunArgs,
        /// Name of the folder created under --dest
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Write all files from the sources into one zip archive
    Compress {
        #[command(flatten)]
        run: RunArgs,
        /// Archive file name created under --dest
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Show size and file count of folders
    Inspect {
        #[arg(required = true)]
        folders: Vec<PathBuf>,
    },
    /// List past merges, most recent first
    History,
    /// Print configuration values
    PrintConfig,
}
