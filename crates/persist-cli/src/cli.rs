use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "persist",
    about = "Inspect, import, and write objects on remote filesystems",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML configuration file; takes precedence over --default-fs
    #[arg(long, global = true, conflicts_with = "default_fs")]
    pub config: Option<PathBuf>,

    /// Default filesystem for scheme-less paths, e.g. hdfs://namenode:8020
    #[arg(long, global = true)]
    pub default_fs: Option<String>,

    /// Stop retrying transient faults after this many seconds
    #[arg(long, global = true)]
    pub retry_deadline: Option<u64>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Register every file under a remote directory
    Import(ImportArgs),
    /// List a directory
    Ls(PathArgs),
    /// Show whether a path exists and its length
    Stat(PathArgs),
    /// Print a file, or one chunk of it
    Cat(CatArgs),
    /// Upload a local file
    Put(PutArgs),
    /// Create a directory and its parents
    Mkdir(PathArgs),
    /// Rename, replacing an existing destination
    Mv(MvArgs),
    /// Delete recursively
    Rm(PathArgs),
    /// Show the home directory of the default filesystem
    Home,
}

#[derive(Args)]
pub struct ImportArgs {
    pub path: String,
    /// Register exactly one file instead of walking a tree
    #[arg(long)]
    pub single: bool,
}

#[derive(Args)]
pub struct PathArgs {
    pub path: String,
}

#[derive(Args)]
pub struct CatArgs {
    pub path: String,
    /// Read only this chunk, through the retrying loader
    #[arg(long)]
    pub chunk: Option<u32>,
}

#[derive(Args)]
pub struct PutArgs {
    pub local: PathBuf,
    pub remote: String,
    /// Fail instead of replacing an existing file
    #[arg(long, conflicts_with = "retry")]
    pub no_clobber: bool,
    /// Retry transient faults until the write succeeds
    #[arg(long)]
    pub retry: bool,
}

#[derive(Args)]
pub struct MvArgs {
    pub from: String,
    pub to: String,
}
