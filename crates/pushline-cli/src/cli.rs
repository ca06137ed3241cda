use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pushline",
    about = "Push documents and permissions into a search index source",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file
    #[arg(short, long, global = true, default_value = "pushline.toml")]
    pub config: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Push documents from a JSON Lines file
    Push(PushArgs),
    /// Delete a single document
    Delete(DeleteArgs),
    /// Delete every document older than an ordering id
    DeleteOlderThan(DeleteOlderThanArgs),
    /// Change the source status
    Status(StatusArgs),
    /// Manage security providers and permission expansions
    Permissions(PermissionsArgs),
    /// Show or create the configuration file
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct PushArgs {
    /// File with one JSON document per line
    pub file: PathBuf,
    /// File with one document id to delete per line
    #[arg(long)]
    pub deletes: Option<PathBuf>,
    /// plain-batch, open-stream, or update-stream
    #[arg(long)]
    pub mode: Option<String>,
    /// Delete documents older than this push when done
    #[arg(long)]
    pub delete_older: bool,
    /// Leave the source status untouched
    #[arg(long)]
    pub no_status: bool,
    /// Write batches to this directory instead of sending them
    #[arg(long)]
    pub spool: Option<PathBuf>,
    /// Number of the first spooled file
    #[arg(long, default_value = "1")]
    pub offset: u64,
    /// Byte ceiling of one batch
    #[arg(long)]
    pub max_request_size: Option<usize>,
}

#[derive(Args)]
pub struct DeleteArgs {
    pub document_id: String,
    #[arg(long)]
    pub children: bool,
    #[arg(long)]
    pub ordering: Option<i64>,
    #[arg(long)]
    pub no_status: bool,
}

#[derive(Args)]
pub struct DeleteOlderThanArgs {
    pub ordering: i64,
    /// Minutes to wait before the delete runs (0 to 1440)
    #[arg(long)]
    pub queue_delay: Option<i64>,
}

#[derive(Args)]
pub struct StatusArgs {
    pub status: StatusValue,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum StatusValue {
    Rebuild,
    Refresh,
    Incremental,
    Idle,
}

#[derive(Args)]
pub struct PermissionsArgs {
    #[command(subcommand)]
    pub action: PermissionsAction,
}

#[derive(Subcommand)]
pub enum PermissionsAction {
    /// Create or replace a security provider for this source
    Provider {
        id: String,
        #[arg(long = "type", default_value = "EXPANDED")]
        kind: String,
        /// Cascade to another provider, as ID=TYPE
        #[arg(long)]
        cascade: Vec<String>,
    },
    /// Upload expansions from a JSON file as one batch
    Expand {
        #[arg(long)]
        provider: String,
        /// JSON object with `members`, `mappings`, and `deleted` arrays
        file: PathBuf,
        #[arg(long)]
        delete_older: bool,
    },
    /// Delete expansions older than an ordering id
    DeleteOlderThan {
        #[arg(long)]
        provider: String,
        ordering: i64,
    },
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Write a template to the configuration path
    #[arg(long)]
    pub init: bool,
}
