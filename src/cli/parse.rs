//! CLI parse: clap types for uagent. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// uagent - node-resident reconciliation agent
#[derive(Parser)]
#[command(name = "uagent")]
#[command(about = "Reconcile backend resources against their target state using content hashes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file layered over the global one
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, global = true, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the canonical hash of a JSON document
    Hash {
        /// JSON file to hash
        file: PathBuf,
        /// Hash only these top-level attributes (comma separated)
        #[arg(long, value_delimiter = ',')]
        fields: Option<Vec<String>>,
    },
    /// List the kinds this agent manages
    Capabilities,
    /// Inspect or edit the Target Field Store
    Fields {
        #[command(subcommand)]
        command: FieldsCommands,
    },
    /// Run one reconciliation pass against the configured backend
    Reconcile {
        /// Resource kind to reconcile
        #[arg(long)]
        kind: String,
        /// JSON file holding an array of target resource values
        #[arg(long)]
        targets: PathBuf,
    },
    /// Configuration commands (validate, show)
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum FieldsCommands {
    /// Show recorded target fields
    List {
        /// Only entries of this kind
        #[arg(long)]
        kind: Option<String>,
    },
    /// Drop the record for one resource
    Forget {
        #[arg(long)]
        kind: String,
        #[arg(long)]
        uuid: Uuid,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate the layered configuration
    Validate,
    /// Print the effective configuration as TOML
    Show,
}
