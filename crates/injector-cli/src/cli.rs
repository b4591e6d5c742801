//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Secret Injector - Materialize cluster secrets as files
#[derive(Parser, Debug)]
#[command(name = "secret-injector")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Injector config file (TOML, JSON or YAML)
    #[arg(short, long, global = true, env = "SECRET_INJECTOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Kubeconfig to use instead of the default lookup and in-cluster config
    #[arg(long, global = true, env = "SECRET_INJECTOR_KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Watch secrets and keep their files in sync until interrupted
    Watch(WatchArgs),

    /// Materialize the secrets named in a secret list once
    Apply {
        /// Secret list (JSON, or YAML with a .yaml/.yml extension)
        #[arg(short, long)]
        manifest: PathBuf,
    },

    /// Validate a secret list, optionally comparing it with the files on disk
    ///
    /// Examples:
    ///   secret-injector check -m secrets.json           # Offline validation
    ///   secret-injector check -m secrets.json --drift   # Compare with the cluster
    Check {
        /// Secret list (JSON, or YAML with a .yaml/.yml extension)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Fetch each secret and report files that are missing or differ
        #[arg(long)]
        drift: bool,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}

/// Overrides for the watch scope and timers
#[derive(Args, Debug, Clone, PartialEq, Eq, Default)]
pub struct WatchArgs {
    /// Only watch this namespace
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Label selector for watched secrets
    #[arg(short = 'l', long, conflicts_with = "all")]
    pub selector: Option<String>,

    /// Watch every secret regardless of labels
    #[arg(long)]
    pub all: bool,

    /// Re-sync every watched secret at this interval (seconds)
    #[arg(long)]
    pub resync_secs: Option<u64>,
}
