//! Secret Injector CLI
//!
//! Keeps cluster secrets materialized as plain files.

mod cli;
mod commands;
mod context;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use context::Context;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut ctx = Context::load(cli.config.as_deref(), cli.kubeconfig.clone())?;

    // `check` without --drift stays offline and needs no runtime.
    if let Commands::Check {
        manifest,
        drift: false,
        json,
    } = &cli.command
    {
        return commands::run_check(manifest, *json);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match &cli.command {
            Commands::Watch(args) => {
                ctx.apply_watch_args(args);
                commands::run_watch(&ctx).await
            }
            Commands::Apply { manifest } => commands::run_apply(&ctx, manifest).await,
            Commands::Check { manifest, json, .. } => {
                commands::run_drift_check(&ctx, manifest, *json).await
            }
        }
    })
}

/// Logs go to stderr so command output on stdout stays parseable.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "secret_injector={level},injector_core={level},injector_kube={level},injector_fs={level}",
            level = default_level
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
}
