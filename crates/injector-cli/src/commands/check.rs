//! The `check` command
//!
//! Without `--drift` this only validates the secret list and needs no
//! cluster access.

use std::path::Path;

use colored::Colorize;
use injector_core::{CheckReport, CheckStatus, SecretsManifest, SyncEngine};
use injector_kube::fetch_manifest_secrets;

use crate::context::Context;
use crate::error::{CliError, Result};

/// Load and validate a secret list, then print its records.
pub fn run_check(manifest_path: &Path, json: bool) -> Result<()> {
    let manifest = SecretsManifest::load(manifest_path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(());
    }

    println!(
        "{} {} is valid ({} record(s))",
        "OK".green().bold(),
        manifest_path.display(),
        manifest.len()
    );
    for entry in manifest.iter() {
        let keys = if entry.keys.is_empty() {
            "all keys".to_string()
        } else {
            entry.keys.join(", ")
        };
        println!(
            "   {} {} -> {} ({})",
            "-".blue(),
            entry.id().to_string().cyan(),
            entry.path.display(),
            keys.dimmed()
        );
    }
    Ok(())
}

/// Fetch every listed secret and compare it with the files on disk.
///
/// Fails unless every secret is in sync.
pub async fn run_drift_check(ctx: &Context, manifest_path: &Path, json: bool) -> Result<()> {
    let manifest = SecretsManifest::load(manifest_path)?;
    if !json {
        println!("{} Checking secret files for drift...", "=>".blue().bold());
    }

    let client = injector_kube::connect(ctx.kubeconfig.as_deref()).await?;
    let fetched = fetch_manifest_secrets(&client, &manifest).await;
    let engine = SyncEngine::from_config(&ctx.config);

    let report = tokio::task::spawn_blocking(move || {
        fetched
            .into_iter()
            .map(|fetched| match fetched.result {
                Ok(secret) => engine.check_secret(&secret),
                Err(e) => CheckReport::broken(format!("{}: {}", fetched.entry.id(), e)),
            })
            .fold(CheckReport::healthy(), CheckReport::merge)
    })
    .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    match report.status {
        CheckStatus::Healthy => Ok(()),
        status => Err(CliError::user(format!("secret files are not in sync ({:?})", status))),
    }
}

fn print_report(report: &CheckReport) {
    for message in &report.messages {
        println!("   {} {}", "x".red(), message);
    }
    for item in &report.drifted {
        println!(
            "   {} {} ({}): {}",
            "!".red(),
            item.path.display().to_string().cyan(),
            item.secret.dimmed(),
            item.description
        );
    }
    for item in &report.missing {
        println!(
            "   {} {} ({}): {}",
            "-".yellow(),
            item.path.display().to_string().cyan(),
            item.secret.dimmed(),
            item.description
        );
    }

    match report.status {
        CheckStatus::Healthy => {
            println!("{} All secret files are in sync.", "OK".green().bold());
        }
        CheckStatus::Missing => println!("{} Some secret files are missing.", "MISSING".yellow().bold()),
        CheckStatus::Drifted => println!("{} Secret files have drifted.", "DRIFTED".red().bold()),
        CheckStatus::Broken => println!("{} Some secrets could not be checked.", "BROKEN".red().bold()),
    }
    if report.status != CheckStatus::Healthy {
        println!();
        println!("Run {} to repair.", "secret-injector apply".cyan());
    }
}
