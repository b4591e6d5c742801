//! The one-shot `apply` command

use std::path::Path;

use colored::Colorize;
use injector_core::{SecretsManifest, SyncEngine};
use injector_kube::{FetchedSecret, fetch_manifest_secrets};

use crate::context::Context;
use crate::error::{CliError, Result};

/// Totals over one apply run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApplySummary {
    pub written: usize,
    pub skipped: usize,
    /// Failed items plus secrets that could not be fetched or synced at all
    pub failed: usize,
}

/// Fetch every secret in the list and materialize it.
///
/// Fails after processing everything if any secret or item failed.
pub async fn run_apply(ctx: &Context, manifest_path: &Path) -> Result<()> {
    let manifest = SecretsManifest::load(manifest_path)?;
    println!(
        "{} Applying {} secret(s) from {}",
        "=>".blue().bold(),
        manifest.len(),
        manifest_path.display()
    );

    let client = injector_kube::connect(ctx.kubeconfig.as_deref()).await?;
    let fetched = fetch_manifest_secrets(&client, &manifest).await;

    let engine = SyncEngine::from_config(&ctx.config);
    let summary = tokio::task::spawn_blocking(move || apply_fetched(&engine, fetched)).await?;

    println!(
        "{} {} written, {} unchanged, {} failed",
        "Done:".green().bold(),
        summary.written,
        summary.skipped,
        summary.failed
    );

    if summary.failed > 0 {
        return Err(CliError::user(format!(
            "{} secret item(s) failed to apply",
            summary.failed
        )));
    }
    Ok(())
}

/// Sync each fetched secret, printing one line per item.
pub fn apply_fetched(engine: &SyncEngine, fetched: Vec<FetchedSecret>) -> ApplySummary {
    let mut summary = ApplySummary::default();

    for FetchedSecret { entry, result } in fetched {
        let secret = match result {
            Ok(secret) => secret,
            Err(e) => {
                println!("   {} {}: {}", "x".red(), entry.id().to_string().cyan(), e);
                summary.failed += 1;
                continue;
            }
        };

        let report = match engine.sync_secret(&secret) {
            Ok(report) => report,
            Err(e) => {
                println!("   {} {}: {}", "x".red(), secret.id().to_string().cyan(), e);
                summary.failed += 1;
                continue;
            }
        };

        for item in &report.items {
            match &item.result {
                Ok(injector_core::SyncOutcome::Written) => {
                    println!("   {} {}", "+".green(), item.path.display());
                }
                Ok(injector_core::SyncOutcome::Skipped) => {
                    println!("   {} {}", "=".dimmed(), item.path.display().to_string().dimmed());
                }
                Err(e) => println!("   {} {}: {}", "x".red(), item.path.display(), e),
            }
        }
        summary.written += report.written();
        summary.skipped += report.skipped();
        summary.failed += report.failed();
    }

    summary
}
