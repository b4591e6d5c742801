//! The long-running `watch` command

use colored::Colorize;
use injector_core::{Controller, SyncEngine};
use injector_kube::{KubeSecretFeed, WatchScope};
use tokio_util::sync::CancellationToken;

use crate::context::Context;
use crate::error::Result;

/// Run the controller against the cluster until Ctrl-C or SIGTERM.
pub async fn run_watch(ctx: &Context) -> Result<()> {
    let config = &ctx.config;
    let client = injector_kube::connect(ctx.kubeconfig.as_deref()).await?;

    let scope = WatchScope {
        namespace: config.namespace.clone(),
        label_selector: config.label_selector.clone(),
    };
    let feed = KubeSecretFeed::new(client, &scope).with_resync(config.resync_interval());
    let controller = Controller::new(feed, SyncEngine::from_config(config))
        .with_sync_timeout(config.sync_timeout());

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    let stats = controller.run(shutdown).await?;

    println!(
        "{} {} written, {} unchanged, {} removed, {} failed, {} dropped",
        "Stopped:".green().bold(),
        stats.written,
        stats.skipped,
        stats.removed,
        stats.failed,
        stats.dropped
    );
    Ok(())
}

async fn shutdown_on_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    cancel_on_first_signal(tokio::signal::ctrl_c(), terminate, shutdown).await;
}

/// Cancel `shutdown` once either signal fires. A Ctrl-C handler that fails
/// to register leaves SIGTERM as the only way out.
async fn cancel_on_first_signal<C, T>(ctrl_c: C, terminate: T, shutdown: CancellationToken)
where
    C: Future<Output = std::io::Result<()>>,
    T: Future<Output = ()>,
{
    let ctrl_c = async {
        match ctrl_c.await {
            Ok(()) => tracing::info!("Received Ctrl-C"),
            Err(e) => {
                tracing::warn!(error = %e, "Cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
    shutdown.cancel();
}
