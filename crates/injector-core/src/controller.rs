//! Reconciliation controller
//!
//! Consumes a [`ChangeFeed`], decodes each object into a [`Secret`] and
//! drives the [`SyncEngine`] on a blocking worker. Events are handled one at
//! a time in feed order, so two notifications for the same secret never
//! overlap.

use std::collections::BTreeMap;
use std::future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::decode::SecretObject;
use crate::feed::{ChangeFeed, FeedEvent};
use crate::model::{Secret, SecretId};
use crate::sync::{RemovalReport, SyncEngine};
use crate::{Error, Result};

/// Counters accumulated over one [`Controller::run`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// Items written to disk
    pub written: u64,
    /// Items whose on-disk content already matched
    pub skipped: u64,
    /// Items or secrets that failed to sync or be removed
    pub failed: u64,
    /// Files removed for deleted secrets
    pub removed: u64,
    /// Notifications discarded because they could not be decoded
    pub dropped: u64,
}

/// Drives a [`SyncEngine`] from a [`ChangeFeed`].
pub struct Controller<F: ChangeFeed> {
    feed: F,
    engine: SyncEngine,
    sync_timeout: Option<Duration>,
    span: tracing::Span,
    stats: RunStats,
}

impl<F: ChangeFeed> Controller<F> {
    pub fn new(feed: F, engine: SyncEngine) -> Self {
        Self {
            feed,
            engine,
            sync_timeout: None,
            span: tracing::info_span!("controller"),
            stats: RunStats::default(),
        }
    }

    /// Fail with [`Error::CacheSyncFailed`] if the initial listing takes
    /// longer than `timeout`.
    pub fn with_sync_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.sync_timeout = timeout;
        self
    }

    /// Run every event inside `span` instead of the default `controller` span.
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// Process events until the feed ends or `shutdown` is cancelled.
    ///
    /// Nothing is written before the feed reports [`FeedEvent::Synced`].
    /// Cancellation is only observed between events; an event that has
    /// started is always finished.
    pub async fn run(self, shutdown: CancellationToken) -> Result<RunStats> {
        let span = self.span.clone();
        self.run_inner(shutdown).instrument(span).await
    }

    async fn run_inner(mut self, shutdown: CancellationToken) -> Result<RunStats> {
        tracing::info!("Starting controller");

        let Some(pending) = self.wait_for_cache_sync(&shutdown).await? else {
            tracing::info!("Shutting down controller");
            return Ok(self.stats);
        };
        tracing::info!(pending = pending.len(), "Cache synced");

        for (_, object) in pending {
            if shutdown.is_cancelled() {
                break;
            }
            self.on_added(object).await?;
        }

        while !shutdown.is_cancelled() {
            let event = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                event = self.feed.next_event() => event,
            };

            match event {
                Some(Ok(event)) => self.handle_event(event).await?,
                Some(Err(e)) => tracing::warn!(error = %e, "Change feed error"),
                None => {
                    tracing::warn!("Change feed ended");
                    break;
                }
            }
        }

        tracing::info!(
            written = self.stats.written,
            skipped = self.stats.skipped,
            failed = self.stats.failed,
            removed = self.stats.removed,
            dropped = self.stats.dropped,
            "Shutting down controller"
        );
        Ok(self.stats)
    }

    /// Buffer events until the feed is synced, keeping the latest object
    /// per secret. A deletion drops the buffered object.
    ///
    /// Returns `None` if shutdown was requested first.
    async fn wait_for_cache_sync(
        &mut self,
        shutdown: &CancellationToken,
    ) -> Result<Option<BTreeMap<SecretId, F::Object>>> {
        let timeout = self.sync_timeout;
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut pending = BTreeMap::new();

        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(None),
                _ = sleep_until(deadline) => {
                    return Err(Error::CacheSyncFailed {
                        reason: format!(
                            "initial listing not complete after {:?}",
                            timeout.unwrap_or_default()
                        ),
                    });
                }
                event = self.feed.next_event() => event,
            };

            let event = match event {
                Some(Ok(event)) => event,
                Some(Err(e)) => {
                    return Err(Error::CacheSyncFailed {
                        reason: e.to_string(),
                    });
                }
                None => {
                    return Err(Error::CacheSyncFailed {
                        reason: "change feed ended before the initial listing completed".to_string(),
                    });
                }
            };

            let (object, deleted) = match event {
                FeedEvent::Synced => return Ok(Some(pending)),
                FeedEvent::Added(object) | FeedEvent::Updated { new: object, .. } => (object, false),
                FeedEvent::Deleted(object) => (object, true),
            };

            let Some(id) = object.identity() else {
                tracing::warn!("Dropping notification without a secret identity");
                self.stats.dropped += 1;
                continue;
            };
            if deleted {
                pending.remove(&id);
            } else {
                tracing::trace!(secret = %id, "Buffering notification until cache sync");
                pending.insert(id, object);
            }
        }
    }

    async fn handle_event(&mut self, event: FeedEvent<F::Object>) -> Result<()> {
        match event {
            FeedEvent::Added(object) => self.on_added(object).await,
            FeedEvent::Updated { old, new } => self.on_updated(old, new).await,
            FeedEvent::Deleted(object) => self.on_deleted(object).await,
            FeedEvent::Synced => {
                tracing::debug!("Ignoring repeated sync marker");
                Ok(())
            }
        }
    }

    async fn on_added(&mut self, object: F::Object) -> Result<()> {
        let Some(secret) = self.decode(object) else {
            return Ok(());
        };
        self.apply(secret, None).await
    }

    /// Sync `new` against the filesystem, then drop what `old` wrote that
    /// `new` no longer owns. `old` never feeds the skip decision.
    async fn on_updated(&mut self, old: F::Object, new: F::Object) -> Result<()> {
        let Some(secret) = self.decode(new) else {
            return Ok(());
        };
        let previous = match old.decode(self.engine.annotation()) {
            Ok(previous) => Some(previous),
            Err(e) => {
                tracing::debug!(error = %e, "Previous version not decodable, skipping cleanup");
                None
            }
        };
        self.apply(secret, previous).await
    }

    async fn on_deleted(&mut self, object: F::Object) -> Result<()> {
        let Some(secret) = self.decode(object) else {
            return Ok(());
        };
        let span = self.secret_span(&secret);
        let engine = self.engine.clone();

        let result = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            engine.remove_secret(&secret)
        })
        .await?;

        self.record_removal(result, "Failed to remove secret");
        Ok(())
    }

    async fn apply(&mut self, secret: Secret, previous: Option<Secret>) -> Result<()> {
        let span = self.secret_span(&secret);
        let engine = self.engine.clone();

        let (synced, superseded) = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            let synced = engine.sync_secret(&secret);
            let superseded = previous.map(|previous| engine.remove_superseded(&previous, &secret));
            (synced, superseded)
        })
        .await?;

        match synced {
            Ok(report) => {
                self.stats.written += report.written() as u64;
                self.stats.skipped += report.skipped() as u64;
                self.stats.failed += report.failed() as u64;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to sync secret");
                self.stats.failed += 1;
            }
        }
        if let Some(result) = superseded {
            self.record_removal(result, "Failed to remove superseded files");
        }
        Ok(())
    }

    fn record_removal(&mut self, result: Result<RemovalReport>, failure: &str) {
        match result {
            Ok(report) => {
                self.stats.removed += report.removed.len() as u64;
                self.stats.failed += report.errors.len() as u64;
            }
            Err(e) => {
                tracing::error!(error = %e, "{}", failure);
                self.stats.failed += 1;
            }
        }
    }

    /// Shape errors are logged and counted, never fatal.
    fn decode(&mut self, object: F::Object) -> Option<Secret> {
        match object.decode(self.engine.annotation()) {
            Ok(secret) => Some(secret),
            Err(e) => {
                tracing::warn!(error = %e, "Dropping notification");
                self.stats.dropped += 1;
                None
            }
        }
    }

    fn secret_span(&self, secret: &Secret) -> tracing::Span {
        tracing::info_span!(
            parent: &self.span,
            "secret",
            namespace = secret.namespace().unwrap_or_default(),
            name = secret.name()
        )
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}
