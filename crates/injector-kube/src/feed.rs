//! Watcher-backed [`ChangeFeed`]

use std::collections::VecDeque;
use std::future;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use injector_core::{ChangeFeed, FeedEvent};
use k8s_openapi::api::core::v1::Secret;
use kube::runtime::{WatchStreamExt, watcher};
use kube::{Api, Client};
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::cache::SecretCache;

/// Which secrets to watch.
#[derive(Debug, Clone, Default)]
pub struct WatchScope {
    /// Restrict to one namespace; all namespaces when unset
    pub namespace: Option<String>,
    pub label_selector: Option<String>,
}

/// Streams secret changes from the cluster.
///
/// Emits [`FeedEvent::Synced`] once the first listing is complete. Watch
/// errors are passed on as feed errors while the watcher backs off and
/// reconnects.
pub struct KubeSecretFeed {
    stream: BoxStream<'static, Result<watcher::Event<Secret>, watcher::Error>>,
    cache: SecretCache,
    queue: VecDeque<FeedEvent<Secret>>,
    resync: Option<Interval>,
}

impl KubeSecretFeed {
    pub fn new(client: Client, scope: &WatchScope) -> Self {
        let api: Api<Secret> = match &scope.namespace {
            Some(namespace) => Api::namespaced(client, namespace),
            None => Api::all(client),
        };
        let mut config = watcher::Config::default();
        if let Some(selector) = &scope.label_selector {
            config = config.labels(selector);
        }
        tracing::info!(
            namespace = scope.namespace.as_deref().unwrap_or("*"),
            selector = scope.label_selector.as_deref().unwrap_or(""),
            "Watching secrets"
        );

        Self::from_stream(watcher(api, config).default_backoff().boxed())
    }

    /// Build a feed over any stream of watch events.
    pub fn from_stream(
        stream: BoxStream<'static, Result<watcher::Event<Secret>, watcher::Error>>,
    ) -> Self {
        Self {
            stream,
            cache: SecretCache::new(),
            queue: VecDeque::new(),
            resync: None,
        }
    }

    /// Re-deliver every cached secret as an update each `period`.
    pub fn with_resync(mut self, period: Option<Duration>) -> Self {
        self.resync = period.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        self
    }
}

#[async_trait]
impl ChangeFeed for KubeSecretFeed {
    type Object = Secret;

    async fn next_event(&mut self) -> Option<injector_core::Result<FeedEvent<Secret>>> {
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Some(Ok(event));
            }

            let synced = self.cache.is_synced();
            tokio::select! {
                item = self.stream.next() => match item {
                    Some(Ok(event)) => {
                        let events = self.cache.apply(event);
                        self.queue.extend(events);
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Secret watch failed, backing off");
                        return Some(Err(injector_core::Error::Feed {
                            message: e.to_string(),
                        }));
                    }
                    None => return None,
                },
                _ = tick(&mut self.resync), if synced => {
                    tracing::debug!(objects = self.cache.len(), "Resyncing cached secrets");
                    self.queue.extend(self.cache.resync_events());
                }
            }
        }
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => future::pending().await,
    }
}
