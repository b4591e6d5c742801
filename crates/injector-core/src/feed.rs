//! Change-feed abstraction
//!
//! A change-feed delivers add/update/delete notifications for secret
//! objects, followed by a [`FeedEvent::Synced`] marker once its initial
//! listing is complete. Objects stay opaque until the controller decodes
//! them through [`SecretObject`].

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::decode::SecretObject;
use crate::{Error, Result};

/// A notification from a change-feed.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent<T> {
    Added(T),
    /// `old` is informational only; reconciliation always uses `new`.
    Updated { old: T, new: T },
    Deleted(T),
    /// The initial listing has been fully delivered.
    Synced,
}

/// Source of [`FeedEvent`]s.
#[async_trait]
pub trait ChangeFeed: Send {
    type Object: SecretObject;

    /// Wait for the next event. `None` means the feed has ended.
    async fn next_event(&mut self) -> Option<Result<FeedEvent<Self::Object>>>;
}

/// Create an in-process feed and the handle used to drive it.
pub fn channel<T: SecretObject>(capacity: usize) -> (FeedSender<T>, ChannelFeed<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (FeedSender { tx }, ChannelFeed { rx })
}

/// A [`ChangeFeed`] backed by a bounded channel.
#[derive(Debug)]
pub struct ChannelFeed<T> {
    rx: mpsc::Receiver<Result<FeedEvent<T>>>,
}

#[async_trait]
impl<T: SecretObject> ChangeFeed for ChannelFeed<T> {
    type Object = T;

    async fn next_event(&mut self) -> Option<Result<FeedEvent<T>>> {
        self.rx.recv().await
    }
}

/// Sending half of [`channel`]. The feed ends when every sender is dropped.
#[derive(Debug)]
pub struct FeedSender<T> {
    tx: mpsc::Sender<Result<FeedEvent<T>>>,
}

impl<T> Clone for FeedSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T: SecretObject> FeedSender<T> {
    pub async fn send(&self, event: FeedEvent<T>) -> Result<()> {
        self.send_raw(Ok(event)).await
    }

    pub async fn added(&self, object: T) -> Result<()> {
        self.send(FeedEvent::Added(object)).await
    }

    pub async fn updated(&self, old: T, new: T) -> Result<()> {
        self.send(FeedEvent::Updated { old, new }).await
    }

    pub async fn deleted(&self, object: T) -> Result<()> {
        self.send(FeedEvent::Deleted(object)).await
    }

    pub async fn synced(&self) -> Result<()> {
        self.send(FeedEvent::Synced).await
    }

    /// Deliver a feed-level failure.
    pub async fn error(&self, message: impl Into<String>) -> Result<()> {
        self.send_raw(Err(Error::Feed {
            message: message.into(),
        }))
        .await
    }

    async fn send_raw(&self, item: Result<FeedEvent<T>>) -> Result<()> {
        self.tx.send(item).await.map_err(|_| Error::Feed {
            message: "change feed receiver dropped".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[tokio::test]
    async fn channel_delivers_in_order_and_ends() {
        let (tx, mut feed) = channel::<Value>(8);
        tx.added(json!({"n": 1})).await.unwrap();
        tx.synced().await.unwrap();
        tx.error("boom").await.unwrap();
        drop(tx);

        assert_eq!(
            feed.next_event().await.unwrap().unwrap(),
            FeedEvent::Added(json!({"n": 1}))
        );
        assert_eq!(feed.next_event().await.unwrap().unwrap(), FeedEvent::Synced);
        assert!(matches!(
            feed.next_event().await,
            Some(Err(Error::Feed { .. }))
        ));
        assert!(feed.next_event().await.is_none());
    }

    #[tokio::test]
    async fn send_after_feed_dropped_fails() {
        let (tx, feed) = channel::<Value>(1);
        drop(feed);
        assert!(tx.synced().await.is_err());
    }
}
