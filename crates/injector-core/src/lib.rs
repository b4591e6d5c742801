//! Secret materialization engine
//!
//! This crate turns secret objects into files and keeps those files in step
//! with the source of truth:
//!
//! - **Secret model**: identity, target path and key-ordered data items with
//!   memoized content digests
//! - **Decoding**: the [`SecretObject`] boundary between feed payloads and
//!   [`Secret`]s
//! - **SyncEngine**: digest-compared, atomic per-item writes and removal of
//!   deleted secrets
//! - **Controller**: consumes a [`ChangeFeed`], holding back work until the
//!   initial listing is complete
//! - **Manifests**: declarative lists of secrets to materialize once
//!
//! # Architecture
//!
//! ```text
//!          injector-cli
//!               |
//!     +---------+---------+
//!     |                   |
//! injector-kube     injector-core
//!     |                   |
//!     +---------+---------+
//!               |
//!          injector-fs
//! ```
//!
//! # Example
//!
//! ```no_run
//! use injector_core::{Secret, SecretId, SyncEngine};
//!
//! fn example() -> injector_core::Result<()> {
//!     let secret = Secret::new(
//!         SecretId::new(Some("default".into()), "app"),
//!         Some("/out/app".into()),
//!         [("password", "s3cr3t")],
//!     );
//!     let report = SyncEngine::default().sync_secret(&secret)?;
//!     assert!(report.is_success());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod controller;
pub mod decode;
pub mod error;
pub mod feed;
pub mod manifest;
pub mod model;
pub mod sync;

pub use config::{DEFAULT_LABEL_SELECTOR, InjectorConfig};
pub use controller::{Controller, RunStats};
pub use decode::SecretObject;
pub use error::{Error, Result};
pub use feed::{ChangeFeed, ChannelFeed, FeedEvent, FeedSender};
pub use manifest::{ManifestEntry, SecretsManifest};
pub use model::{DEFAULT_PATH_ANNOTATION, DataItem, Secret, SecretId};
pub use sync::{
    CheckReport, CheckStatus, DriftItem, ItemReport, RemovalReport, SecretReport, SyncEngine,
    SyncOutcome,
};
