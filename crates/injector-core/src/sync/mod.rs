//! Filesystem sync engine
//!
//! This module provides:
//! - **sync**: materialize a secret's items, writing only what changed
//! - **check**: compare a secret against the filesystem without writing
//! - **remove**: delete the artifacts of a secret that no longer exists

mod engine;
mod report;

pub use engine::SyncEngine;
pub use report::{
    CheckReport, CheckStatus, DriftItem, ItemReport, RemovalReport, SecretReport, SyncOutcome,
};
