//! Shared test utilities for the secret-injector workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`secret`]: [`SecretBuilder`] for typed and wire-format secret objects
//! - [`output`]: [`TestOutput`] temporary materialization root with assertions

pub mod output;
pub mod secret;

pub use output::TestOutput;
pub use secret::{SecretBuilder, TEST_PATH_ANNOTATION};
