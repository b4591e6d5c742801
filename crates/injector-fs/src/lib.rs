//! Filesystem layer for Secret Injector
//!
//! Provides content digests, atomic write-then-rename I/O and
//! format-detecting configuration loading.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod path;

pub use checksum::{Digest, digest};
pub use config::{ConfigStore, Format};
pub use error::{Error, Result};
pub use io::{RobustnessConfig, WriteOptions};
pub use path::{item_path, validate_base, validate_key};
