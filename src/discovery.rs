//! Test file discovery.
//!
//! Discovery produces the authoritative set of test files: every file the
//! balancer must place on some node, whether or not reports mention it.
//!
//! # Built-in Discoverers
//!
//! | Discoverer | Source |
//! |------------|--------|
//! | [`glob::GlobDiscoverer`] | Files under a directory matching a glob, e.g. `spec/**/*_spec.rb` |
//! | [`StaticDiscoverer`] | A fixed list supplied by the caller |
//!
//! # Custom Discoverers
//!
//! ```no_run
//! use std::collections::BTreeSet;
//! use async_trait::async_trait;
//! use split_test::discovery::{DiscoveryResult, TestDiscoverer};
//!
//! struct FromManifest;
//!
//! #[async_trait]
//! impl TestDiscoverer for FromManifest {
//!     async fn discover(&self) -> DiscoveryResult<BTreeSet<String>> {
//!         let manifest = tokio::fs::read_to_string("tests.txt").await?;
//!         Ok(manifest.lines().map(String::from).collect())
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "manifest"
//!     }
//! }
//! ```

pub mod glob;

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::timing::normalize_path;

pub use glob::GlobDiscoverer;

/// Result type for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Errors that can occur during test discovery.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// The glob pattern could not be compiled.
    #[error("Invalid test pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// I/O error reading files or directories.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking discovery task failed to complete.
    #[error("Discovery task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Finds the test files that make up the suite.
#[async_trait]
pub trait TestDiscoverer: Send + Sync {
    /// Returns normalized test file identifiers.
    async fn discover(&self) -> DiscoveryResult<BTreeSet<String>>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Discoverer that returns a fixed list of files.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscoverer {
    files: BTreeSet<String>,
}

impl StaticDiscoverer {
    pub fn new<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            files: files
                .into_iter()
                .map(|file| normalize_path(file.as_ref()).to_string())
                .collect(),
        }
    }
}

#[async_trait]
impl TestDiscoverer for StaticDiscoverer {
    async fn discover(&self) -> DiscoveryResult<BTreeSet<String>> {
        Ok(self.files.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
