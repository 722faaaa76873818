//! Configuration schema definitions for split-test.
//!
//! Every section and field is optional; a missing file or an empty file
//! yields the defaults below. Command-line flags override these values.
//!
//! # Schema Overview
//!
//! ```text
//! Config (root)
//! ├── SplitConfig       - Node count, default weight, heavy-file threshold
//! ├── DiscoveryConfig   - Where test files live and how they are named
//! └── ReportsConfig     - Where historical reports are read from
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::discovery::glob::{DEFAULT_TEST_DIR, DEFAULT_TEST_PATTERN};
use crate::reconcile::DEFAULT_WEIGHT;
use crate::report::ReportFormat;

/// Root configuration structure for split-test.
///
/// # TOML Structure
///
/// ```toml
/// [split]
/// node_total = 4
/// default_weight = 1.0
/// example_threshold = 30.0
///
/// [discovery]
/// test_dir = "spec"
/// test_pattern = "**/*_spec.rb"
///
/// [reports]
/// paths = ["tmp/rspec"]
/// format = "json"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Balancing settings.
    #[serde(default)]
    pub split: SplitConfig,

    /// Test file discovery settings.
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Historical report settings.
    #[serde(default)]
    pub reports: ReportsConfig,
}

/// Balancing settings.
///
/// # Defaults
///
/// | Field | Default |
/// |-------|---------|
/// | `node_total` | 1 |
/// | `default_weight` | 1.0 |
/// | `example_threshold` | None (never split) |
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SplitConfig {
    /// Number of parallel nodes the suite is split across.
    ///
    /// Usually overridden per CI job with `--node-total`.
    #[serde(default = "default_node_total")]
    pub node_total: usize,

    /// Seconds assumed for a test file with no historical timing.
    #[serde(default = "default_weight")]
    pub default_weight: f64,

    /// Files whose total time is at or above this many seconds are split
    /// into individual examples.
    #[serde(default)]
    pub example_threshold: Option<f64>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            node_total: default_node_total(),
            default_weight: default_weight(),
            example_threshold: None,
        }
    }
}

fn default_node_total() -> usize {
    1
}

fn default_weight() -> f64 {
    DEFAULT_WEIGHT
}

/// Test file discovery settings.
///
/// # Defaults
///
/// | Field | Default |
/// |-------|---------|
/// | `test_dir` | `"spec"` |
/// | `test_pattern` | `"**/*_spec.rb"` |
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Directory searched for test files.
    #[serde(default = "default_test_dir")]
    pub test_dir: PathBuf,

    /// Glob matched against paths relative to `test_dir`.
    #[serde(default = "default_test_pattern")]
    pub test_pattern: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            test_dir: default_test_dir(),
            test_pattern: default_test_pattern(),
        }
    }
}

fn default_test_dir() -> PathBuf {
    PathBuf::from(DEFAULT_TEST_DIR)
}

fn default_test_pattern() -> String {
    DEFAULT_TEST_PATTERN.to_string()
}

/// Historical report settings.
///
/// Each path may be a report file or a directory searched recursively.
/// When `format` is omitted it is inferred per file from the extension
/// (`.xml` is JUnit, `.json` is RSpec JSON).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReportsConfig {
    #[serde(default)]
    pub paths: Vec<PathBuf>,

    #[serde(default)]
    pub format: Option<ReportFormat>,
}
