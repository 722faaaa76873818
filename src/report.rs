//! Test report ingestion and output generation.
//!
//! This module turns historical test reports into [`TimingMap`]s and
//! provides the report-side utilities of the CLI.
//!
//! # Supported Formats
//!
//! | Format | Extension | Record | Identifier | Duration |
//! |--------|-----------|--------|------------|----------|
//! | JUnit XML | `.xml` | `<testcase>` | `file`, then `filepath`, then `id` | `time` |
//! | RSpec JSON | `.json` | `examples[]` | `id`, then `file_path` | `run_time` |
//!
//! Both formats can carry composite identifiers such as
//! `./spec/models/user_spec.rb[1:2]`. The file identifier is the part before
//! the first `[`; the full composite is the example identifier used when
//! splitting heavy files.
//!
//! # Ingestion
//!
//! [`ReportSet::load`] reads report files concurrently and keeps their
//! contents. [`ReportSet::file_timings`] and [`ReportSet::example_timings`]
//! parse and merge them at the requested granularity. A report that fails
//! to parse is skipped with a warning.

pub mod json;
pub mod junit;
pub mod merge;
pub mod summary;

use std::path::{Path, PathBuf};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::SplitResult;
use crate::timing::TimingMap;

pub use merge::{MergeSummary, merge_junit_files};

/// Report file format.
///
/// Selected explicitly by the caller or inferred from the file extension
/// with [`ReportFormat::from_path`].
///
/// # Example
///
/// ```toml
/// [reports]
/// paths = ["tmp/rspec"]
/// format = "json"
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    Deserialize,
    Serialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// JUnit XML, as written by `rspec_junit_formatter` and most CI tooling.
    Junit,

    /// RSpec's built-in JSON formatter (`--format json`).
    Json,
}

/// Which identifiers a parse should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// One entry per test file; records of the same file are summed.
    File,

    /// One entry per composite example identifier. Records without a
    /// bracketed locator are left out.
    Example,
}

impl ReportFormat {
    /// Infers the format from a file extension.
    ///
    /// Returns `None` for files that are not reports.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xml") => Some(ReportFormat::Junit),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Some(ReportFormat::Json),
            _ => None,
        }
    }

    /// File extension used when scanning directories for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Junit => "xml",
            ReportFormat::Json => "json",
        }
    }

    /// Parses one report's content.
    ///
    /// Empty or whitespace-only content yields an empty map.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SplitError::Parse`] naming `source` when the content
    /// is not a well-formed document of this format.
    pub fn parse(
        &self,
        content: &str,
        source: &Path,
        granularity: Granularity,
    ) -> SplitResult<TimingMap> {
        if content.trim().is_empty() {
            return Ok(TimingMap::new());
        }
        match self {
            ReportFormat::Junit => junit::parse(content, source, granularity),
            ReportFormat::Json => json::parse(content, source, granularity),
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Junit => write!(f, "junit"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

/// Converts a raw duration field to seconds.
///
/// Missing, non-numeric, negative and non-finite values become `0.0`.
pub(crate) fn coerce_seconds(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .map(clamp_seconds)
        .unwrap_or(0.0)
}

pub(crate) fn clamp_seconds(seconds: f64) -> f64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    }
}

/// A report file that was read successfully.
#[derive(Debug, Clone)]
pub struct ReportSource {
    pub path: PathBuf,
    pub format: ReportFormat,
    content: String,
}

impl ReportSource {
    pub fn new(path: impl Into<PathBuf>, format: ReportFormat, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            format,
            content: content.into(),
        }
    }

    fn parse(&self, granularity: Granularity) -> SplitResult<TimingMap> {
        self.format.parse(&self.content, &self.path, granularity)
    }
}

/// The set of report files loaded for one invocation.
#[derive(Debug, Clone, Default)]
pub struct ReportSet {
    sources: Vec<ReportSource>,
}

impl ReportSet {
    pub fn from_sources(sources: impl IntoIterator<Item = ReportSource>) -> Self {
        let mut sources: Vec<_> = sources.into_iter().collect();
        sources.sort_by(|a, b| a.path.cmp(&b.path));
        Self { sources }
    }

    /// Lists the report files reachable from `paths`.
    ///
    /// Files are taken as-is; directories are searched recursively for
    /// files with a report extension (only `format`'s extension when a
    /// format is forced). Paths that do not exist are skipped with a
    /// warning. The result is sorted and deduplicated.
    pub fn collect(paths: &[PathBuf], format: Option<ReportFormat>) -> Vec<(PathBuf, ReportFormat)> {
        let mut found = Vec::new();

        for path in paths {
            if path.is_dir() {
                for entry in WalkDir::new(path)
                    .follow_links(true)
                    .into_iter()
                    .filter_map(Result::ok)
                    .filter(|entry| entry.file_type().is_file())
                {
                    let detected = ReportFormat::from_path(entry.path());
                    let selected = match (format, detected) {
                        (Some(forced), Some(detected)) if forced == detected => Some(forced),
                        (None, detected) => detected,
                        _ => None,
                    };
                    if let Some(selected) = selected {
                        found.push((entry.into_path(), selected));
                    }
                }
            } else if path.is_file() {
                match format.or_else(|| ReportFormat::from_path(path)) {
                    Some(selected) => found.push((path.clone(), selected)),
                    None => warn!(
                        "Skipping {}: cannot tell report format from extension (use --format)",
                        path.display()
                    ),
                }
            } else {
                warn!("Report path not found: {}", path.display());
            }
        }

        found.sort();
        found.dedup();
        found
    }

    /// Reads every report reachable from `paths`.
    ///
    /// Files are read concurrently. Files that disappear, cannot be read,
    /// or are empty are skipped; reports are best-effort hints.
    pub async fn load(paths: &[PathBuf], format: Option<ReportFormat>) -> Self {
        let candidates = Self::collect(paths, format);

        let reads = candidates.into_iter().map(|(path, format)| async move {
            match tokio::fs::read_to_string(&path).await {
                Ok(content) if content.trim().is_empty() => {
                    debug!("Skipping empty report: {}", path.display());
                    None
                }
                Ok(content) => Some(ReportSource::new(path, format, content)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("Report vanished before it could be read: {}", path.display());
                    None
                }
                Err(e) => {
                    warn!("Failed to read report {}: {}", path.display(), e);
                    None
                }
            }
        });

        let set = Self::from_sources(join_all(reads).await.into_iter().flatten());
        info!("Loaded {} report file(s)", set.len());
        set
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.sources.iter().map(|source| source.path.as_path())
    }

    /// Per-file timings merged across all reports.
    pub fn file_timings(&self) -> TimingMap {
        self.merged(Granularity::File)
    }

    /// Per-example timings merged across all reports.
    pub fn example_timings(&self) -> TimingMap {
        self.merged(Granularity::Example)
    }

    fn merged(&self, granularity: Granularity) -> TimingMap {
        let parsed = self
            .sources
            .iter()
            .filter_map(|source| match source.parse(granularity) {
                Ok(timings) => {
                    debug!(
                        "Parsed {} {:?} entries from {}",
                        timings.len(),
                        granularity,
                        source.path.display()
                    );
                    Some(timings)
                }
                Err(e) => {
                    warn!("Skipping report: {}", e);
                    None
                }
            });
        TimingMap::merge(parsed)
    }
}
