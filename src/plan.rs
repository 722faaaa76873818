//! End-to-end planning for one invocation.
//!
//! The [`Planner`] runs the full pipeline:
//!
//! ```text
//! discover ─► load reports ─► file timings ─► reconcile ─► split heavy ─► balance
//! ```
//!
//! and returns a [`Plan`] holding the node assignments plus everything the
//! summary report needs to explain them.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::balancer::{Balancer, LoadStats, Node};
use crate::config::Config;
use crate::discovery::TestDiscoverer;
use crate::error::{SplitError, SplitResult};
use crate::reconcile::{DEFAULT_WEIGHT, reconcile};
use crate::report::{ReportFormat, ReportSet};
use crate::split::split_heavy;
use crate::timing::TimingMap;

/// Inputs to a planning run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Number of parallel nodes.
    pub node_total: usize,

    /// Seconds given to test files with no historical timing.
    pub default_weight: f64,

    /// Files at or above this many seconds are split into examples.
    pub example_threshold: Option<f64>,

    /// Report files or directories to read timings from.
    pub report_paths: Vec<PathBuf>,

    /// Forces a report format instead of inferring it per file.
    pub format: Option<ReportFormat>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            node_total: 1,
            default_weight: DEFAULT_WEIGHT,
            example_threshold: None,
            report_paths: Vec::new(),
            format: None,
        }
    }
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            node_total: config.split.node_total,
            default_weight: config.split.default_weight,
            example_threshold: config.split.example_threshold,
            report_paths: config.reports.paths.clone(),
            format: config.reports.format,
        }
    }
}

/// Result of a planning run.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    /// One entry per node, in index order.
    pub nodes: Vec<Node>,

    /// Final per-unit timings the nodes were balanced on.
    pub timings: TimingMap,

    /// Weight given to files without history.
    pub default_weight: f64,

    /// Files that had no historical timing.
    pub defaulted: BTreeSet<String>,

    /// Heavy files replaced by their examples.
    pub exploded: BTreeSet<String>,

    /// Heavy files kept whole because no example timings matched.
    pub retained: BTreeSet<String>,

    /// Report files that were loaded.
    pub sources: Vec<PathBuf>,
}

impl Plan {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the node at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::InvalidArgument`] if `index` is out of range.
    pub fn node(&self, index: usize) -> SplitResult<&Node> {
        self.nodes.get(index).ok_or_else(|| {
            SplitError::invalid(format!(
                "node index {} is out of range for {} node(s)",
                index,
                self.nodes.len()
            ))
        })
    }

    pub fn stats(&self) -> LoadStats {
        LoadStats::from_nodes(&self.nodes)
    }
}

/// Runs the planning pipeline with fixed [`Settings`].
///
/// # Example
///
/// ```no_run
/// use split_test::discovery::GlobDiscoverer;
/// use split_test::plan::{Planner, Settings};
///
/// # async fn example() -> anyhow::Result<()> {
/// let settings = Settings {
///     node_total: 4,
///     report_paths: vec!["tmp/rspec".into()],
///     ..Settings::default()
/// };
/// let discoverer = GlobDiscoverer::new("spec", "**/*_spec.rb")?;
///
/// let plan = Planner::new(settings).plan(&discoverer).await?;
/// for unit in plan.node(0)?.units() {
///     println!("{}", unit);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Planner {
    settings: Settings,
}

impl Planner {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Discovers tests, loads reports and balances the suite.
    ///
    /// # Errors
    ///
    /// - [`SplitError::MissingInput`] if discovery finds no test files
    /// - [`SplitError::InvalidArgument`] for a zero node count, a bad
    ///   default weight or a bad threshold
    /// - [`SplitError::Discovery`] if discovery fails
    pub async fn plan(&self, discoverer: &dyn TestDiscoverer) -> SplitResult<Plan> {
        let settings = &self.settings;
        // Reject bad arguments before touching the filesystem.
        let balancer = Balancer::new(settings.node_total)?;

        let files = discoverer.discover().await?;
        info!(
            "Discovered {} test file(s) with the {} discoverer",
            files.len(),
            discoverer.name()
        );
        if files.is_empty() {
            return Err(SplitError::MissingInput);
        }

        let reports = ReportSet::load(&settings.report_paths, settings.format).await;
        if reports.is_empty() {
            warn!("No test reports loaded, using equal execution time for all test files");
        }

        let file_timings = reports.file_timings();
        debug!("Extracted timings for {} file(s) from reports", file_timings.len());

        let reconciled = reconcile(file_timings, &files, settings.default_weight)?;
        let outcome = split_heavy(
            reconciled.timings,
            || reports.example_timings(),
            settings.example_threshold,
        )?;

        let nodes = balancer.balance(&outcome.timings);
        info!(
            "Balanced {} unit(s) across {} node(s)",
            outcome.timings.len(),
            nodes.len()
        );

        Ok(Plan {
            nodes,
            timings: outcome.timings,
            default_weight: settings.default_weight,
            defaulted: reconciled.defaulted,
            exploded: outcome.exploded,
            retained: outcome.retained,
            sources: reports.paths().map(PathBuf::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::StaticDiscoverer;

    const RSPEC_JSON: &str = r#"{
        "examples": [
            {"id": "./spec/models/user_spec.rb[1:1]", "file_path": "./spec/models/user_spec.rb", "run_time": 2.5},
            {"id": "./spec/models/user_spec.rb[1:2]", "file_path": "./spec/models/user_spec.rb", "run_time": 1.8},
            {"id": "./spec/models/post_spec.rb[1:1]", "file_path": "./spec/models/post_spec.rb", "run_time": 5.3},
            {"id": "./spec/deleted_spec.rb[1:1]", "file_path": "./spec/deleted_spec.rb", "run_time": 9.0}
        ]
    }"#;

    fn write_report(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("rspec.json");
        std::fs::write(&path, RSPEC_JSON).unwrap();
        path
    }

    fn discoverer() -> StaticDiscoverer {
        StaticDiscoverer::new([
            "spec/models/user_spec.rb",
            "spec/models/post_spec.rb",
            "spec/models/orphan_spec.rb",
        ])
    }

    #[tokio::test]
    async fn test_plan_reconciles_and_balances() {
        let dir = tempfile::tempdir().unwrap();
        let report = write_report(&dir);
        let settings = Settings {
            node_total: 2,
            report_paths: vec![report.clone()],
            ..Settings::default()
        };

        let plan = Planner::new(settings).plan(&discoverer()).await.unwrap();

        assert_eq!(plan.node_count(), 2);
        assert_eq!(plan.sources, vec![report]);
        assert!(!plan.timings.contains("spec/deleted_spec.rb"));
        assert_eq!(plan.timings.get("spec/models/orphan_spec.rb"), Some(1.0));
        assert!(plan.defaulted.contains("spec/models/orphan_spec.rb"));
        assert_eq!(plan.defaulted.len(), 1);

        assert_eq!(plan.node(0).unwrap().units(), ["spec/models/post_spec.rb"]);
        assert_eq!(
            plan.node(1).unwrap().units(),
            ["spec/models/user_spec.rb", "spec/models/orphan_spec.rb"]
        );
    }

    #[tokio::test]
    async fn test_plan_splits_heavy_files() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            node_total: 2,
            example_threshold: Some(4.0),
            report_paths: vec![write_report(&dir)],
            ..Settings::default()
        };

        let plan = Planner::new(settings).plan(&discoverer()).await.unwrap();

        assert_eq!(
            plan.exploded.iter().collect::<Vec<_>>(),
            vec!["spec/models/post_spec.rb", "spec/models/user_spec.rb"]
        );
        assert!(plan.timings.contains("spec/models/user_spec.rb[1:1]"));
        assert!(plan.timings.contains("spec/models/post_spec.rb[1:1]"));
        assert!(!plan.timings.contains("spec/models/user_spec.rb"));
        assert!(plan.timings.contains("spec/models/orphan_spec.rb"));
    }

    #[tokio::test]
    async fn test_plan_without_reports_uses_equal_weights() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            node_total: 3,
            report_paths: vec![dir.path().join("missing")],
            ..Settings::default()
        };

        let plan = Planner::new(settings).plan(&discoverer()).await.unwrap();

        assert!(plan.sources.is_empty());
        assert_eq!(plan.defaulted.len(), 3);
        assert!(plan.nodes.iter().all(|node| node.len() == 1 && node.total() == 1.0));
    }

    #[tokio::test]
    async fn test_plan_no_tests_found() {
        let planner = Planner::new(Settings::default());
        let result = planner.plan(&StaticDiscoverer::default()).await;
        assert!(matches!(result, Err(SplitError::MissingInput)));
    }

    #[tokio::test]
    async fn test_plan_rejects_zero_nodes() {
        let settings = Settings {
            node_total: 0,
            ..Settings::default()
        };
        let result = Planner::new(settings).plan(&discoverer()).await;
        assert!(matches!(result, Err(SplitError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_node_index_out_of_range() {
        let settings = Settings {
            node_total: 2,
            ..Settings::default()
        };
        let plan = Planner::new(settings).plan(&discoverer()).await.unwrap();

        assert!(plan.node(1).is_ok());
        assert!(matches!(plan.node(2), Err(SplitError::InvalidArgument(_))));
    }

    #[test]
    fn test_settings_from_config() {
        let config = crate::config::load_config_str(
            r#"
            [split]
            node_total = 6
            example_threshold = 20.0

            [reports]
            paths = ["tmp/rspec"]
            "#,
        )
        .unwrap();

        let settings = Settings::from_config(&config);
        assert_eq!(settings.node_total, 6);
        assert_eq!(settings.example_threshold, Some(20.0));
        assert_eq!(settings.default_weight, DEFAULT_WEIGHT);
        assert_eq!(settings.report_paths, vec![PathBuf::from("tmp/rspec")]);
        assert_eq!(settings.format, None);
    }
}
