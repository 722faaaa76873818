//! split-test: Balance a test suite across parallel CI nodes.
//!
//! Historical test reports (JUnit XML or RSpec JSON) say how long each test
//! file took. This crate turns those reports into per-file timings and
//! assigns the files to N nodes so that every node finishes at about the
//! same time.
//!
//! # Architecture
//!
//! The pipeline, leaves first:
//!
//! - **Report**: Parse JUnit XML and RSpec JSON into [`TimingMap`]s
//! - **Discovery**: Find the test files that exist on disk
//! - **Reconcile**: Drop stale timings and default the missing ones
//! - **Split**: Optionally break heavy files into individual examples
//! - **Balancer**: Greedy longest-first assignment across nodes
//! - **Plan**: Run all of the above for one invocation
//!
//! # Example
//!
//! ```no_run
//! use split_test::discovery::GlobDiscoverer;
//! use split_test::plan::{Planner, Settings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings {
//!         node_total: 4,
//!         report_paths: vec!["tmp/rspec".into()],
//!         ..Settings::default()
//!     };
//!     let discoverer = GlobDiscoverer::new("spec", "**/*_spec.rb")?;
//!     let plan = Planner::new(settings).plan(&discoverer).await?;
//!
//!     for unit in plan.node(0)?.units() {
//!         println!("{}", unit);
//!     }
//!     Ok(())
//! }
//! ```

pub mod balancer;
pub mod config;
pub mod discovery;
pub mod error;
pub mod plan;
pub mod reconcile;
pub mod report;
pub mod split;
pub mod timing;

// Re-export commonly used types
pub use balancer::{Balancer, Node, balance};
pub use config::{Config, load_config};
pub use discovery::TestDiscoverer;
pub use error::{SplitError, SplitResult};
pub use plan::{Plan, Planner, Settings};
pub use reconcile::{DEFAULT_WEIGHT, reconcile};
pub use report::{ReportFormat, ReportSet};
pub use split::split_heavy;
pub use timing::{TimingMap, normalize_path};
