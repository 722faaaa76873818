//! split-test CLI - Balance a test suite across parallel CI nodes.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use split_test::SplitError;
use split_test::config::{self, Config};
use split_test::discovery::GlobDiscoverer;
use split_test::plan::{Plan, Planner, Settings};
use split_test::report::{ReportFormat, merge_junit_files, summary};

#[derive(Parser)]
#[command(name = "split-test")]
#[command(about = "Balance test files across parallel CI nodes using past timings", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path (defaults to split-test.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the test files assigned to one node
    Split {
        /// Index of this node, starting at 0
        #[arg(long)]
        node_index: usize,

        #[command(flatten)]
        plan: PlanArgs,

        /// Print the distribution report to stderr
        #[arg(long)]
        debug: bool,
    },

    /// Print the full plan for every node as JSON
    Plan {
        #[command(flatten)]
        plan: PlanArgs,
    },

    /// Merge several JUnit XML files into one
    MergeJunit {
        /// Merged output file
        output: PathBuf,

        /// JUnit files to merge
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Validate configuration file
    Validate,
}

/// Options shared by `split` and `plan`. Each overrides the config file.
#[derive(Args, Debug, Clone)]
struct PlanArgs {
    /// Total number of parallel nodes
    #[arg(long)]
    node_total: Option<usize>,

    /// Report file or directory to read timings from (repeatable)
    #[arg(long = "report-path", visible_alias = "json-path", value_name = "PATH")]
    report_paths: Vec<PathBuf>,

    /// Report format; inferred from each file's extension when omitted
    #[arg(long, value_enum)]
    format: Option<ReportFormat>,

    /// Directory containing the test files
    #[arg(long)]
    test_dir: Option<PathBuf>,

    /// Glob for test files, relative to the test directory
    #[arg(long)]
    test_pattern: Option<String>,

    /// Split files taking at least this many seconds into examples
    #[arg(long = "split-by-example-threshold", value_name = "SECONDS")]
    example_threshold: Option<f64>,

    /// Seconds assumed for files with no historical timing
    #[arg(long)]
    default_weight: Option<f64>,
}

impl PlanArgs {
    /// Applies the command-line overrides on top of `config`.
    fn apply(self, config: &mut Config) {
        if let Some(node_total) = self.node_total {
            config.split.node_total = node_total;
        }
        if let Some(weight) = self.default_weight {
            config.split.default_weight = weight;
        }
        if self.example_threshold.is_some() {
            config.split.example_threshold = self.example_threshold;
        }
        if !self.report_paths.is_empty() {
            config.reports.paths = self.report_paths;
        }
        if self.format.is_some() {
            config.reports.format = self.format;
        }
        if let Some(test_dir) = self.test_dir {
            config.discovery.test_dir = test_dir;
        }
        if let Some(test_pattern) = self.test_pattern {
            config.discovery.test_pattern = test_pattern;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging; stdout is reserved for results.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Split {
            node_index,
            plan,
            debug,
        } => split_node(config_path, node_index, plan, debug).await,
        Commands::Plan { plan } => print_plan(config_path, plan).await,
        Commands::MergeJunit { output, inputs } => merge_junit(&output, &inputs),
        Commands::Validate => validate_config(config_path),
    }
}

async fn split_node(
    config_path: Option<&Path>,
    node_index: usize,
    args: PlanArgs,
    debug: bool,
) -> Result<()> {
    let Some(plan) = build_plan(config_path, args, Some(node_index)).await? else {
        return Ok(());
    };

    if debug {
        summary::print(&plan);
    }

    let node = plan.node(node_index)?;
    for unit in node.units() {
        println!("{}", unit);
    }

    Ok(())
}

async fn print_plan(config_path: Option<&Path>, args: PlanArgs) -> Result<()> {
    let Some(plan) = build_plan(config_path, args, None).await? else {
        return Ok(());
    };

    let json = serde_json::to_string_pretty(&plan)?;
    println!("{}", json);

    Ok(())
}

/// Loads configuration, applies overrides and runs the planner.
///
/// Returns `None` when there are no tests to split.
async fn build_plan(
    config_path: Option<&Path>,
    args: PlanArgs,
    node_index: Option<usize>,
) -> Result<Option<Plan>> {
    let mut config = config::resolve_config(config_path)?;
    args.apply(&mut config);

    if let Some(index) = node_index {
        if index >= config.split.node_total {
            bail!(
                "--node-index {} must be less than --node-total {}",
                index,
                config.split.node_total
            );
        }
    }

    let discoverer =
        GlobDiscoverer::new(&config.discovery.test_dir, &config.discovery.test_pattern)?;
    let planner = Planner::new(Settings::from_config(&config));

    match planner.plan(&discoverer).await {
        Ok(plan) => Ok(Some(plan)),
        Err(SplitError::MissingInput) => {
            warn!(
                "No test files found in {} matching {}",
                config.discovery.test_dir.display(),
                config.discovery.test_pattern
            );
            Ok(None)
        }
        Err(e) => Err(e).context("Failed to split tests"),
    }
}

fn merge_junit(output: &Path, inputs: &[PathBuf]) -> Result<()> {
    let summary = merge_junit_files(inputs, output)
        .with_context(|| format!("Failed to merge JUnit files into {}", output.display()))?;

    info!(
        "{} tests, {} failures, {} errors, {} skipped, {:.3}s",
        summary.totals.tests,
        summary.totals.failures,
        summary.totals.errors,
        summary.totals.skipped,
        summary.totals.time
    );

    Ok(())
}

fn validate_config(config_path: Option<&Path>) -> Result<()> {
    let checked = config::resolve_config(config_path).and_then(|config| {
        GlobDiscoverer::new(&config.discovery.test_dir, &config.discovery.test_pattern)?;
        Ok(config)
    });

    match checked {
        Ok(config) => {
            println!("Configuration is valid!");
            println!();
            println!("Settings:");
            println!("  Node total: {}", config.split.node_total);
            println!("  Default weight: {}s", config.split.default_weight);
            match config.split.example_threshold {
                Some(threshold) => println!("  Example threshold: {}s", threshold),
                None => println!("  Example threshold: disabled"),
            }
            println!("  Test dir: {}", config.discovery.test_dir.display());
            println!("  Test pattern: {}", config.discovery.test_pattern);

            if config.reports.paths.is_empty() {
                println!("  Reports: none");
            } else {
                for path in &config.reports.paths {
                    println!("  Report path: {}", path.display());
                }
            }
            match config.reports.format {
                Some(format) => println!("  Report format: {}", format),
                None => println!("  Report format: auto"),
            }

            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            std::process::exit(1);
        }
    }
}
