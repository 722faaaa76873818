//! Human-readable distribution report.
//!
//! Explains where each node's files came from and how even the split is:
//!
//! ```text
//! === Test Balancing Debug Info ===
//!
//! ## Loaded Test Result Files
//!   - tmp/rspec/node-0.json
//!   Total: 1 report files, 3 test files extracted
//!
//! ## Timing Data Source (from past test execution results)
//!   - Files with historical timing: 2 files
//!   - Files with default timing (1.0s): 1 files
//!   - Total files: 3 files
//!   - Total estimated time: 10.6s
//!
//! ## Load Balance
//!   - Average time per node: 5.3s
//!   - Max deviation from average: 0.0%
//!
//! ## Per-Node Distribution
//! Node 0: 1 files, 5.3s (+0.0% from avg)
//!   - spec/models/post_spec.rb (5.3s)
//!
//! Node 1: 2 files, 5.3s (+0.0% from avg)
//!   - spec/models/user_spec.rb (4.3s)
//!   - spec/models/orphan_spec.rb (1.0s, default - no historical data)
//!
//! ====================================
//! ```

use std::fmt::Write;

use console::style;

use crate::plan::Plan;
use crate::timing::{file_part, is_example_id};

const HEADER: &str = "=== Test Balancing Debug Info ===";
const FOOTER: &str = "====================================";

/// Renders the report as plain text.
pub fn render(plan: &Plan) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_report(&mut out, plan);
    out
}

/// Prints the report to stderr, with section headings highlighted.
pub fn print(plan: &Plan) {
    for line in render(plan).lines() {
        if line.starts_with("===") || line.starts_with("## ") {
            eprintln!("{}", style(line).bold().for_stderr());
        } else if line.starts_with("Node ") {
            eprintln!("{}", style(line).cyan().for_stderr());
        } else {
            eprintln!("{}", line);
        }
    }
}

fn write_report(out: &mut String, plan: &Plan) -> std::fmt::Result {
    let split_examples = plan.timings.ids().filter(|id| is_split_example(plan, id)).count();
    let total_files = plan.timings.len() - split_examples;
    let total_time = plan.timings.total();
    let stats = plan.stats();

    writeln!(out, "{}", HEADER)?;
    writeln!(out)?;

    writeln!(out, "## Loaded Test Result Files")?;
    if plan.sources.is_empty() {
        writeln!(out, "  (no report files loaded)")?;
    } else {
        for source in &plan.sources {
            writeln!(out, "  - {}", source.display())?;
        }
        writeln!(
            out,
            "  Total: {} report files, {} test files extracted",
            plan.sources.len(),
            total_files
        )?;
    }
    writeln!(out)?;

    writeln!(out, "## Timing Data Source (from past test execution results)")?;
    writeln!(
        out,
        "  - Files with historical timing: {} files",
        total_files.saturating_sub(plan.defaulted.len())
    )?;
    writeln!(
        out,
        "  - Files with default timing ({}s): {} files",
        seconds(plan.default_weight),
        plan.defaulted.len()
    )?;
    if split_examples > 0 {
        writeln!(
            out,
            "  - Examples split from heavy files: {} examples ({} files)",
            split_examples,
            plan.exploded.len()
        )?;
    }
    if !plan.retained.is_empty() {
        writeln!(
            out,
            "  - Heavy files kept whole (examples missing or incomplete): {} files",
            plan.retained.len()
        )?;
        for file in &plan.retained {
            writeln!(out, "    - {}", file)?;
        }
    }
    writeln!(out, "  - Total files: {} files", total_files)?;
    writeln!(out, "  - Total estimated time: {}s", seconds(total_time))?;
    writeln!(out)?;

    writeln!(out, "## Load Balance")?;
    writeln!(out, "  - Average time per node: {}s", seconds(stats.mean))?;
    writeln!(
        out,
        "  - Max deviation from average: {}%",
        seconds(stats.max_deviation)
    )?;
    writeln!(out)?;

    writeln!(out, "## Per-Node Distribution")?;
    for (index, (node, deviation)) in plan.nodes.iter().zip(&stats.deviations).enumerate() {
        let sign = if *deviation >= 0.0 { "+" } else { "" };
        writeln!(
            out,
            "Node {}: {} files, {}s ({}{}% from avg)",
            index,
            node.len(),
            seconds(node.total()),
            sign,
            seconds(*deviation)
        )?;
        for unit in node.units() {
            writeln!(out, "  - {} {}", unit, unit_label(plan, unit))?;
        }
        writeln!(out)?;
    }

    writeln!(out, "{}", FOOTER)
}

/// `(1.25s)`, plus where the timing came from when it is not a report.
fn unit_label(plan: &Plan, unit: &str) -> String {
    let mut label = format!("({}s", seconds(plan.timings.get(unit).unwrap_or(0.0)));
    if plan.defaulted.contains(unit) {
        label.push_str(", default - no historical data");
    } else if is_split_example(plan, unit) {
        label.push_str(", split from heavy file");
    } else if plan.retained.contains(unit) {
        label.push_str(", heavy file kept whole");
    }
    label.push(')');
    label
}

fn is_split_example(plan: &Plan, unit: &str) -> bool {
    is_example_id(unit) && plan.exploded.contains(file_part(unit))
}

/// Rounds to two decimals, always keeping at least one (`1.0`, `5.25`).
fn seconds(value: f64) -> String {
    // `+ 0.0` turns -0.0 into 0.0.
    let rounded = (value * 100.0).round() / 100.0 + 0.0;
    if rounded.fract() == 0.0 {
        format!("{:.1}", rounded)
    } else {
        format!("{}", rounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    use crate::balancer::balance;
    use crate::timing::TimingMap;

    fn plan(entries: &[(&str, f64)], node_total: usize) -> Plan {
        let mut timings = TimingMap::new();
        for (id, secs) in entries {
            timings.record(*id, *secs).unwrap();
        }
        Plan {
            nodes: balance(&timings, node_total).unwrap(),
            timings,
            default_weight: 1.0,
            defaulted: BTreeSet::new(),
            exploded: BTreeSet::new(),
            retained: BTreeSet::new(),
            sources: Vec::new(),
        }
    }

    #[test]
    fn test_seconds_format() {
        assert_eq!(seconds(1.0), "1.0");
        assert_eq!(seconds(5.3), "5.3");
        assert_eq!(seconds(1.234), "1.23");
        assert_eq!(seconds(-26.4), "-26.4");
        assert_eq!(seconds(0.0), "0.0");
    }

    #[test]
    fn test_render_full_report() {
        let mut plan = plan(
            &[
                ("spec/a_spec.rb", 3.0),
                ("spec/b_spec.rb", 1.0),
                ("spec/c_spec.rb", 2.0),
            ],
            2,
        );
        plan.defaulted.insert("spec/b_spec.rb".to_string());
        plan.sources.push(PathBuf::from("tmp/rspec.json"));

        let expected = "\
=== Test Balancing Debug Info ===

## Loaded Test Result Files
  - tmp/rspec.json
  Total: 1 report files, 3 test files extracted

## Timing Data Source (from past test execution results)
  - Files with historical timing: 2 files
  - Files with default timing (1.0s): 1 files
  - Total files: 3 files
  - Total estimated time: 6.0s

## Load Balance
  - Average time per node: 3.0s
  - Max deviation from average: 0.0%

## Per-Node Distribution
Node 0: 1 files, 3.0s (+0.0% from avg)
  - spec/a_spec.rb (3.0s)

Node 1: 2 files, 3.0s (+0.0% from avg)
  - spec/c_spec.rb (2.0s)
  - spec/b_spec.rb (1.0s, default - no historical data)

====================================
";
        assert_eq!(render(&plan), expected);
    }

    #[test]
    fn test_render_no_reports_and_deviation() {
        let plan = plan(&[("spec/a_spec.rb", 5.5), ("spec/b_spec.rb", 3.2)], 2);
        let text = render(&plan);

        assert!(text.contains("  (no report files loaded)"));
        assert!(text.contains("Node 0: 1 files, 5.5s (+26.4% from avg)"));
        assert!(text.contains("Node 1: 1 files, 3.2s (-26.4% from avg)"));
        assert!(text.contains("  - Max deviation from average: 26.4%"));
    }

    #[test]
    fn test_render_marks_split_examples() {
        let mut plan = plan(
            &[("spec/heavy_spec.rb[1:1]", 4.0), ("spec/heavy_spec.rb[1:2]", 3.0)],
            1,
        );
        plan.exploded.insert("spec/heavy_spec.rb".to_string());

        let text = render(&plan);
        assert!(text.contains("  - spec/heavy_spec.rb[1:1] (4.0s, split from heavy file)"));
        assert!(text.contains("  - spec/heavy_spec.rb[1:2] (3.0s, split from heavy file)"));
    }

    #[test]
    fn test_render_counts_examples_apart_from_files() {
        let mut plan = plan(
            &[
                ("spec/heavy_spec.rb[1:1]", 4.0),
                ("spec/heavy_spec.rb[1:2]", 3.0),
                ("spec/slow_spec.rb", 12.0),
                ("spec/light_spec.rb", 1.0),
            ],
            2,
        );
        plan.exploded.insert("spec/heavy_spec.rb".to_string());
        plan.retained.insert("spec/slow_spec.rb".to_string());

        let text = render(&plan);
        assert!(text.contains("  - Files with historical timing: 2 files\n"));
        assert!(text.contains("  - Examples split from heavy files: 2 examples (1 files)\n"));
        assert!(text.contains(
            "  - Heavy files kept whole (examples missing or incomplete): 1 files\n    - spec/slow_spec.rb\n"
        ));
        assert!(text.contains("  - Total files: 2 files\n"));
        assert!(text.contains("  - spec/slow_spec.rb (12.0s, heavy file kept whole)"));
    }
}
