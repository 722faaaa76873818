//! Splitting heavy test files into individual examples.
//!
//! A single slow file can hold more time than a node should carry. When a
//! threshold is configured, every file at or above it is replaced by its
//! individual examples (`spec/a_spec.rb[1:1]`, `spec/a_spec.rb[1:2]`, ...),
//! which the balancer can then spread across nodes.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{SplitError, SplitResult};
use crate::timing::TimingMap;

/// Relative slack when checking that examples account for a file's time.
const COVERAGE_TOLERANCE: f64 = 1e-6;

/// Result of [`split_heavy`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SplitOutcome {
    /// Timings after splitting: light files plus examples of heavy files.
    pub timings: TimingMap,

    /// Heavy files that were replaced by their examples.
    pub exploded: BTreeSet<String>,

    /// Heavy files kept whole because their example timings were missing or
    /// did not cover the file's total time.
    pub retained: BTreeSet<String>,
}

impl SplitOutcome {
    fn unchanged(timings: TimingMap) -> Self {
        Self {
            timings,
            ..Self::default()
        }
    }
}

/// Replaces files at or above `threshold` seconds with their examples.
///
/// `examples` is only called when `threshold` is set and at least one file
/// reaches it, so callers can defer the example-level parse until it is
/// needed.
///
/// An example belongs to a heavy file `f` when its identifier is `f`
/// followed by a bracketed locator. A heavy file keeps its aggregate entry,
/// and is listed in [`SplitOutcome::retained`], when no examples match it or
/// when the matching examples account for less than its total time (some of
/// its records carried no locator).
///
/// # Errors
///
/// Returns [`SplitError::InvalidArgument`] if `threshold` is not a positive
/// number.
///
/// # Example
///
/// ```
/// use split_test::split::split_heavy;
/// use split_test::timing::TimingMap;
///
/// let mut files = TimingMap::new();
/// files.record("spec/heavy_spec.rb", 30.0)?;
/// files.record("spec/light_spec.rb", 2.0)?;
///
/// let outcome = split_heavy(files, || {
///     let mut examples = TimingMap::new();
///     examples.record("spec/heavy_spec.rb[1:1]", 10.0).unwrap();
///     examples.record("spec/heavy_spec.rb[1:2]", 20.0).unwrap();
///     examples
/// }, Some(10.0))?;
///
/// assert_eq!(outcome.timings.len(), 3);
/// assert!(outcome.exploded.contains("spec/heavy_spec.rb"));
/// # Ok::<(), split_test::SplitError>(())
/// ```
pub fn split_heavy<F>(
    file_timings: TimingMap,
    examples: F,
    threshold: Option<f64>,
) -> SplitResult<SplitOutcome>
where
    F: FnOnce() -> TimingMap,
{
    let Some(threshold) = threshold else {
        return Ok(SplitOutcome::unchanged(file_timings));
    };
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(SplitError::invalid(format!(
            "split threshold must be a positive number of seconds, got {}",
            threshold
        )));
    }

    let (heavy, light) = file_timings.partition(|_, seconds| seconds >= threshold);
    if heavy.is_empty() {
        return Ok(SplitOutcome::unchanged(light));
    }

    info!(
        "Splitting {} file(s) at or above {}s into examples",
        heavy.len(),
        threshold
    );
    let examples = examples();

    let mut outcome = SplitOutcome::unchanged(light);
    for (file, seconds) in heavy {
        let matched: Vec<(&str, f64)> = examples
            .iter()
            .filter(|(id, _)| belongs_to(id, &file))
            .collect();
        let covered: f64 = matched.iter().map(|(_, example_seconds)| example_seconds).sum();

        if matched.is_empty() {
            warn!(
                "No example timings found for heavy file {} ({:.2}s), keeping it whole",
                file, seconds
            );
        } else if seconds - covered > COVERAGE_TOLERANCE * seconds.max(1.0) {
            // Records without a locator would not run if only examples were listed.
            warn!(
                "Examples of heavy file {} cover {:.2}s of {:.2}s, keeping it whole",
                file, covered, seconds
            );
        } else {
            for (example, example_seconds) in matched {
                outcome.timings.accumulate(example.to_string(), example_seconds);
            }
            outcome.exploded.insert(file);
            continue;
        }

        outcome.timings.accumulate(file.clone(), seconds);
        outcome.retained.insert(file);
    }

    Ok(outcome)
}

/// Whether `example` is a locator inside `file`: `file` followed by `[`.
fn belongs_to(example: &str, file: &str) -> bool {
    example
        .strip_prefix(file)
        .is_some_and(|rest| rest.starts_with('['))
}
