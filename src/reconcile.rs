//! Reconciling ingested timings with the test files on disk.
//!
//! Reports are historical: they may mention files that were since deleted or
//! renamed, and they miss files that were added after the reports were
//! produced. Reconciliation makes the discovered test files authoritative.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::warn;

use crate::error::{SplitError, SplitResult};
use crate::timing::TimingMap;

/// Weight, in seconds, given to test files with no historical timing.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Timings whose key set is exactly the authoritative set of test files.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Reconciled {
    /// Final per-file timings.
    pub timings: TimingMap,

    /// Files that had no historical data and received the default weight.
    pub defaulted: BTreeSet<String>,
}

impl Reconciled {
    pub fn is_empty(&self) -> bool {
        self.timings.is_empty()
    }
}

/// Restricts `ingested` to `authoritative` and fills the gaps.
///
/// 1. Entries for files not in `authoritative` are dropped.
/// 2. Authoritative files with no entry are added at `default_weight` and
///    listed in [`Reconciled::defaulted`].
///
/// An empty `authoritative` set yields an empty result; callers treat that
/// as "no tests found".
///
/// # Errors
///
/// Returns [`SplitError::InvalidArgument`] if `default_weight` is negative
/// or not finite.
///
/// # Example
///
/// ```
/// use std::collections::BTreeSet;
/// use split_test::reconcile::{DEFAULT_WEIGHT, reconcile};
/// use split_test::timing::TimingMap;
///
/// let mut ingested = TimingMap::new();
/// ingested.record("spec/user_spec.rb", 4.3)?;
/// ingested.record("spec/deleted_spec.rb", 9.0)?;
///
/// let on_disk: BTreeSet<String> =
///     ["spec/user_spec.rb", "spec/orphan_spec.rb"].map(String::from).into();
///
/// let result = reconcile(ingested, &on_disk, DEFAULT_WEIGHT)?;
/// assert_eq!(result.timings.get("spec/orphan_spec.rb"), Some(1.0));
/// assert!(!result.timings.contains("spec/deleted_spec.rb"));
/// assert!(result.defaulted.contains("spec/orphan_spec.rb"));
/// # Ok::<(), split_test::SplitError>(())
/// ```
pub fn reconcile(
    mut ingested: TimingMap,
    authoritative: &BTreeSet<String>,
    default_weight: f64,
) -> SplitResult<Reconciled> {
    if !default_weight.is_finite() || default_weight < 0.0 {
        return Err(SplitError::invalid(format!(
            "default weight must be a non-negative number, got {}",
            default_weight
        )));
    }

    ingested.retain(|id, _| authoritative.contains(id));

    let defaulted: BTreeSet<String> = authoritative
        .iter()
        .filter(|id| !ingested.contains(id))
        .cloned()
        .collect();

    if !defaulted.is_empty() {
        warn!(
            "Found {} test file(s) not in reports, adding with default execution time ({}s)",
            defaulted.len(),
            default_weight
        );
    }

    for id in &defaulted {
        ingested.record(id.clone(), default_weight)?;
    }

    Ok(Reconciled {
        timings: ingested,
        defaulted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn timings(entries: &[(&str, f64)]) -> TimingMap {
        let mut map = TimingMap::new();
        for (id, seconds) in entries {
            map.record(*id, *seconds).unwrap();
        }
        map
    }

    #[test]
    fn test_reconcile_filters_and_fills() {
        let ingested = timings(&[("a", 2.0), ("stale", 7.0)]);
        let result = reconcile(ingested, &set(&["a", "b", "c"]), DEFAULT_WEIGHT).unwrap();

        assert_eq!(result.timings.ids().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(result.timings.get("a"), Some(2.0));
        assert_eq!(result.timings.get("b"), Some(1.0));
        assert_eq!(result.timings.get("c"), Some(1.0));
        assert_eq!(result.defaulted, set(&["b", "c"]));
    }

    #[test]
    fn test_reconcile_nothing_missing() {
        let ingested = timings(&[("a", 2.0), ("b", 0.0)]);
        let result = reconcile(ingested, &set(&["a", "b"]), DEFAULT_WEIGHT).unwrap();

        assert!(result.defaulted.is_empty());
        // A recorded zero is evidence, not a gap.
        assert_eq!(result.timings.get("b"), Some(0.0));
    }

    #[test]
    fn test_reconcile_empty_authoritative() {
        let result = reconcile(timings(&[("a", 2.0)]), &BTreeSet::new(), DEFAULT_WEIGHT).unwrap();
        assert!(result.is_empty());
        assert!(result.defaulted.is_empty());
    }

    #[test]
    fn test_reconcile_without_reports() {
        let result = reconcile(TimingMap::new(), &set(&["a", "b"]), DEFAULT_WEIGHT).unwrap();
        assert_eq!(result.defaulted, set(&["a", "b"]));
        assert_eq!(result.timings.total(), 2.0);
    }

    #[test]
    fn test_reconcile_custom_weight() {
        let result = reconcile(TimingMap::new(), &set(&["a"]), 2.5).unwrap();
        assert_eq!(result.timings.get("a"), Some(2.5));
    }

    #[test]
    fn test_reconcile_rejects_bad_weight() {
        for weight in [-1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                reconcile(TimingMap::new(), &set(&["a"]), weight),
                Err(SplitError::InvalidArgument(_))
            ));
        }
    }
}
