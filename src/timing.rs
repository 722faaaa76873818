//! Timing data model: identifiers, normalization, and the summing map.
//!
//! Every report parser, the reconciler, the splitter and the balancer speak
//! in terms of a [`TimingMap`]: unit identifier to cumulative seconds.
//!
//! # Identifiers
//!
//! | Kind | Example | Produced by |
//! |------|---------|-------------|
//! | File identifier | `spec/models/user_spec.rb` | parsers, discovery |
//! | Example identifier | `spec/models/user_spec.rb[1:2:3]` | parsers (fine-grained) |
//!
//! Identifiers are compared as exact strings after [`normalize_path`].

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

use crate::error::{SplitError, SplitResult};

/// Strips the leading `./` from a path-like identifier.
///
/// Only leading `./` segments are removed; `./` in the middle of a path is
/// preserved. Normalizing an already-normalized path is a no-op.
///
/// # Example
///
/// ```
/// use split_test::timing::normalize_path;
///
/// assert_eq!(normalize_path("./spec/models/user_spec.rb"), "spec/models/user_spec.rb");
/// assert_eq!(normalize_path("spec/./models/user_spec.rb"), "spec/./models/user_spec.rb");
/// ```
pub fn normalize_path(path: &str) -> &str {
    path.trim_start_matches("./")
}

/// Returns the file part of an identifier: everything before the first `[`.
///
/// Plain file identifiers are returned unchanged.
pub fn file_part(id: &str) -> &str {
    match id.find('[') {
        Some(idx) => &id[..idx],
        None => id,
    }
}

/// Whether the identifier carries a bracketed positional locator.
pub fn is_example_id(id: &str) -> bool {
    id.contains('[')
}

/// Mapping from unit identifier to cumulative duration in seconds.
///
/// Recording the same identifier twice sums the durations. Keys iterate in
/// lexicographic order, which keeps every downstream step deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimingMap {
    entries: BTreeMap<String, f64>,
}

impl TimingMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `seconds` to the entry for `id`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::InvalidArgument`] if `seconds` is negative,
    /// NaN or infinite.
    pub fn record(&mut self, id: impl Into<String>, seconds: f64) -> SplitResult<()> {
        let id = id.into();
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(SplitError::invalid(format!(
                "duration for {} must be a non-negative number, got {}",
                id, seconds
            )));
        }
        *self.entries.entry(id).or_insert(0.0) += seconds;
        Ok(())
    }

    /// Adds a duration already known to be valid.
    ///
    /// Parsers coerce their input before calling this, so an invalid value
    /// here is a bug in the caller.
    pub(crate) fn accumulate(&mut self, id: String, seconds: f64) {
        debug_assert!(seconds.is_finite() && seconds >= 0.0);
        *self.entries.entry(id).or_insert(0.0) += seconds;
    }

    /// Merges several maps, summing durations of identifiers that recur.
    ///
    /// The result does not depend on the order of `maps`.
    ///
    /// # Example
    ///
    /// ```
    /// use split_test::timing::TimingMap;
    ///
    /// let mut a = TimingMap::new();
    /// a.record("spec/a_spec.rb", 1.0)?;
    /// let mut b = TimingMap::new();
    /// b.record("spec/a_spec.rb", 2.0)?;
    /// b.record("spec/b_spec.rb", 0.5)?;
    ///
    /// let merged = TimingMap::merge([a, b]);
    /// assert_eq!(merged.get("spec/a_spec.rb"), Some(3.0));
    /// assert_eq!(merged.len(), 2);
    /// # Ok::<(), split_test::SplitError>(())
    /// ```
    pub fn merge(maps: impl IntoIterator<Item = TimingMap>) -> TimingMap {
        maps.into_iter().fold(TimingMap::new(), |mut acc, map| {
            for (id, seconds) in map.entries {
                acc.accumulate(id, seconds);
            }
            acc
        })
    }

    /// Duration recorded for `id`, if any.
    pub fn get(&self, id: &str) -> Option<f64> {
        self.entries.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(identifier, seconds)` in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(id, seconds)| (id.as_str(), *seconds))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Sum of all durations.
    pub fn total(&self) -> f64 {
        self.entries.values().sum()
    }

    /// Keeps only the entries for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, f64) -> bool) {
        self.entries.retain(|id, seconds| keep(id, *seconds));
    }

    /// Splits the map in two: entries matching `pred` and the rest.
    pub fn partition(self, mut pred: impl FnMut(&str, f64) -> bool) -> (TimingMap, TimingMap) {
        let (yes, no): (BTreeMap<_, _>, BTreeMap<_, _>) = self
            .entries
            .into_iter()
            .partition(|(id, seconds)| pred(id, *seconds));
        (TimingMap { entries: yes }, TimingMap { entries: no })
    }
}

impl IntoIterator for TimingMap {
    type Item = (String, f64);
    type IntoIter = btree_map::IntoIter<String, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
