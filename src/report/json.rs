//! RSpec JSON timing extraction.
//!
//! Reads the `examples` array written by `rspec --format json`:
//!
//! ```json
//! {
//!   "version": "3.13.0",
//!   "examples": [
//!     {
//!       "id": "./spec/models/user_spec.rb[1:1]",
//!       "file_path": "./spec/models/user_spec.rb",
//!       "run_time": 2.5
//!     }
//!   ]
//! }
//! ```
//!
//! The `id` field is preferred over `file_path`. For shared examples
//! `file_path` points at the shared example file, while `id` names the spec
//! file that actually ran it.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use super::{Granularity, clamp_seconds, coerce_seconds};
use crate::error::{SplitError, SplitResult};
use crate::timing::{TimingMap, file_part, is_example_id, normalize_path};

#[derive(Debug, Deserialize)]
struct RspecReport {
    #[serde(default)]
    examples: Option<Vec<RspecExample>>,
}

#[derive(Debug, Deserialize)]
struct RspecExample {
    #[serde(default)]
    id: Value,

    #[serde(default)]
    file_path: Value,

    #[serde(default)]
    run_time: Value,
}

impl RspecExample {
    /// `id`, else `file_path`. Non-string and blank values count as missing.
    fn location(&self) -> Option<&str> {
        [&self.id, &self.file_path]
            .into_iter()
            .filter_map(Value::as_str)
            .find(|location| !location.trim().is_empty())
    }

    fn seconds(&self) -> f64 {
        match &self.run_time {
            Value::Number(n) => n.as_f64().map(clamp_seconds).unwrap_or(0.0),
            Value::String(s) => coerce_seconds(Some(s)),
            _ => 0.0,
        }
    }
}

/// Parses RSpec JSON content into a timing map.
pub fn parse(content: &str, source: &Path, granularity: Granularity) -> SplitResult<TimingMap> {
    let report: RspecReport =
        serde_json::from_str(content).map_err(|e| SplitError::parse(source, e))?;

    let mut timings = TimingMap::new();
    for example in report.examples.unwrap_or_default() {
        let Some(location) = example.location() else {
            continue;
        };
        let location = normalize_path(location.trim());

        match granularity {
            Granularity::File => {
                timings.accumulate(file_part(location).to_string(), example.seconds());
            }
            Granularity::Example if is_example_id(location) => {
                timings.accumulate(location.to_string(), example.seconds());
            }
            Granularity::Example => {}
        }
    }

    Ok(timings)
}
