//! JUnit XML timing extraction.
//!
//! Reads `<testcase>` elements from JUnit XML reports. The layout of the
//! surrounding `<testsuites>`/`<testsuite>` elements does not matter; test
//! cases are found at any depth.
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <testsuites>
//!   <testsuite name="rspec" tests="2" time="4.3">
//!     <testcase classname="spec.models.user_spec" name="is valid"
//!               file="./spec/models/user_spec.rb" time="2.5"/>
//!     <testcase classname="spec.models.user_spec" name="saves"
//!               file="./spec/models/user_spec.rb" time="1.8"/>
//!   </testsuite>
//! </testsuites>
//! ```
//!
//! The file location comes from the `file` attribute, falling back to
//! `filepath` and then `id`. Test cases with none of these are skipped.

use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{Granularity, coerce_seconds};
use crate::error::{SplitError, SplitResult};
use crate::timing::{TimingMap, file_part, is_example_id, normalize_path};

/// Attributes that identify the test file, in order of preference.
const LOCATION_ATTRIBUTES: [&str; 3] = ["file", "filepath", "id"];

/// Parses JUnit XML content into a timing map.
pub fn parse(content: &str, source: &Path, granularity: Granularity) -> SplitResult<TimingMap> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut timings = TimingMap::new();
    let mut depth: usize = 0;
    let mut saw_root = false;

    loop {
        let event = reader.read_event().map_err(|e| {
            SplitError::parse(
                source,
                format!("XML error at position {}: {}", reader.error_position(), e),
            )
        })?;

        match event {
            Event::Start(e) => {
                depth += 1;
                saw_root = true;
                record_testcase(&e, source, granularity, &mut timings)?;
            }
            Event::Empty(e) => {
                saw_root = true;
                record_testcase(&e, source, granularity, &mut timings)?;
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(SplitError::parse(source, "no root element"));
    }
    if depth != 0 {
        return Err(SplitError::parse(
            source,
            format!("unexpected end of document ({} unclosed element(s))", depth),
        ));
    }

    Ok(timings)
}

fn record_testcase(
    element: &BytesStart<'_>,
    source: &Path,
    granularity: Granularity,
    timings: &mut TimingMap,
) -> SplitResult<()> {
    if element.name().as_ref() != b"testcase" {
        return Ok(());
    }

    let location = LOCATION_ATTRIBUTES
        .iter()
        .map(|name| attribute(element, name, source))
        .find_map(|value| value.transpose());
    let Some(location) = location.transpose()? else {
        return Ok(());
    };
    let location = normalize_path(&location);
    let seconds = coerce_seconds(attribute(element, "time", source)?.as_deref());

    match granularity {
        Granularity::File => {
            timings.accumulate(file_part(location).to_string(), seconds);
        }
        Granularity::Example => {
            // Prefer an explicit composite `id` over the file location.
            let example = match attribute(element, "id", source)? {
                Some(id) if is_example_id(&id) => Some(normalize_path(&id).to_string()),
                _ if is_example_id(location) => Some(location.to_string()),
                _ => None,
            };
            if let Some(example) = example {
                timings.accumulate(example, seconds);
            }
        }
    }

    Ok(())
}

/// Reads and unescapes an attribute. Empty values count as missing.
pub(super) fn attribute(element: &BytesStart<'_>, name: &str, source: &Path) -> SplitResult<Option<String>> {
    let attr = element
        .try_get_attribute(name)
        .map_err(|e| SplitError::parse(source, format!("bad attribute: {}", e)))?;

    match attr {
        Some(attr) => {
            let value = attr
                .unescape_value()
                .map_err(|e| SplitError::parse(source, format!("bad attribute value: {}", e)))?;
            let value = value.trim();
            Ok((!value.is_empty()).then(|| value.to_string()))
        }
        None => Ok(None),
    }
}
