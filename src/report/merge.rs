//! Merging several JUnit XML reports into one document.
//!
//! CI jobs that run one node per worker end up with one JUnit file per
//! node. Most CI dashboards want a single file, so this module copies every
//! `<testsuite>` element from the inputs under one `<testsuites>` root:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <testsuites tests="5" failures="1" errors="0" skipped="0" time="9.400">
//!   <testsuite name="node-0" tests="3" failures="1" time="5.100">...</testsuite>
//!   <testsuite name="node-1" tests="2" failures="0" time="4.300">...</testsuite>
//! </testsuites>
//! ```
//!
//! The suites themselves are copied verbatim; only the root's counters are
//! computed.

use std::path::{Path, PathBuf};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::coerce_seconds;
use super::junit::attribute;
use crate::error::{SplitError, SplitResult};

/// Counters carried on `<testsuite>` and `<testsuites>` elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SuiteTotals {
    pub tests: u64,
    pub failures: u64,
    pub errors: u64,
    pub skipped: u64,
    pub time: f64,
}

impl SuiteTotals {
    fn add(&mut self, other: SuiteTotals) {
        self.tests += other.tests;
        self.failures += other.failures;
        self.errors += other.errors;
        self.skipped += other.skipped;
        self.time += other.time;
    }

    fn from_element(element: &BytesStart<'_>, source: &Path) -> SplitResult<Self> {
        let count = |name: &str| -> SplitResult<u64> {
            Ok(attribute(element, name, source)?
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(0))
        };

        Ok(Self {
            tests: count("tests")?,
            failures: count("failures")?,
            errors: count("errors")?,
            skipped: count("skipped")?,
            time: coerce_seconds(attribute(element, "time", source)?.as_deref()),
        })
    }
}

/// What [`merge_junit_files`] wrote.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeSummary {
    /// Inputs whose suites were copied, in argument order.
    pub merged: Vec<PathBuf>,

    /// Inputs that did not exist.
    pub missing: Vec<PathBuf>,

    /// Number of `<testsuite>` elements copied.
    pub suites: usize,

    /// Counters written on the `<testsuites>` root.
    pub totals: SuiteTotals,
}

/// The top-level suites of one input, as owned events.
struct ExtractedSuites {
    events: Vec<Event<'static>>,
    suites: usize,
    totals: SuiteTotals,
}

/// Merges the JUnit files `inputs` into `output`.
///
/// Inputs that do not exist are skipped with a warning. Parent directories
/// of `output` are created.
///
/// # Errors
///
/// - [`SplitError::InvalidArgument`] if none of the inputs exist
/// - [`SplitError::Parse`] if an input is not well-formed XML
/// - [`SplitError::Io`] if an input cannot be read or the output cannot be
///   written
pub fn merge_junit_files(inputs: &[PathBuf], output: &Path) -> SplitResult<MergeSummary> {
    let mut summary = MergeSummary::default();
    let mut extracted = Vec::new();

    for input in inputs {
        let content = match std::fs::read_to_string(input) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("JUnit file not found, skipping: {}", input.display());
                summary.missing.push(input.clone());
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let suites = extract_suites(&content, input)?;
        debug!("{}: {} testsuite(s)", input.display(), suites.suites);
        summary.suites += suites.suites;
        summary.totals.add(suites.totals);
        summary.merged.push(input.clone());
        extracted.push(suites);
    }

    if summary.merged.is_empty() {
        return Err(SplitError::invalid("no JUnit input files could be read"));
    }

    let xml = render(&extracted, summary.totals)?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(output, xml)?;

    info!(
        "Merged {} testsuite(s) from {} file(s) into {}",
        summary.suites,
        summary.merged.len(),
        output.display()
    );
    Ok(summary)
}

/// Collects every outermost `<testsuite>` subtree of a document.
fn extract_suites(content: &str, source: &Path) -> SplitResult<ExtractedSuites> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut extracted = ExtractedSuites {
        events: Vec::new(),
        suites: 0,
        totals: SuiteTotals::default(),
    };
    let mut depth: usize = 0;
    // Depth of the suite being copied, if any.
    let mut capturing: Option<usize> = None;

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
                if capturing.is_none() && is_testsuite(&e) {
                    capturing = Some(depth);
                    extracted.suites += 1;
                    extracted.totals.add(SuiteTotals::from_element(&e, source)?);
                }
                if capturing.is_some() {
                    extracted.events.push(Event::Start(e.into_owned()));
                }
            }
            Event::Empty(e) => {
                if capturing.is_none() && is_testsuite(&e) {
                    extracted.suites += 1;
                    extracted.totals.add(SuiteTotals::from_element(&e, source)?);
                    extracted.events.push(Event::Empty(e.into_owned()));
                } else if capturing.is_some() {
                    extracted.events.push(Event::Empty(e.into_owned()));
                }
            }
            Event::End(e) => {
                if capturing.is_some() {
                    extracted.events.push(Event::End(e.into_owned()));
                }
                if capturing == Some(depth) {
                    capturing = None;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            other => {
                if capturing.is_some() {
                    extracted.events.push(other.into_owned());
                }
            }
        }
    }

    if depth != 0 {
        return Err(SplitError::parse(
            source,
            format!("unexpected end of document ({} unclosed element(s))", depth),
        ));
    }

    Ok(extracted)
}

fn is_testsuite(element: &BytesStart<'_>) -> bool {
    element.name().as_ref() == b"testsuite"
}

/// Writes the merged document.
fn render(extracted: &[ExtractedSuites], totals: SuiteTotals) -> SplitResult<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut testsuites = BytesStart::new("testsuites");
    testsuites.push_attribute(("tests", totals.tests.to_string().as_str()));
    testsuites.push_attribute(("failures", totals.failures.to_string().as_str()));
    testsuites.push_attribute(("errors", totals.errors.to_string().as_str()));
    testsuites.push_attribute(("skipped", totals.skipped.to_string().as_str()));
    testsuites.push_attribute(("time", format!("{:.3}", totals.time).as_str()));
    writer.write_event(Event::Start(testsuites))?;

    for event in extracted.iter().flat_map(|suites| suites.events.iter()) {
        writer.write_event(event.borrow())?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    Ok(writer.into_inner())
}
