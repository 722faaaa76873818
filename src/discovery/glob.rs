//! Glob-based test file discovery.
//!
//! Walks a test directory and keeps the files whose path, relative to that
//! directory, matches a glob pattern.
//!
//! # Pattern Syntax
//!
//! | Token | Matches |
//! |-------|---------|
//! | `**/` | Zero or more directories |
//! | `*` | Any run of characters except `/` |
//! | `?` | One character except `/` |
//! | `{a,b}` | Either alternative |
//! | `[abc]`, `[!abc]` | One character in (or not in) the set |

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

use super::{DiscoveryError, DiscoveryResult, TestDiscoverer};
use crate::timing::normalize_path;

/// Default directory searched for tests.
pub const DEFAULT_TEST_DIR: &str = "spec";

/// Default pattern for test files, relative to the test directory.
pub const DEFAULT_TEST_PATTERN: &str = "**/*_spec.rb";

/// Discovers test files under `root` matching a glob pattern.
///
/// Identifiers are `root` joined with the matched relative path, so with
/// root `spec` and pattern `**/*_spec.rb` the file `spec/models/user_spec.rb`
/// is reported as `spec/models/user_spec.rb`.
///
/// # Example
///
/// ```no_run
/// use split_test::discovery::{GlobDiscoverer, TestDiscoverer};
///
/// # async fn example() -> anyhow::Result<()> {
/// let discoverer = GlobDiscoverer::new("spec", "**/*_spec.rb")?;
/// let files = discoverer.discover().await?;
/// println!("{} test files", files.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GlobDiscoverer {
    root: PathBuf,
    pattern: String,
    matcher: Regex,
}

impl GlobDiscoverer {
    /// Creates a discoverer for `root` and `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::InvalidPattern`] for unbalanced braces or
    /// brackets.
    pub fn new(root: impl Into<PathBuf>, pattern: impl Into<String>) -> DiscoveryResult<Self> {
        let pattern = pattern.into();
        let matcher = compile_glob(&pattern)?;
        Ok(Self {
            root: root.into(),
            pattern,
            matcher,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether a path relative to the root matches the pattern.
    pub fn matches(&self, relative: &str) -> bool {
        self.matcher.is_match(relative)
    }

    fn walk(&self) -> BTreeSet<String> {
        if !self.root.is_dir() {
            debug!("Test directory not found: {}", self.root.display());
            return BTreeSet::new();
        }

        let mut files = BTreeSet::new();
        for entry in WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
        {
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let relative = to_slash(relative);
            if self.matches(&relative) {
                let id = to_slash(&self.root.join(&relative));
                files.insert(normalize_path(&id).to_string());
            }
        }
        files
    }
}

#[async_trait]
impl TestDiscoverer for GlobDiscoverer {
    async fn discover(&self) -> DiscoveryResult<BTreeSet<String>> {
        let this = self.clone();
        let files = tokio::task::spawn_blocking(move || this.walk()).await?;
        debug!(
            "Discovered {} test file(s) in {} matching {}",
            files.len(),
            self.root.display(),
            self.pattern
        );
        Ok(files)
    }

    fn name(&self) -> &'static str {
        "glob"
    }
}

fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Translates a glob into an anchored regular expression.
fn compile_glob(pattern: &str) -> DiscoveryResult<Regex> {
    let invalid = |message: &str| DiscoveryError::InvalidPattern {
        pattern: pattern.to_string(),
        message: message.to_string(),
    };

    let chars: Vec<char> = pattern.chars().collect();
    let mut re = String::from("^");
    let mut brace_depth = 0usize;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    re.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    re.push_str(".*");
                    i += 2;
                }
                continue;
            }
            '*' => re.push_str("[^/]*"),
            '?' => re.push_str("[^/]"),
            '{' => {
                brace_depth += 1;
                re.push_str("(?:");
            }
            '}' if brace_depth > 0 => {
                brace_depth -= 1;
                re.push(')');
            }
            ',' if brace_depth > 0 => re.push('|'),
            '[' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&c| c == ']')
                    .map(|offset| i + 1 + offset)
                    .ok_or_else(|| invalid("unclosed '['"))?;
                let (negated, body) = match chars[i + 1..close].split_first() {
                    Some(('!', rest)) => (true, rest),
                    _ => (false, &chars[i + 1..close]),
                };
                re.push('[');
                if negated {
                    re.push('^');
                }
                // Only an inner '-' keeps its meaning. Everything else is literal.
                for (k, &c) in body.iter().enumerate() {
                    if c == '-' && k > 0 && k + 1 < body.len() {
                        re.push('-');
                    } else {
                        re.push_str(&regex::escape(&c.to_string()));
                    }
                }
                re.push(']');
                i = close + 1;
                continue;
            }
            c => re.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    if brace_depth > 0 {
        return Err(invalid("unclosed '{'"));
    }
    re.push('$');

    Regex::new(&re).map_err(|e| invalid(&e.to_string()))
}
