//! Quoted-include extraction from C sources.
//!
//! Only the `#include "TOKEN"` form is recognized; angle-bracket includes
//! and everything else is ignored. Conditional compilation is not
//! interpreted: every matching line counts.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;
use tracing::warn;

static INCLUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*#include\s+"(.+)".*$"#).unwrap());
static INCLUDE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*#include\s+""#).unwrap());

/// Reads the quoted include tokens of the file at `path`, deduplicated and
/// in order of first appearance.
///
/// Lines that open a quoted include but fail to capture a token are logged
/// and skipped. Tokens are returned verbatim; no resolution or normalization
/// happens here.
///
/// # Errors
///
/// Returns the underlying I/O error when the file cannot be opened or read.
pub fn read_includes(path: &Path) -> io::Result<Vec<String>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut tokens = IndexSet::new();
    for line in reader.lines() {
        let line = line?;
        if let Some(caps) = INCLUDE_RE.captures(&line) {
            tokens.insert(caps[1].to_string());
        } else if INCLUDE_PREFIX_RE.is_match(&line) {
            warn!(
                path = %path.display(),
                line,
                "skipping include line without a token"
            );
        }
    }
    Ok(tokens.into_iter().collect())
}
