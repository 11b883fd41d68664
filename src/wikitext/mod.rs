//! Helpers for pulling structured data out of page wikitext
//!
//! These work on the raw markup of a revision (`Revision::text`) and are
//! independent of how the page was read.

mod coords;
mod files;
mod links;

pub use coords::{parse_coords, Coord, CoordError};
pub use files::{find_files, url_for_file};
pub use links::find_links;

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

static RE_COMMENT: OnceLock<Option<Regex>> = OnceLock::new();
static RE_NOWIKI: OnceLock<Option<Regex>> = OnceLock::new();

/// Compile `pattern` once; a pattern that fails to compile is logged and treated as absent
fn cached(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(pattern, error = %e, "wikitext regex init failed");
            None
        }
    })
    .as_ref()
}

/// Remove `<!-- ... -->` comments
fn strip_comments(text: &str) -> Cow<'_, str> {
    match cached(&RE_COMMENT, r"(?s)<!--.*?-->") {
        Some(re) => re.replace_all(text, ""),
        None => Cow::Borrowed(text),
    }
}

/// Remove `<nowiki>` blocks along with their content
fn strip_nowiki(text: &str) -> Cow<'_, str> {
    match cached(&RE_NOWIKI, r"(?s)<nowiki>.*?</nowiki>") {
        Some(re) => re.replace_all(text, ""),
        None => Cow::Borrowed(text),
    }
}
