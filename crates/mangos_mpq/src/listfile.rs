//! Parsing of the `(listfile)` member.
//!
//! The hash table only stores hashes, so the names of the members have to come from somewhere
//! else. Most archives carry a plain text member called `(listfile)` listing them.

use std::borrow::Cow;

/// Name of the member listing the names of all other members
pub const LISTFILE_NAME: &str = "(listfile)";

/// Names of the special members written by the archive tools themselves
pub const INTERNAL_NAMES: [&str; 3] = [LISTFILE_NAME, "(attributes)", "(signature)"];

/// Split a listfile into its names.
///
/// Names are separated by line breaks or semicolons. Surrounding whitespace and empty entries are
/// dropped, bytes that are not UTF-8 are replaced.
pub fn parse_listfile(data: &[u8]) -> impl Iterator<Item = Cow<'_, str>> {
    data.split(|b| matches!(b, b'\r' | b'\n' | b';'))
        .map(trim)
        .filter(|raw| !raw.is_empty())
        .map(String::from_utf8_lossy)
}

fn trim(raw: &[u8]) -> &[u8] {
    let start = raw
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(raw.len());
    let end = raw
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &raw[start..end.max(start)]
}
