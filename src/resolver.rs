//! Filename to card id resolution.
//!
//! Card art is named after the card it depicts, e.g.
//! `cards/cauldron-01-fire-Xy7abQ.png`. Resolution is a pure function of the
//! name: no network, no deck lookup. Whether the id actually exists is the
//! merge engine's concern.
//!
//! Grammar, applied to the last path segment:
//!
//! - the extension must be an image extension;
//! - the stem is lowercased and `_`, `.` and spaces become `-`;
//! - the card id is the longest run of alphabetic tokens directly before
//!   the first numeric token, plus that number zero-padded to two digits;
//! - the element is the first element name after the number, otherwise a
//!   directory segment naming an element;
//! - anything else (upload suffixes, `v2`, `hd`) is ignored.

use std::borrow::Cow;

use crate::config::is_image_path;
use crate::models::Element;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub card_id: String,
    pub element: Option<Element>,
}

/// Resolve a filename, path or URL to a card id and element.
///
/// Returns `None` when no card id can be recognized.
pub fn resolve(name: &str) -> Option<ResolvedName> {
    let clean = name.split(['?', '#']).next().unwrap_or(name);
    if !is_image_path(clean) {
        return None;
    }

    let (dirs, file) = match clean.rsplit_once('/') {
        Some((dirs, file)) => (dirs, file),
        None => ("", clean),
    };
    let decoded = decode(file);
    let file: &str = &decoded;
    let stem = file.rsplit_once('.').map(|(s, _)| s).unwrap_or(file);
    let normalized: String = stem
        .to_lowercase()
        .chars()
        .map(|c| if matches!(c, '_' | '.' | ' ') { '-' } else { c })
        .collect();
    let tokens: Vec<&str> = normalized.split('-').filter(|t| !t.is_empty()).collect();

    let number_at = tokens
        .iter()
        .position(|t| t.chars().all(|c| c.is_ascii_digit()))?;
    // Longest alphabetic run ending right before the number; leading
    // tokens such as `v2` or `hd2` are dropped.
    let slug_start = tokens[..number_at]
        .iter()
        .rposition(|t| !t.chars().all(|c| c.is_alphabetic()))
        .map_or(0, |i| i + 1);
    let slug = &tokens[slug_start..number_at];
    if slug.is_empty() {
        return None;
    }

    let number = tokens[number_at].trim_start_matches('0');
    let number = if number.is_empty() { "0" } else { number };
    let card_id = format!("{}-{:0>2}", slug.join("-"), number);

    let element = tokens[number_at + 1..]
        .iter()
        .find_map(|t| t.parse::<Element>().ok())
        .or_else(|| {
            dirs.split('/')
                .filter(|d| !d.is_empty())
                .find_map(|d| decode(d).parse::<Element>().ok())
        });

    Some(ResolvedName { card_id, element })
}

fn decode(segment: &str) -> Cow<'_, str> {
    urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment))
}
